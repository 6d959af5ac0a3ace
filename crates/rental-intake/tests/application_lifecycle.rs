//! End-to-end lifecycle scenario exercised through the public HTTP router:
//! submit, look up, mark paid, deny, and recover, asserting the transitions
//! and notification side effects visible from outside the crate.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use rental_intake::config::MailConfig;
    use rental_intake::intake::domain::{
        Application, ApplicationId, ApplicationStatus, PaymentStatus,
    };
    use rental_intake::intake::notify::{DeliveryError, EmailMessage, Mailer};
    use rental_intake::intake::repository::{ApplicationRepository, RepositoryError};
    use rental_intake::intake::service::IntakeService;

    #[derive(Default)]
    pub struct MemoryRepository {
        records: Mutex<Vec<Application>>,
    }

    impl ApplicationRepository for MemoryRepository {
        fn insert(&self, record: Application) -> Result<Application, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            if guard
                .iter()
                .any(|existing| existing.application_id == record.application_id)
            {
                return Err(RepositoryError::DuplicateIdentifier);
            }
            guard.push(record.clone());
            Ok(record)
        }

        fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard
                .iter()
                .find(|record| &record.application_id == id)
                .cloned())
        }

        fn list_by_email(&self, email: &str) -> Result<Vec<Application>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            Ok(guard
                .iter()
                .filter(|record| record.applicant_email == email)
                .cloned()
                .collect())
        }

        fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
            let guard = self.records.lock().expect("repository mutex poisoned");
            let mut records: Vec<Application> = guard.iter().rev().cloned().collect();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(records)
        }

        fn update_payment_and_status(
            &self,
            id: &ApplicationId,
            payment_status: PaymentStatus,
            application_status: ApplicationStatus,
        ) -> Result<Application, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            let record = guard
                .iter_mut()
                .find(|record| &record.application_id == id)
                .ok_or(RepositoryError::NotFound)?;
            record.payment_status = payment_status;
            record.application_status = application_status;
            record.updated_at = Utc::now();
            Ok(record.clone())
        }

        fn update_status(
            &self,
            id: &ApplicationId,
            application_status: ApplicationStatus,
        ) -> Result<Application, RepositoryError> {
            let mut guard = self.records.lock().expect("repository mutex poisoned");
            let record = guard
                .iter_mut()
                .find(|record| &record.application_id == id)
                .ok_or(RepositoryError::NotFound)?;
            record.application_status = application_status;
            record.updated_at = Utc::now();
            Ok(record.clone())
        }
    }

    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().expect("mailer mutex poisoned").clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .expect("mailer mutex poisoned")
                .push(message.clone());
            Ok(())
        }
    }

    pub fn mail_config() -> MailConfig {
        MailConfig {
            api_key: Some("SG.integration".to_string()),
            from_address: Some("leasing@casapropia.example".to_string()),
            admin_addresses: vec!["ops@casapropia.example".to_string()],
        }
    }

    pub fn build_service() -> (
        Arc<IntakeService<MemoryRepository, RecordingMailer>>,
        Arc<RecordingMailer>,
    ) {
        let repository = Arc::new(MemoryRepository::default());
        let mailer = Arc::new(RecordingMailer::default());
        let service = Arc::new(IntakeService::new(
            repository,
            mailer.clone(),
            mail_config(),
        ));
        (service, mailer)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use rental_intake::intake::intake_router;
use rental_intake::intake::FAIR_HOUSING_DISCLAIMER;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn full_application_lifecycle_over_http() {
    let (service, mailer) = common::build_service();
    let router = intake_router(service);

    // Submit.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/submit-application",
            json!({
                "email": "a@x.com",
                "firstName": "Jane",
                "lastName": "Doe",
                "propertyAddress": "1 Main St",
            }),
        ))
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let application_id = body["application_id"]
        .as_str()
        .expect("application_id present")
        .to_string();
    assert!(application_id.starts_with("CP-"));
    assert_eq!(application_id.len(), 11);

    // Immediately retrievable with initial lifecycle state.
    let response = router
        .clone()
        .oneshot(get_request(&format!(
            "/api/application-status/{application_id}"
        )))
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["application_status"], "awaiting_payment");
    assert_eq!(body["payment_status"], "pending");

    // Staff marks payment; both fields advance together.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/application/{application_id}/payment"),
            json!({ "status": "paid" }),
        ))
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(get_request(&format!(
            "/api/application-status/{application_id}"
        )))
        .await
        .expect("request succeeds");
    let body = response_json(response).await;
    assert_eq!(body["application_status"], "under_review");
    assert_eq!(body["payment_status"], "paid");

    // Staff denies; payment state is untouched.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/application/{application_id}/status"),
            json!({ "status": "denied" }),
        ))
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(get_request(&format!(
            "/api/application-status/{application_id}"
        )))
        .await
        .expect("request succeeds");
    let body = response_json(response).await;
    assert_eq!(body["application_status"], "denied");
    assert_eq!(body["payment_status"], "paid");

    // The denial email carried the compliance disclaimer.
    let denial = mailer.sent().pop().expect("denial email sent");
    assert!(denial.html_body.contains(FAIR_HOUSING_DISCLAIMER));

    // Identifier recovery reads back the denied application.
    let response = router
        .oneshot(json_request(
            "POST",
            "/api/recover-id",
            json!({ "email": "a@x.com" }),
        ))
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), StatusCode::OK);
    let recovery = mailer.sent().pop().expect("recovery email sent");
    assert!(recovery.html_body.contains(&application_id));
    assert!(recovery.html_body.contains("Denied"));
}
