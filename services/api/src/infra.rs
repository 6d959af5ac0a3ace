use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;

use rental_intake::config::MailConfig;
use rental_intake::intake::domain::{Application, ApplicationId, ApplicationStatus, PaymentStatus};
use rental_intake::intake::notify::{DeliveryError, EmailMessage, Mailer};
use rental_intake::intake::repository::{ApplicationRepository, RepositoryError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store backing the bundled binary; the relational layer is an
/// external collaborator reached through the same trait.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<Vec<Application>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
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

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

struct SendGridCredentials {
    api_key: String,
    from_address: String,
}

/// SendGrid v3 transport. Credentials stay optional so the dispatcher's
/// unconfigured no-op semantics hold end to end.
pub(crate) struct SendGridMailer {
    client: reqwest::Client,
    credentials: Option<SendGridCredentials>,
}

impl SendGridMailer {
    pub(crate) fn from_config(config: &MailConfig) -> Self {
        let credentials = match (&config.api_key, &config.from_address) {
            (Some(api_key), Some(from_address)) => Some(SendGridCredentials {
                api_key: api_key.clone(),
                from_address: from_address.clone(),
            }),
            _ => None,
        };

        Self {
            client: reqwest::Client::new(),
            credentials,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(DeliveryError::NotConfigured)?;

        let payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": credentials.from_address },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html_body }],
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&credentials.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Transport(format!(
                "sendgrid responded with {}",
                response.status()
            )))
        }
    }
}

/// Mailer that records instead of sending, for the CLI demo.
#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub(crate) fn sent(&self) -> Vec<EmailMessage> {
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
