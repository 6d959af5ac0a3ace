use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::{Application, ApplicationId, ApplicationStatus, PaymentStatus};
use super::notify::{DeliveryError, Mailer};
use super::repository::{ApplicationRepository, RepositoryError};
use super::service::{IntakeService, IntakeServiceError};

/// Router builder exposing the applicant and staff HTTP endpoints.
pub fn intake_router<R, M>(service: Arc<IntakeService<R, M>>) -> Router
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/submit-application", post(submit_handler::<R, M>))
        .route("/api/applications", post(submit_handler::<R, M>))
        .route(
            "/api/application-status/:application_id",
            get(status_lookup_handler::<R, M>),
        )
        .route("/api/admin/applications", get(admin_list_handler::<R, M>))
        .route(
            "/api/admin/application/:application_id",
            get(admin_detail_handler::<R, M>),
        )
        .route(
            "/api/admin/application/:application_id/payment",
            post(payment_handler::<R, M>),
        )
        .route(
            "/api/admin/application/:application_id/status",
            post(status_update_handler::<R, M>),
        )
        .route("/api/recover-id", post(recover_handler::<R, M>))
        .route("/api/send-email", post(send_email_handler::<R, M>))
        .with_state(service)
}

/// Applicant-facing view of a stored application; the raw form stays behind
/// the admin detail endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ApplicationSummary {
    pub(crate) application_id: ApplicationId,
    pub(crate) applicant_name: String,
    pub(crate) applicant_email: String,
    pub(crate) application_status: ApplicationStatus,
    pub(crate) payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) property_address: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<&Application> for ApplicationSummary {
    fn from(application: &Application) -> Self {
        Self {
            application_id: application.application_id.clone(),
            applicant_name: application.applicant_name.clone(),
            applicant_email: application.applicant_email.clone(),
            application_status: application.application_status.clone(),
            payment_status: application.payment_status,
            property_address: application.property_address().map(str::to_string),
            created_at: application.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentRequest {
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    pub(crate) status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecoverRequest {
    #[serde(default)]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendEmailRequest {
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) content: String,
}

pub(crate) async fn submit_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    axum::Json(form): axum::Json<Value>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    match service.submit(form).await {
        Ok(application) => {
            let payload = json!({
                "status": "success",
                "application_id": application.application_id,
                "message": "Application submitted",
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(IntakeServiceError::MissingEmail) => {
            error_response(StatusCode::BAD_REQUEST, "Email is required")
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn status_lookup_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(application) => {
            let summary = ApplicationSummary::from(&application);
            (StatusCode::OK, axum::Json(summary)).into_response()
        }
        Err(err) => not_found_or_internal(err),
    }
}

pub(crate) async fn admin_list_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    match service.list_all() {
        Ok(applications) => {
            let summaries: Vec<ApplicationSummary> =
                applications.iter().map(ApplicationSummary::from).collect();
            (StatusCode::OK, axum::Json(summaries)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn admin_detail_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(err) => not_found_or_internal(err),
    }
}

pub(crate) async fn payment_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<PaymentRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    let id = ApplicationId(application_id);
    let requested = payload.status.unwrap_or_default();
    match service.mark_payment(&id, &requested).await {
        Ok(_) => success_response(),
        Err(err) => not_found_or_internal(err),
    }
}

pub(crate) async fn status_update_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    Path(application_id): Path<String>,
    axum::Json(payload): axum::Json<StatusUpdateRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    let id = ApplicationId(application_id);
    match service.set_status(&id, &payload.status).await {
        Ok(_) => success_response(),
        Err(err) => not_found_or_internal(err),
    }
}

pub(crate) async fn recover_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    axum::Json(payload): axum::Json<RecoverRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    let email = match payload.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, "Email is required"),
    };

    // Identical body for hit and miss so the endpoint cannot be used to
    // probe which addresses hold applications.
    match service.recover_id(&email).await {
        Ok(()) => {
            let payload = json!({
                "status": "success",
                "message": "If an application exists for this address, an email has been sent.",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn send_email_handler<R, M>(
    State(service): State<Arc<IntakeService<R, M>>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<SendEmailRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    let spanish = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase().starts_with("es"))
        .unwrap_or(false);

    match service
        .send_raw_email(&payload.to, &payload.subject, &payload.content)
        .await
    {
        Ok(()) => {
            let message = if spanish {
                "Correo electrónico enviado"
            } else {
                "Email sent"
            };
            let payload = json!({ "status": "success", "message": message });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(IntakeServiceError::Delivery(DeliveryError::NotConfigured)) => {
            let message = if spanish {
                "El transporte de correo no está configurado en el servidor"
            } else {
                "Mail transport not configured on server"
            };
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        Err(other) => internal_error(other),
    }
}

fn success_response() -> Response {
    (StatusCode::OK, axum::Json(json!({ "status": "success" }))).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}

fn not_found_or_internal(err: IntakeServiceError) -> Response {
    match err {
        IntakeServiceError::Repository(RepositoryError::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "Application not found")
        }
        other => internal_error(other),
    }
}

fn internal_error(err: IntakeServiceError) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
}
