use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::domain::{Application, ApplicationId, ApplicationStatus, PaymentStatus};
use super::identifier::generate_application_id;
use super::notify::{DeliveryError, Locale, Mailer, NotificationDispatcher};
use super::repository::{ApplicationRepository, RepositoryError};
use crate::config::MailConfig;

/// Identifier collisions are vanishingly rare; the bound exists so a broken
/// store cannot spin the submit path forever.
const MAX_ID_ATTEMPTS: usize = 3;

/// The lifecycle state machine: owns status/payment transitions and the
/// notification side effects they trigger.
///
/// Notifications run strictly post-commit and are best-effort on every
/// lifecycle path: a transport failure is logged and swallowed, never
/// surfaced, and never rolls back the committed transition.
pub struct IntakeService<R, M> {
    repository: Arc<R>,
    dispatcher: NotificationDispatcher<M>,
}

impl<R, M> IntakeService<R, M>
where
    R: ApplicationRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(repository: Arc<R>, mailer: Arc<M>, mail_config: MailConfig) -> Self {
        Self {
            repository,
            dispatcher: NotificationDispatcher::new(mailer, mail_config),
        }
    }

    /// Intake: validate, persist with a fresh identifier, then send the
    /// applicant confirmation and admin alerts.
    pub async fn submit(&self, form: Value) -> Result<Application, IntakeServiceError> {
        let email = form
            .get("email")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(IntakeServiceError::MissingEmail)?
            .to_string();

        let applicant_name = applicant_name_from(&form);
        let locale = Locale::from_preference(form.get("language").and_then(Value::as_str));

        let now = Utc::now();
        let mut record = Application {
            application_id: generate_application_id(),
            applicant_email: email,
            applicant_name,
            application_status: ApplicationStatus::AwaitingPayment,
            payment_status: PaymentStatus::Pending,
            form_data: form,
            created_at: now,
            updated_at: now,
        };

        let mut attempts = 0;
        let stored = loop {
            attempts += 1;
            match self.repository.insert(record.clone()) {
                Ok(stored) => break stored,
                Err(RepositoryError::DuplicateIdentifier) if attempts < MAX_ID_ATTEMPTS => {
                    record.application_id = generate_application_id();
                }
                Err(err) => return Err(err.into()),
            }
        };

        if let Err(err) = self.dispatcher.confirmation(&stored, locale).await {
            self.log_delivery_failure(&stored.application_id, "confirmation", &err);
        }
        if let Err(err) = self.dispatcher.admin_alert(&stored).await {
            self.log_delivery_failure(&stored.application_id, "admin_alert", &err);
        }

        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, IntakeServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list_all(&self) -> Result<Vec<Application>, IntakeServiceError> {
        Ok(self.repository.list_all()?)
    }

    /// Staff payment action. Only the literal status `"paid"` transitions;
    /// any other value is accepted and deliberately performs nothing, so
    /// callers posting the current UI state back never trip an error.
    pub async fn mark_payment(
        &self,
        id: &ApplicationId,
        requested_status: &str,
    ) -> Result<Application, IntakeServiceError> {
        let existing = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if requested_status != "paid" {
            return Ok(existing);
        }

        let updated = self.repository.update_payment_and_status(
            id,
            PaymentStatus::Paid,
            ApplicationStatus::UnderReview,
        )?;

        if let Err(err) = self.dispatcher.payment_confirmed(&updated).await {
            self.log_delivery_failure(id, "payment_confirmed", &err);
        }

        Ok(updated)
    }

    /// Staff status action: unconditionally overwrite the review status with
    /// the requested value, then notify the applicant.
    pub async fn set_status(
        &self,
        id: &ApplicationId,
        requested_status: &str,
    ) -> Result<Application, IntakeServiceError> {
        let new_status = ApplicationStatus::parse(requested_status);
        let updated = self.repository.update_status(id, new_status)?;

        if let Err(err) = self
            .dispatcher
            .status_changed(&updated, &updated.application_status)
            .await
        {
            self.log_delivery_failure(id, "status_changed", &err);
        }

        Ok(updated)
    }

    /// Identifier recovery. The outcome is identical whether or not any
    /// application matches, so callers cannot probe which addresses are
    /// registered; only a missing transport configuration is an error.
    pub async fn recover_id(&self, email: &str) -> Result<(), IntakeServiceError> {
        if !self.dispatcher.is_configured() {
            return Err(DeliveryError::NotConfigured.into());
        }

        let matches = self.repository.list_by_email(email.trim())?;
        if matches.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.dispatcher.id_recovery(email.trim(), &matches).await {
            warn!(email_count = matches.len(), error = %err, "recovery email failed");
        }

        Ok(())
    }

    /// Direct passthrough for the send-email endpoint; unlike the lifecycle
    /// paths, configuration and transport failures surface to the caller.
    pub async fn send_raw_email(
        &self,
        to: &str,
        subject: &str,
        content: &str,
    ) -> Result<(), IntakeServiceError> {
        self.dispatcher.send_raw(to, subject, content).await?;
        Ok(())
    }

    fn log_delivery_failure(&self, id: &ApplicationId, event: &str, err: &DeliveryError) {
        warn!(application_id = %id, event, error = %err, "notification delivery failed");
    }
}

fn applicant_name_from(form: &Value) -> String {
    let first = form
        .get("firstName")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let last = form
        .get("lastName")
        .and_then(Value::as_str)
        .unwrap_or_default();
    format!("{} {}", first.trim(), last.trim())
        .trim()
        .to_string()
}

/// Error raised by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error("applicant email is required")]
    MissingEmail,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
