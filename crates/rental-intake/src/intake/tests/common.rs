use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::MailConfig;
use crate::intake::domain::{Application, ApplicationId, ApplicationStatus, PaymentStatus};
use crate::intake::notify::{DeliveryError, EmailMessage, Mailer};
use crate::intake::repository::{ApplicationRepository, RepositoryError};
use crate::intake::service::IntakeService;

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<Vec<Application>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
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

/// Repository that rejects the first `reject` inserts as duplicates so the
/// identifier retry loop can be exercised.
pub(super) struct DuplicateProneRepository {
    inner: MemoryRepository,
    remaining_rejections: AtomicUsize,
}

impl DuplicateProneRepository {
    pub(super) fn rejecting(count: usize) -> Self {
        Self {
            inner: MemoryRepository::default(),
            remaining_rejections: AtomicUsize::new(count),
        }
    }
}

impl ApplicationRepository for DuplicateProneRepository {
    fn insert(&self, record: Application) -> Result<Application, RepositoryError> {
        if self.remaining_rejections.load(Ordering::SeqCst) > 0 {
            self.remaining_rejections.fetch_sub(1, Ordering::SeqCst);
            return Err(RepositoryError::DuplicateIdentifier);
        }
        self.inner.insert(record)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list_by_email(&self, email: &str) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_by_email(email)
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_all()
    }

    fn update_payment_and_status(
        &self,
        id: &ApplicationId,
        payment_status: PaymentStatus,
        application_status: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        self.inner
            .update_payment_and_status(id, payment_status, application_status)
    }

    fn update_status(
        &self,
        id: &ApplicationId,
        application_status: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        self.inner.update_status(id, application_status)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".into()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".into()))
    }

    fn list_by_email(&self, _email: &str) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".into()))
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".into()))
    }

    fn update_payment_and_status(
        &self,
        _id: &ApplicationId,
        _payment_status: PaymentStatus,
        _application_status: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".into()))
    }

    fn update_status(
        &self,
        _id: &ApplicationId,
        _application_status: ApplicationStatus,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".into()))
    }
}

#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub(super) fn sent(&self) -> Vec<EmailMessage> {
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

pub(super) struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("smtp handshake failed".into()))
    }
}

pub(super) fn configured_mail() -> MailConfig {
    MailConfig {
        api_key: Some("SG.test-key".to_string()),
        from_address: Some("leasing@casapropia.example".to_string()),
        admin_addresses: vec![
            "ops@casapropia.example".to_string(),
            "manager@casapropia.example".to_string(),
        ],
    }
}

pub(super) fn unconfigured_mail() -> MailConfig {
    MailConfig::default()
}

pub(super) fn sample_form() -> Value {
    json!({
        "email": "jane.doe@example.com",
        "firstName": "Jane",
        "lastName": "Doe",
        "propertyAddress": "1 Main St",
        "monthlyIncome": 4200,
    })
}

pub(super) fn build_service() -> (
    Arc<IntakeService<MemoryRepository, RecordingMailer>>,
    Arc<MemoryRepository>,
    Arc<RecordingMailer>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = Arc::new(IntakeService::new(
        repository.clone(),
        mailer.clone(),
        configured_mail(),
    ));
    (service, repository, mailer)
}
