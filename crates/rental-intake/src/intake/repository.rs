use super::domain::{Application, ApplicationId, ApplicationStatus, PaymentStatus};

/// Storage abstraction so the lifecycle service can be exercised in isolation.
///
/// Implementations sort `list_all` newest-first by `created_at` and refresh
/// `updated_at` on every mutation. There is no delete: applications are kept
/// for the life of the store.
pub trait ApplicationRepository: Send + Sync {
    /// Persist a new application. Fails with [`RepositoryError::DuplicateIdentifier`]
    /// when the generated identifier is already taken.
    fn insert(&self, record: Application) -> Result<Application, RepositoryError>;

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;

    /// All applications submitted with the given email, possibly empty.
    fn list_by_email(&self, email: &str) -> Result<Vec<Application>, RepositoryError>;

    /// Every stored application, newest first, for the staff listing view.
    fn list_all(&self) -> Result<Vec<Application>, RepositoryError>;

    /// Commit both lifecycle fields in one transaction. Used by the mark-paid
    /// transition so payment and review status can never be observed torn.
    fn update_payment_and_status(
        &self,
        id: &ApplicationId,
        payment_status: PaymentStatus,
        application_status: ApplicationStatus,
    ) -> Result<Application, RepositoryError>;

    fn update_status(
        &self,
        id: &ApplicationId,
        application_status: ApplicationStatus,
    ) -> Result<Application, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application identifier already exists")]
    DuplicateIdentifier,
    #[error("application not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
