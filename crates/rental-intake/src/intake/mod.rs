//! Application intake and lifecycle: submission, identifier recovery, staff
//! payment/status transitions, and the notification side effects they trigger.

pub mod domain;
pub mod identifier;
pub mod notify;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Application, ApplicationId, ApplicationStatus, PaymentStatus};
pub use identifier::generate_application_id;
pub use notify::{
    DeliveryError, EmailMessage, Locale, Mailer, NotificationDispatcher, FAIR_HOUSING_DISCLAIMER,
};
pub use repository::{ApplicationRepository, RepositoryError};
pub use router::intake_router;
pub use service::{IntakeService, IntakeServiceError};
