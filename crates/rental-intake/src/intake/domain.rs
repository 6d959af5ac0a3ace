use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review status tracked throughout the application lifecycle.
///
/// The well-known states cover the machine-driven transitions; `Custom` keeps
/// the staff-facing status field open-ended, since reviewers may set labels
/// outside the standard set. Serialized as the raw snake_case string either
/// way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationStatus {
    AwaitingPayment,
    UnderReview,
    Approved,
    Denied,
    Custom(String),
}

impl ApplicationStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "awaiting_payment" => Self::AwaitingPayment,
            "under_review" => Self::UnderReview,
            "approved" => Self::Approved,
            "denied" => Self::Denied,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::AwaitingPayment => "awaiting_payment",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Custom(label) => label,
        }
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Payment sub-state. Closed set, unlike the review status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

/// A persisted rental application. Immutable after creation except for the
/// two status fields and `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: ApplicationId,
    pub applicant_email: String,
    pub applicant_name: String,
    pub application_status: ApplicationStatus,
    pub payment_status: PaymentStatus,
    pub form_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Street address submitted with the form, read only for display in
    /// notifications and summaries.
    pub fn property_address(&self) -> Option<&str> {
        self.form_data
            .get("propertyAddress")
            .and_then(|value| value.as_str())
            .filter(|addr| !addr.trim().is_empty())
    }
}
