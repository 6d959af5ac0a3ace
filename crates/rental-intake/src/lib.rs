//! Rental-application intake: lifecycle transitions, identifier generation,
//! and the notification side effects those transitions trigger.

pub mod config;
pub mod error;
pub mod intake;
pub mod telemetry;
