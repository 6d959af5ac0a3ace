use super::domain::ApplicationId;
use uuid::Uuid;

/// Applicant-facing prefix on every generated identifier.
pub const APPLICATION_ID_PREFIX: &str = "CP-";

const RANDOM_HEX_LEN: usize = 8;

/// Produce a fresh human-shareable identifier: `CP-` followed by eight
/// uppercase hex characters taken from a random UUID. Collision resistance,
/// not secrecy, is the requirement; the store's uniqueness constraint is the
/// backstop and callers retry on a duplicate.
pub fn generate_application_id() -> ApplicationId {
    let hex = Uuid::new_v4().simple().to_string();
    ApplicationId(format!(
        "{APPLICATION_ID_PREFIX}{}",
        hex[..RANDOM_HEX_LEN].to_ascii_uppercase()
    ))
}

/// Whether a string matches the generated identifier shape.
pub fn matches_format(candidate: &str) -> bool {
    match candidate.strip_prefix(APPLICATION_ID_PREFIX) {
        Some(rest) => {
            rest.len() == RANDOM_HEX_LEN
                && rest
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        }
        None => false,
    }
}
