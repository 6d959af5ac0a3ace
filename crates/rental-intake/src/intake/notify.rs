use std::sync::Arc;

use async_trait::async_trait;

use super::domain::{Application, ApplicationStatus};
use crate::config::MailConfig;

/// Fixed compliance text appended to denial notifications.
pub const FAIR_HOUSING_DISCLAIMER: &str = "This decision was made in compliance with the \
    Fair Housing Act. We do not discriminate on the basis of race, color, national origin, \
    religion, sex, familial status, or disability. If you believe this decision was made in \
    error, you may request a written explanation of the criteria used.";

/// Two-value locale selector for applicant-facing content. Admin and staff
/// notifications stay English-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    /// Derive a locale from a caller-supplied language preference, e.g. the
    /// form's `language` field or an `Accept-Language` header value.
    pub fn from_preference(preference: Option<&str>) -> Self {
        match preference {
            Some(value) if value.trim().to_ascii_lowercase().starts_with("es") => Self::Es,
            _ => Self::En,
        }
    }
}

/// A rendered message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Outbound mail transport seam. Implementations own the sender identity and
/// any network client state.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

/// Delivery failures. `NotConfigured` surfaces only on paths that require
/// synchronous delivery; lifecycle notifications treat it as a silent no-op.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("mail transport is not configured on the server")]
    NotConfigured,
    #[error("mail transport error: {0}")]
    Transport(String),
}

/// Turn a stored status value into the label shown in email bodies:
/// underscores to spaces, each word title-cased.
pub fn humanize_status(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const BRAND_NAME: &str = "Casa Propia";

fn footer_line(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Questions? Reply to this email and our leasing team will follow up.",
        Locale::Es => {
            "¿Preguntas? Responda a este correo y nuestro equipo de arrendamiento le atenderá."
        }
    }
}

/// One shared shell wraps every notification so header and footer markup stay
/// identical across events.
fn render_shell(title: &str, body_html: &str, locale: Locale) -> String {
    format!(
        concat!(
            r#"<div style="font-family:Arial,Helvetica,sans-serif;max-width:600px;margin:0 auto;">"#,
            r#"<div style="background:#1a3c5e;color:#ffffff;padding:24px;text-align:center;">"#,
            "<h1 style=\"margin:0;font-size:22px;\">{brand}</h1>",
            "</div>",
            r#"<div style="padding:24px;color:#333333;line-height:1.5;">"#,
            "<h2 style=\"margin-top:0;font-size:18px;\">{title}</h2>",
            "{body}",
            "</div>",
            r#"<div style="background:#f4f4f4;color:#777777;padding:16px;text-align:center;font-size:12px;">"#,
            "{footer}",
            "</div>",
            "</div>"
        ),
        brand = BRAND_NAME,
        title = title,
        body = body_html,
        footer = footer_line(locale),
    )
}

fn application_summary_rows(application: &Application) -> String {
    let mut rows = format!(
        "<p><strong>Application ID:</strong> {}</p>",
        application.application_id
    );
    if let Some(address) = application.property_address() {
        rows.push_str(&format!("<p><strong>Property:</strong> {}</p>", address));
    }
    rows
}

/// Renders event-specific bodies and hands them to the mail transport.
///
/// Holds the mail configuration by value so configured-ness is decided here,
/// not at each call site: lifecycle events no-op silently without credentials,
/// while the raw-send and recovery paths report the gap to the caller.
pub struct NotificationDispatcher<M> {
    mailer: Arc<M>,
    config: MailConfig,
}

impl<M: Mailer> NotificationDispatcher<M> {
    pub fn new(mailer: Arc<M>, config: MailConfig) -> Self {
        Self { mailer, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Localized submission confirmation to the applicant. Best-effort.
    pub async fn confirmation(
        &self,
        application: &Application,
        locale: Locale,
    ) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Ok(());
        }

        let (subject, title, lead) = match locale {
            Locale::En => (
                "We received your rental application",
                "Application received",
                format!(
                    "<p>Hi {},</p><p>Thank you for applying. Keep your application ID handy \
                     to check your status at any time.</p>",
                    application.applicant_name
                ),
            ),
            Locale::Es => (
                "Hemos recibido su solicitud de alquiler",
                "Solicitud recibida",
                format!(
                    "<p>Hola {},</p><p>Gracias por su solicitud. Guarde su número de solicitud \
                     para consultar el estado en cualquier momento.</p>",
                    application.applicant_name
                ),
            ),
        };

        let body = format!("{lead}{}", application_summary_rows(application));
        self.mailer
            .send(&EmailMessage {
                to: application.applicant_email.clone(),
                subject: subject.to_string(),
                html_body: render_shell(title, &body, locale),
            })
            .await
    }

    /// English-only alert to each configured admin address. Best-effort; a
    /// failure on one address does not stop the rest.
    pub async fn admin_alert(&self, application: &Application) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Ok(());
        }

        let body = format!(
            "<p>A new rental application was submitted by {} ({}).</p>{}",
            application.applicant_name,
            application.applicant_email,
            application_summary_rows(application),
        );
        let html_body = render_shell("New application submitted", &body, Locale::En);

        let mut last_err = None;
        for admin in &self.config.admin_addresses {
            let outcome = self
                .mailer
                .send(&EmailMessage {
                    to: admin.clone(),
                    subject: format!("New application {}", application.application_id),
                    html_body: html_body.clone(),
                })
                .await;
            if let Err(err) = outcome {
                last_err = Some(err);
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Sent after the paid/under-review transition commits.
    pub async fn payment_confirmed(&self, application: &Application) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Ok(());
        }

        let body = format!(
            "<p>Hi {},</p><p>We received your application fee. Your application is now \
             under review and we will be in touch with next steps.</p>{}",
            application.applicant_name,
            application_summary_rows(application),
        );
        self.mailer
            .send(&EmailMessage {
                to: application.applicant_email.clone(),
                subject: "Payment received — your application is under review".to_string(),
                html_body: render_shell("Payment confirmed", &body, Locale::En),
            })
            .await
    }

    /// Sent after a staff status overwrite commits. Denials carry the
    /// fair-housing disclaimer.
    pub async fn status_changed(
        &self,
        application: &Application,
        new_status: &ApplicationStatus,
    ) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Ok(());
        }

        let label = humanize_status(new_status.as_str());
        let mut body = format!(
            "<p>Hi {},</p><p>The status of your application is now \
             <strong>{label}</strong>.</p>{}",
            application.applicant_name,
            application_summary_rows(application),
        );
        if matches!(new_status, ApplicationStatus::Denied) {
            body.push_str(&format!(
                "<p style=\"font-size:12px;color:#777777;\">{FAIR_HOUSING_DISCLAIMER}</p>"
            ));
        }

        self.mailer
            .send(&EmailMessage {
                to: application.applicant_email.clone(),
                subject: format!("Application update: {label}"),
                html_body: render_shell("Application status update", &body, Locale::En),
            })
            .await
    }

    /// Email the requester every application ID registered under their
    /// address. Requires a configured transport.
    pub async fn id_recovery(
        &self,
        to: &str,
        applications: &[Application],
    ) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Err(DeliveryError::NotConfigured);
        }

        let mut rows = String::from("<ul>");
        for application in applications {
            rows.push_str(&format!(
                "<li><strong>{}</strong> — {}</li>",
                application.application_id,
                humanize_status(application.application_status.as_str()),
            ));
        }
        rows.push_str("</ul>");

        let body = format!(
            "<p>You asked us to resend your application ID(s). Here is everything \
             registered under this email address:</p>{rows}"
        );
        self.mailer
            .send(&EmailMessage {
                to: to.to_string(),
                subject: "Your application ID".to_string(),
                html_body: render_shell("Application ID recovery", &body, Locale::En),
            })
            .await
    }

    /// Passthrough for the direct send-email endpoint: no shell, no
    /// templating, configuration gaps surface to the caller.
    pub async fn send_raw(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError> {
        if !self.is_configured() {
            return Err(DeliveryError::NotConfigured);
        }

        self.mailer
            .send(&EmailMessage {
                to: to.to_string(),
                subject: subject.to_string(),
                html_body: html_body.to_string(),
            })
            .await
    }
}
