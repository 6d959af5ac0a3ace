use crate::infra::{InMemoryApplicationRepository, RecordingMailer};
use clap::Args;
use rental_intake::config::MailConfig;
use rental_intake::error::AppError;
use rental_intake::intake::service::IntakeService;
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Applicant email used for the scripted submission
    #[arg(long, default_value = "jane.doe@example.com")]
    pub(crate) email: String,
    /// Street address shown in the generated notifications
    #[arg(long, default_value = "1 Main St")]
    pub(crate) property_address: String,
}

fn demo_mail_config() -> MailConfig {
    MailConfig {
        api_key: Some("SG.demo".to_string()),
        from_address: Some("leasing@casapropia.example".to_string()),
        admin_addresses: vec!["ops@casapropia.example".to_string()],
    }
}

/// Walk one application through the full lifecycle against in-memory
/// infrastructure, printing each transition and the emails it produced.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = IntakeService::new(repository, mailer.clone(), demo_mail_config());

    println!("== Rental intake lifecycle demo ==\n");

    let form = json!({
        "email": args.email,
        "firstName": "Jane",
        "lastName": "Doe",
        "propertyAddress": args.property_address,
    });
    let submitted = service.submit(form).await?;
    println!(
        "submitted    {} -> {} / {}",
        submitted.application_id,
        submitted.application_status.as_str(),
        submitted.payment_status.as_str(),
    );

    let paid = service
        .mark_payment(&submitted.application_id, "paid")
        .await?;
    println!(
        "marked paid  {} -> {} / {}",
        paid.application_id,
        paid.application_status.as_str(),
        paid.payment_status.as_str(),
    );

    let denied = service
        .set_status(&submitted.application_id, "denied")
        .await?;
    println!(
        "set status   {} -> {} / {}",
        denied.application_id,
        denied.application_status.as_str(),
        denied.payment_status.as_str(),
    );

    service.recover_id(&args.email).await?;

    println!("\nEmails generated:");
    for message in mailer.sent() {
        println!("  to {:<32} {}", message.to, message.subject);
    }

    Ok(())
}
