use anyhow::Context;
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{ApiConfig, CertificateApi};
use crate::certificates::{layout_output_dir, LAYOUT_FILE_NAME};
use crate::cli::utils::finish_report;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::email::send::{send_personalized, send_same_email, send_with_attachments, PersonalizedRun};
use crate::email::{EmailConfig, EmailError, SmtpMailer};
use crate::recipients::{read_attachment_recipients, read_mail_recipients};
use crate::registry::Registry;

#[derive(Subcommand)]
pub enum EmailCommands {
    #[command(about = "Send the same email to every address in a list")]
    Same {
        #[arg(short, long, help = "name,email CSV (default: <data>/emails/email_list.csv)")]
        emails: Option<PathBuf>,
        #[arg(short, long, help = "Email subject")]
        subject: String,
        #[arg(short, long, help = "Text file with the email body (default: <data>/emails/email.txt)")]
        body: Option<PathBuf>,
        #[arg(short, long, help = "SMTP config file (default: <data>/emails/email_config.json)")]
        config: Option<PathBuf>,
        #[arg(short, long = "attachment", help = "File to attach to every message (repeatable)")]
        attachments: Vec<PathBuf>,
    },

    #[command(about = "Send each recipient their own certificate with a personalized body")]
    Personalized {
        #[arg(short, long, help = "Email subject")]
        subject: String,
        #[arg(short, long, help = "name,email CSV (default: <data>/emails/email_list.csv)")]
        emails: Option<PathBuf>,
        #[arg(short, long, help = "Body template with {name}, {course_name} and {cert_id} (default: <data>/emails/email.txt)")]
        body: Option<PathBuf>,
        #[arg(short, long, help = "SMTP config file (default: <data>/emails/email_config.json)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Directory holding the certificate PDFs (default: <data>/emails/attachments)")]
        attachments: Option<PathBuf>,
        #[arg(long, help = "Do not copy generated certificates into the attachments directory first")]
        no_auto_copy: bool,
        #[arg(long, help = "Keep the attachments directory after a fully successful run")]
        keep_attachments: bool,
    },

    #[command(about = "Send personalized emails with the file named in each recipient row attached")]
    Attachments {
        #[arg(short, long, help = "name,email,file CSV (default: <data>/outlook/recipients.txt)")]
        recipients: Option<PathBuf>,
        #[arg(short, long, help = "Body template with {name} (default: <data>/outlook/email.txt)")]
        body: Option<PathBuf>,
        #[arg(short, long, help = "SMTP config file (default: <data>/outlook/email_config.json)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Directory containing the files to attach (default: <data>/outlook/certificates)")]
        certificates: Option<PathBuf>,
        #[arg(short, long, help = "Email subject (default: subject from the config file)")]
        subject: Option<String>,
    },
}

fn read_body(path: &Path) -> anyhow::Result<String> {
    let body = fs::read_to_string(path).with_context(|| format!("Email body file not found: {}", path.display()))?;
    Ok(body.trim().to_string())
}

fn load_mailer(app: &AppConfig, path: &Path) -> anyhow::Result<(EmailConfig, SmtpMailer)> {
    let config = EmailConfig::load(path)?.with_overrides(&app.throttle, &app.secrets);
    let mailer = SmtpMailer::new(&config)?;
    Ok((config, mailer))
}

pub async fn handle(cmd: EmailCommands, app: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let emails_dir = &app.paths.emails_dir;
    let outlook_dir = &app.paths.outlook_dir;

    match cmd {
        EmailCommands::Same { emails, subject, body, config, attachments } => {
            let (config, mailer) = load_mailer(app, &config.unwrap_or_else(|| emails_dir.join("email_config.json")))?;
            let body = read_body(&body.unwrap_or_else(|| emails_dir.join("email.txt")))?;
            let recipients = read_mail_recipients(&emails.unwrap_or_else(|| emails_dir.join("email_list.csv")))?;
            let addresses: Vec<String> = recipients.into_iter().map(|r| r.email).collect();

            let report = send_same_email(&mailer, &config.throttle(), &addresses, &subject, &body, &attachments).await?;
            finish_report(&output_format, report)
        }

        EmailCommands::Personalized {
            subject,
            emails,
            body,
            config,
            attachments,
            no_auto_copy,
            keep_attachments,
        } => {
            let (config, mailer) = load_mailer(app, &config.unwrap_or_else(|| emails_dir.join("email_config.json")))?;
            let body_template = read_body(&body.unwrap_or_else(|| emails_dir.join("email.txt")))?;
            let recipients = read_mail_recipients(&emails.unwrap_or_else(|| emails_dir.join("email_list.csv")))?;

            let api_config = ApiConfig::load_or_default(&app.paths.api_config_file(), &app.secrets);
            let expiry_years = api_config.default_expiry_years;
            let api = CertificateApi::new(api_config)?;
            let certificates_dir = &app.paths.certificates_dir;
            let output_dir = layout_output_dir(certificates_dir, Path::new(LAYOUT_FILE_NAME));
            let mut registry = Registry::open(certificates_dir).with_output_dir(&output_dir);

            let run = PersonalizedRun {
                subject,
                body_template,
                attachments_dir: attachments.unwrap_or_else(|| app.paths.attachments_dir()),
                certificate_output_dir: output_dir,
                certificate_recipients: app.paths.certificates_dir.join("recipients.txt"),
                auto_copy: !no_auto_copy,
                auto_cleanup: !keep_attachments,
                expiry_years,
            };

            let report =
                send_personalized(&mailer, &config.throttle(), &recipients, &run, &mut registry, Some(&api)).await?;
            finish_report(&output_format, report)
        }

        EmailCommands::Attachments { recipients, body, config, certificates, subject } => {
            let (config, mailer) = load_mailer(app, &config.unwrap_or_else(|| outlook_dir.join("email_config.json")))?;
            let subject = subject.or_else(|| config.subject.clone()).ok_or(EmailError::MissingSubject)?;
            let body_template = read_body(&body.unwrap_or_else(|| outlook_dir.join("email.txt")))?;
            let recipients = read_attachment_recipients(&recipients.unwrap_or_else(|| outlook_dir.join("recipients.txt")))?;
            let certificates = certificates.unwrap_or_else(|| outlook_dir.join("certificates"));

            let report =
                send_with_attachments(&mailer, &config.throttle(), &recipients, &subject, &body_template, &certificates)
                    .await?;
            finish_report(&output_format, report)
        }
    }
}
