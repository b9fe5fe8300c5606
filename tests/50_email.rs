mod common;

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use certkit::api::{CertificateApi, CertificateRecord};
use certkit::email::send::{send_personalized, send_same_email, send_with_attachments, PersonalizedRun};
use certkit::email::{EmailError, Throttle};
use certkit::recipients::{read_attachment_recipients, read_mail_recipients, AttachmentRecipient, MailRecipient};
use certkit::registry::Registry;

use common::MockMailer;

fn mail(name: &str, email: &str) -> MailRecipient {
    MailRecipient { name: name.to_string(), email: email.to_string() }
}

struct Workspace {
    _dir: tempfile::TempDir,
    certificates_dir: PathBuf,
    output_dir: PathBuf,
    attachments_dir: PathBuf,
}

impl Workspace {
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let certificates_dir = dir.path().join("certificates");
        let output_dir = certificates_dir.join("output");
        let attachments_dir = dir.path().join("emails").join("attachments");
        fs::create_dir_all(&output_dir)?;
        Ok(Self { _dir: dir, certificates_dir, output_dir, attachments_dir })
    }

    fn issue(&self, registry: &mut Registry, id: &str, name: &str, course: &str) -> Result<()> {
        let pdf = self.output_dir.join(certkit::certificates::safe_filename(name));
        fs::write(&pdf, b"%PDF-1.5 fake")?;
        let record = CertificateRecord::with_id(id, name, course, NaiveDate::from_ymd_opt(2025, 1, 10), 2);
        registry.register(&record, Some(pdf.as_path()))?;
        Ok(())
    }

    fn run(&self) -> PersonalizedRun {
        PersonalizedRun {
            subject: "Your certificate".to_string(),
            body_template: "Dear {name}, congratulations on {course_name}. ID: {cert_id}".to_string(),
            attachments_dir: self.attachments_dir.clone(),
            certificate_output_dir: self.output_dir.clone(),
            certificate_recipients: self.certificates_dir.join("recipients.txt"),
            auto_copy: true,
            auto_cleanup: true,
            expiry_years: 2,
        }
    }
}

#[tokio::test]
async fn same_email_continues_past_a_failed_recipient() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let flyer = dir.path().join("flyer.pdf");
    fs::write(&flyer, b"%PDF")?;
    let attachments = vec![flyer.clone(), dir.path().join("missing.pdf")];

    let mailer = MockMailer::rejecting(&["bad@example.com"]);
    let addresses = vec![
        "a@example.com".to_string(),
        "bad@example.com".to_string(),
        "c@example.com".to_string(),
    ];

    let report = send_same_email(&mailer, &Throttle::none(), &addresses, "News", "Hello all", &attachments).await?;

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].starts_with("bad@example.com"));
    assert!(report.notes.iter().any(|n| n.contains("missing.pdf")));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, "c@example.com");
    assert_eq!(sent[0].attachments, vec![flyer]);
    Ok(())
}

#[tokio::test]
async fn connection_failure_aborts_the_run() {
    let mailer = MockMailer { refuse_connect: true, ..Default::default() };
    let addresses = vec!["a@example.com".to_string()];

    let err = send_same_email(&mailer, &Throttle::none(), &addresses, "S", "B", &[]).await.unwrap_err();
    assert!(matches!(err, EmailError::Connect { .. }));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn personalized_attaches_matching_certificates() -> Result<()> {
    let ws = Workspace::new()?;
    let mut registry = Registry::open(&ws.certificates_dir);
    ws.issue(&mut registry, "JANE0000000000000001", "Jane Doe", "Cloud Fundamentals")?;
    ws.issue(&mut registry, "JOHN0000000000000002", "John Roe", "Kubernetes Basics")?;

    let mailer = MockMailer::default();
    let recipients = vec![
        mail("Jane Doe", "jane@example.com"),
        mail("John Roe", "john@example.com"),
        mail("Max Power", "max@example.com"),
    ];

    let report = send_personalized(&mailer, &Throttle::none(), &recipients, &ws.run(), &mut registry, None).await?;

    assert_eq!(report.succeeded, 3);
    assert!(report.notes.iter().any(|n| n.contains("Max Power")));

    let sent = mailer.sent();
    assert_eq!(sent[0].body, "Dear Jane Doe, congratulations on Cloud Fundamentals. ID: JANE0000000000000001");
    assert_eq!(sent[0].attachments, vec![ws.attachments_dir.join("Jane_Doe_certificate.pdf")]);
    assert_eq!(sent[1].subject, "Your certificate");
    assert!(sent[2].attachments.is_empty());
    assert_eq!(sent[2].body, "Dear Max Power, congratulations on Unknown Course. ID: Not Available");

    let jane = registry.get("Jane Doe").unwrap();
    assert!(jane.email_sent);
    assert!(jane.email_timestamp.is_some());
    assert!(!jane.api_registered);

    // Everything went out, so the copied attachments are cleaned up
    assert!(!ws.attachments_dir.join("Jane_Doe_certificate.pdf").exists());
    assert!(ws.output_dir.join("Jane_Doe_certificate.pdf").exists());
    Ok(())
}

#[tokio::test]
async fn personalized_keeps_attachments_after_a_failure() -> Result<()> {
    let ws = Workspace::new()?;
    let mut registry = Registry::open(&ws.certificates_dir);
    ws.issue(&mut registry, "JANE0000000000000001", "Jane Doe", "Cloud Fundamentals")?;
    ws.issue(&mut registry, "JOHN0000000000000002", "John Roe", "Kubernetes Basics")?;

    let mailer = MockMailer::rejecting(&["john@example.com"]);
    let recipients = vec![mail("Jane Doe", "jane@example.com"), mail("John Roe", "john@example.com")];

    let report = send_personalized(&mailer, &Throttle::none(), &recipients, &ws.run(), &mut registry, None).await?;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(registry.get("Jane Doe").unwrap().email_sent);
    assert!(!registry.get("John Roe").unwrap().email_sent);
    assert!(ws.attachments_dir.join("John_Roe_certificate.pdf").exists());
    Ok(())
}

#[tokio::test]
async fn personalized_registers_unknown_certificates_with_the_api() -> Result<()> {
    let mock = common::MockRegistry::start().await?;
    let api = CertificateApi::new(mock.config())?;

    let ws = Workspace::new()?;
    let mut registry = Registry::open(&ws.certificates_dir);
    ws.issue(&mut registry, "JANE0000000000000001", "Jane Doe", "Cloud Fundamentals")?;

    let mailer = MockMailer::default();
    let recipients = vec![mail("Jane Doe", "jane@example.com")];
    let report =
        send_personalized(&mailer, &Throttle::none(), &recipients, &ws.run(), &mut registry, Some(&api)).await?;

    assert_eq!(report.succeeded, 1);
    let stored = mock.record("JANE0000000000000001").expect("registered");
    assert_eq!(stored["recipient_name"], "Jane Doe");
    assert_eq!(stored["expiry_date"], "2027-01-10");
    assert!(registry.get("Jane Doe").unwrap().api_registered);
    Ok(())
}

#[tokio::test]
async fn attachments_mode_fails_rows_with_missing_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let certs = dir.path().join("certificates");
    fs::create_dir_all(&certs)?;
    fs::write(certs.join("jane.pdf"), b"%PDF")?;
    let list = dir.path().join("recipients.txt");
    fs::write(&list, "# name,email,file\nJane Doe,jane@example.com,jane.pdf\nJohn Roe,john@example.com,john.pdf\nbroken-row\n")?;

    let recipients: Vec<AttachmentRecipient> = read_attachment_recipients(&list)?;
    assert_eq!(recipients.len(), 2);

    let mailer = MockMailer::default();
    let report =
        send_with_attachments(&mailer, &Throttle::none(), &recipients, "Certificate", "Hi {name}!", &certs).await?;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].contains("john.pdf"));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, "Hi Jane Doe!");
    assert_eq!(sent[0].attachments, vec![certs.join("jane.pdf")]);

    let err = send_with_attachments(&mailer, &Throttle::none(), &recipients, "S", "B", &dir.path().join("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, EmailError::DirectoryNotFound(_)));
    Ok(())
}

#[test]
fn mail_list_accepts_email_only_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("email_list.csv");
    fs::write(&list, "name,email\nJane Doe,jane@example.com\nsolo@example.com\n")?;

    let recipients = read_mail_recipients(&list)?;
    assert_eq!(recipients, vec![mail("Jane Doe", "jane@example.com"), mail("solo", "solo@example.com")]);
    Ok(())
}
