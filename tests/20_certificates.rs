mod common;

use std::fs;
use std::path::Path;

use anyhow::Result;
use certkit::api::CertificateApi;
use certkit::certificates::id::is_valid_certificate_id;
use certkit::certificates::{generate_certificates, layout_output_dir, register_issued, FillOptions};
use certkit::registry::log::read_log;
use certkit::registry::Registry;

const LAYOUT: &str = r#"{
    "template_pdf": "template.pdf",
    "output_directory": "output",
    "font_family": "Roboto",
    "fields": {
        "name": { "x": 421, "y": 300, "font_size": 36, "font_weight": "bold", "alignment": "center", "color": [0, 51, 102] },
        "course": { "x": 421, "y": 250, "font_size": 18, "alignment": "center" },
        "certificate_id": { "x": 60, "y": 40, "font_size": 9 },
        "expiry_date": { "x": 780, "y": 40, "font_size": 9, "alignment": "right" }
    }
}"#;

fn setup(recipients: &str) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    common::write_template(&dir.path().join("template.pdf"))?;
    fs::write(dir.path().join("config.json"), LAYOUT)?;
    fs::write(dir.path().join("recipients.txt"), recipients)?;
    Ok(dir)
}

#[test]
fn fills_one_pdf_per_recipient() -> Result<()> {
    let dir = setup("# name,course\nJane Doe,Cloud Fundamentals\n\nJohn O'Roe,Kubernetes Basics\n")?;
    let mut registry = Registry::open(dir.path());

    let outcome = generate_certificates(&FillOptions::new(dir.path()), &mut registry)?;

    assert_eq!(outcome.report.total, 2);
    assert_eq!(outcome.report.succeeded, 2);
    assert!(outcome.report.is_success());

    let jane = dir.path().join("output").join("Jane_Doe_certificate.pdf");
    let john = dir.path().join("output").join("John_ORoe_certificate.pdf");
    assert!(jane.exists());
    assert!(john.exists());

    let content = common::first_page_content(&jane)?;
    assert!(common::contains(&content, "Jane Doe"));
    assert!(common::contains(&content, "Cloud Fundamentals"));
    assert!(common::contains(&content, "Certificate of Completion"), "template text must survive");

    let entry = registry.get("jane doe").expect("registered");
    assert!(is_valid_certificate_id(&entry.certificate_id));
    assert!(common::contains(&content, &entry.certificate_id));
    assert!(entry.pdf_generated);
    assert_ne!(entry.certificate_id, registry.get("John O'Roe").unwrap().certificate_id);

    let logged = read_log(&dir.path().join("output").join("certificate_ids.log"))?;
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].name, "Jane Doe");
    assert_eq!(logged[0].certificate_id, entry.certificate_id);
    Ok(())
}

#[test]
fn a_second_run_appends_to_the_log() -> Result<()> {
    let dir = setup("Jane Doe,Cloud Fundamentals\n")?;
    let mut registry = Registry::open(dir.path());

    generate_certificates(&FillOptions::new(dir.path()), &mut registry)?;
    generate_certificates(&FillOptions::new(dir.path()), &mut registry)?;

    let logged = read_log(&dir.path().join("output").join("certificate_ids.log"))?;
    assert_eq!(logged.len(), 2);
    assert_ne!(logged[0].certificate_id, logged[1].certificate_id);
    assert_eq!(registry.get("Jane Doe").unwrap().certificate_id, logged[1].certificate_id);
    Ok(())
}

#[test]
fn a_broken_template_fails_each_recipient_without_aborting() -> Result<()> {
    let dir = setup("Jane Doe,Cloud\nJohn Roe,K8s\n")?;
    fs::write(dir.path().join("template.pdf"), b"this is not a pdf")?;
    let mut registry = Registry::open(dir.path());

    let outcome = generate_certificates(&FillOptions::new(dir.path()), &mut registry)?;

    assert_eq!(outcome.report.total, 2);
    assert_eq!(outcome.report.failed, 2);
    assert_eq!(outcome.report.errors.len(), 2);
    assert!(outcome.report.errors[0].contains("Jane Doe"));
    assert!(registry.is_empty());
    assert!(outcome.report.into_result().is_err());
    Ok(())
}

#[tokio::test]
async fn register_api_pushes_issued_certificates() -> Result<()> {
    let mock = common::MockRegistry::start().await?;
    let api = CertificateApi::new(mock.config())?;

    let dir = setup("Jane Doe,Cloud Fundamentals\nJohn Roe,Kubernetes Basics\n")?;
    let mut registry = Registry::open(dir.path());
    let outcome = generate_certificates(&FillOptions::new(dir.path()), &mut registry)?;

    let report = register_issued(&api, &outcome.issued, &mut registry).await;
    assert_eq!(report.succeeded, 2);

    let jane = registry.get("Jane Doe").unwrap();
    assert!(jane.api_registered);
    let stored = mock.record(&jane.certificate_id).expect("pushed to registry");
    assert_eq!(stored["recipient_name"], "Jane Doe");
    assert_eq!(stored["course_name"], "Cloud Fundamentals");
    assert_eq!(stored["expiry_date"], jane.expiry_date.format("%Y-%m-%d").to_string());
    Ok(())
}

#[test]
fn the_log_follows_a_custom_output_directory() -> Result<()> {
    let dir = setup("Jane Doe,Cloud Fundamentals\n")?;
    fs::write(dir.path().join("config.json"), LAYOUT.replace(r#""output_directory": "output""#, r#""output_directory": "issued""#))?;
    let mut registry = Registry::open(dir.path());

    generate_certificates(&FillOptions::new(dir.path()), &mut registry)?;

    let issued = dir.path().join("issued");
    assert_eq!(registry.log_path(), issued.join("certificate_ids.log"));
    assert_eq!(read_log(&registry.log_path())?.len(), 1);
    assert!(!dir.path().join("output").exists());

    // A later run that only knows the config finds the same log
    let output_dir = layout_output_dir(dir.path(), Path::new("config.json"));
    assert_eq!(output_dir, issued);
    fs::remove_file(dir.path().join("certificate_registry.json"))?;
    let mut fresh = Registry::open(dir.path()).with_output_dir(output_dir);
    assert_eq!(fresh.sync_from_log(2)?, 1);
    assert!(fresh.get("Jane Doe").is_some());
    Ok(())
}
