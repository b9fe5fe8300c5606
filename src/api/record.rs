use chrono::{Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::certificates::id::generate_certificate_id;

/// Certificate as the external registry stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub certificate_id: String,
    pub recipient_name: String,
    pub course_name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// Partial update; only the fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePatch {
    pub certificate_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

/// `issue + years`. 29 February lands on 28 February in non-leap years.
pub fn expiry_date(issue: NaiveDate, years: u32) -> NaiveDate {
    issue
        .checked_add_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MAX)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl CertificateRecord {
    /// New record with a freshly generated ID, issued today unless a date is given
    pub fn issue(
        recipient_name: &str,
        course_name: &str,
        issue_date: Option<NaiveDate>,
        expiry_years: u32,
    ) -> Self {
        Self::with_id(generate_certificate_id(), recipient_name, course_name, issue_date, expiry_years)
    }

    pub fn with_id(
        certificate_id: impl Into<String>,
        recipient_name: &str,
        course_name: &str,
        issue_date: Option<NaiveDate>,
        expiry_years: u32,
    ) -> Self {
        let issue_date = issue_date.unwrap_or_else(today);
        Self {
            certificate_id: certificate_id.into(),
            recipient_name: recipient_name.trim().to_string(),
            course_name: course_name.trim().to_string(),
            issue_date,
            expiry_date: expiry_date(issue_date, expiry_years),
        }
    }
}

impl From<&CertificateRecord> for CertificatePatch {
    fn from(record: &CertificateRecord) -> Self {
        Self {
            certificate_id: record.certificate_id.clone(),
            recipient_name: Some(record.recipient_name.clone()),
            course_name: Some(record.course_name.clone()),
            issue_date: Some(record.issue_date),
            expiry_date: Some(record.expiry_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_adds_configured_years() {
        assert_eq!(expiry_date(date(2025, 3, 14), 2), date(2027, 3, 14));
        assert_eq!(expiry_date(date(2025, 3, 14), 3), date(2028, 3, 14));
        assert_eq!(expiry_date(date(2025, 3, 14), 0), date(2025, 3, 14));
    }

    #[test]
    fn test_leap_day_clamps() {
        assert_eq!(expiry_date(date(2024, 2, 29), 1), date(2025, 2, 28));
        assert_eq!(expiry_date(date(2024, 2, 29), 4), date(2028, 2, 29));
    }

    #[test]
    fn test_issue_generates_id_and_trims() {
        let record = CertificateRecord::issue(" Jane Doe ", "Cloud 101 ", Some(date(2025, 1, 10)), 2);
        assert_eq!(record.certificate_id.len(), 20);
        assert_eq!(record.recipient_name, "Jane Doe");
        assert_eq!(record.course_name, "Cloud 101");
        assert_eq!(record.expiry_date, date(2027, 1, 10));
    }

    #[test]
    fn test_wire_format() {
        let record = CertificateRecord::with_id("ABC", "Jane", "Cloud", Some(date(2025, 1, 10)), 2);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["issue_date"], "2025-01-10");
        assert_eq!(value["expiry_date"], "2027-01-10");

        let patch = CertificatePatch { certificate_id: "ABC".into(), course_name: Some("New".into()), ..Default::default() };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({"certificate_id": "ABC", "course_name": "New"}));
    }
}
