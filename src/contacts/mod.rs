//! Phone number list to vCard conversion.

pub mod phone;

pub use phone::normalize_phone;

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::InputError;

/// Normalized, deduplicated numbers plus the counts from building them
#[derive(Debug, Clone, Default)]
pub struct ContactBook {
    numbers: BTreeSet<String>,
    pub total: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Outcome of a contact generation run
#[derive(Debug, Clone, Serialize)]
pub struct ContactSummary {
    pub total: usize,
    pub valid: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub output_file: PathBuf,
}

impl ContactBook {
    pub fn from_text(raw: &str) -> Self {
        Self::from_lines(raw.trim().lines())
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut book = ContactBook::default();
        for line in lines {
            book.total += 1;
            match normalize_phone(line) {
                Some(number) => {
                    if !book.numbers.insert(number) {
                        book.duplicates += 1;
                    }
                }
                None => {
                    debug!("Dropping invalid phone number: {:?}", line.trim());
                    book.invalid += 1;
                }
            }
        }
        book
    }

    pub fn valid(&self) -> usize {
        self.numbers.len()
    }

    /// Numbers in ascending order
    pub fn numbers(&self) -> impl Iterator<Item = &str> {
        self.numbers.iter().map(String::as_str)
    }

    /// Render one vCard 3.0 entry per number, named `<prefix> <n>`
    pub fn to_vcf(&self, prefix: &str) -> String {
        let mut out = String::new();
        for (idx, number) in self.numbers().enumerate() {
            let _ = write!(
                out,
                "BEGIN:VCARD\nVERSION:3.0\nFN:{} {}\nTEL;TYPE=CELL:{}\nEND:VCARD\n",
                prefix,
                idx + 1,
                number
            );
        }
        out
    }
}

/// Resolve where the VCF goes: an explicit name is used as-is when it has a
/// directory component, otherwise it is placed in `default_dir`.
pub fn resolve_output_path(input: &Path, output: Option<&str>, default_dir: &Path) -> PathBuf {
    let name = match output {
        Some(name) => PathBuf::from(name),
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "numbers".to_string());
            PathBuf::from(format!("{}_contacts.vcf", stem))
        }
    };

    let has_dir = name.parent().map(|p| !p.as_os_str().is_empty()).unwrap_or(false);
    if has_dir {
        name
    } else {
        default_dir.join(name)
    }
}

/// Read `input`, write the VCF and report the counts
pub fn generate_vcf_from_file(
    input: &Path,
    output: Option<&str>,
    prefix: &str,
    default_dir: &Path,
) -> anyhow::Result<ContactSummary> {
    let raw = fs::read_to_string(input).map_err(|e| InputError::read(input, e))?;
    let book = ContactBook::from_text(&raw);

    let output_file = resolve_output_path(input, output, default_dir);
    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_file, book.to_vcf(prefix))?;

    info!(
        "Wrote {} contacts to {} ({} duplicates, {} invalid)",
        book.valid(),
        output_file.display(),
        book.duplicates,
        book.invalid
    );

    Ok(ContactSummary {
        total: book.total,
        valid: book.valid(),
        duplicates: book.duplicates,
        invalid: book.invalid,
        output_file,
    })
}
