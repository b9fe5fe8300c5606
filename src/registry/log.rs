//! `certificate_ids.log`: the plain-text side record of issued certificates.
//!
//! Each generation run appends a block:
//!
//! ```text
//! ============================================================
//! Certificate Generation - 2025-01-10 14:03:22
//! ============================================================
//! 8K2M0QJ4TZ1V7C9XR5AB | Jane Doe | Cloud 101
//! ============================================================
//! ```

use chrono::Local;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub const LOG_FILE_NAME: &str = "certificate_ids.log";

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub certificate_id: String,
    pub name: String,
    pub course: String,
}

fn block(title: &str, entries: &[LogEntry]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{} - {}", title, Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{}", rule);
    for entry in entries {
        let _ = writeln!(out, "{} | {} | {}", entry.certificate_id, entry.name, entry.course);
    }
    let _ = writeln!(out, "{}", rule);
    out
}

/// Append one generation block; earlier blocks are never rewritten
pub fn append_issued(path: &Path, entries: &[LogEntry]) -> io::Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(block("Certificate Generation", entries).as_bytes())
}

/// Replace the log with a single export block
pub fn write_export(path: &Path, entries: &[LogEntry]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, block("Certificate Registry Export", entries))
}

pub fn parse_log(content: &str) -> Vec<LogEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.contains('|') && !line.starts_with('=') && !line.starts_with("Certificate"))
        .filter_map(|line| {
            let mut parts = line.split('|').map(str::trim);
            let certificate_id = parts.next()?;
            let name = parts.next()?;
            let course = parts.next()?;
            Some(LogEntry {
                certificate_id: certificate_id.to_string(),
                name: name.to_string(),
                course: course.to_string(),
            })
        })
        .collect()
}

/// All entries in file order; a missing log reads as empty
pub fn read_log(path: &Path) -> io::Result<Vec<LogEntry>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_log(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Most recent entry for a recipient, matched case-insensitively
pub fn latest_for<'a>(entries: &'a [LogEntry], name: &str) -> Option<&'a LogEntry> {
    let wanted = name.trim().to_uppercase();
    entries.iter().rev().find(|e| e.name.to_uppercase() == wanted)
}
