//! Pairing recipients with generated certificate PDFs by name.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `Jane O'Doe` becomes `jane_odoe`
pub fn normalize_name_for_matching(name: &str) -> String {
    let stripped = NON_WORD.replace_all(name.trim(), "");
    WHITESPACE.replace_all(&stripped, "_").to_lowercase()
}

/// PDFs in `dir`, keyed by file stem. A missing directory is empty.
pub fn certificate_index(dir: &Path) -> io::Result<BTreeMap<String, PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e),
    };

    let mut index = BTreeMap::new();
    for entry in entries {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            index.insert(stem.to_string(), path.clone());
        }
    }
    Ok(index)
}

/// First certificate whose stem contains the normalized name, else the
/// first where at least half of the name parts longer than two characters
/// appear in the stem.
pub fn find_matching_certificate<'a>(name: &str, certificates: &'a BTreeMap<String, PathBuf>) -> Option<&'a Path> {
    let normalized = normalize_name_for_matching(name);
    if normalized.is_empty() {
        return None;
    }

    let stems: Vec<(String, &'a Path)> = certificates
        .iter()
        .map(|(stem, path)| (stem.to_lowercase(), path.as_path()))
        .collect();

    if let Some((_, path)) = stems.iter().find(|(stem, _)| stem.contains(normalized.as_str())) {
        return Some(*path);
    }

    let parts: Vec<&str> = normalized.split('_').collect();
    let needed = (parts.len() / 2).max(1);
    stems
        .iter()
        .find(|(stem, _)| {
            parts
                .iter()
                .filter(|part| part.chars().count() > 2 && stem.contains(*part))
                .count()
                >= needed
        })
        .map(|(_, path)| *path)
}
