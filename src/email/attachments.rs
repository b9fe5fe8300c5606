use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

use super::matching::certificate_index;

/// Copy every PDF from the certificate output directory into the
/// attachments directory, overwriting older copies. Returns the number copied.
pub fn copy_certificates(source_dir: &Path, attachments_dir: &Path) -> io::Result<usize> {
    let certificates = certificate_index(source_dir)?;
    if certificates.is_empty() {
        info!("No certificates in {}, skipping auto-copy", source_dir.display());
        return Ok(0);
    }

    fs::create_dir_all(attachments_dir)?;
    let mut copied = 0;
    for path in certificates.values() {
        let Some(file_name) = path.file_name() else { continue };
        match fs::copy(path, attachments_dir.join(file_name)) {
            Ok(_) => copied += 1,
            Err(e) => warn!("Failed to copy {}: {}", path.display(), e),
        }
    }

    info!("Auto-copied {} certificate(s) to {}", copied, attachments_dir.display());
    Ok(copied)
}

/// Remove the PDFs from the attachments directory. Returns the number removed.
pub fn cleanup_attachments(attachments_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for path in certificate_index(attachments_dir)?.values() {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    if removed > 0 {
        info!("Auto-cleaned {} certificate(s) from {}", removed, attachments_dir.display());
    }
    Ok(removed)
}
