//! Input validation: make sure every path names a readable PDF.
//!
//! Checking existence, read permission, and the `%PDF` magic bytes up front
//! gives callers a precise [`ReportError::UnreadableDocument`] instead of an
//! opaque parser failure, and it happens before any LLM call is made.

use crate::error::ReportError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Validate one input file.
pub fn validate_pdf(path: &Path) -> Result<(), ReportError> {
    if !path.exists() {
        return Err(ReportError::unreadable(path, "file not found"));
    }
    if path.is_dir() {
        return Err(ReportError::unreadable(path, "path is a directory"));
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ReportError::unreadable(path, "permission denied"));
        }
        Err(e) => return Err(ReportError::unreadable(path, e.to_string())),
    };

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => {}
        Ok(()) => {
            return Err(ReportError::unreadable(
                path,
                format!("not a PDF (first bytes: {magic:?})"),
            ));
        }
        Err(_) => return Err(ReportError::unreadable(path, "file is too short to be a PDF")),
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(())
}

/// Validate all inputs, failing on the first bad one.
pub fn validate_all<P: AsRef<Path>>(paths: &[P]) -> Result<(), ReportError> {
    if paths.is_empty() {
        return Err(ReportError::InvalidConfig(
            "at least one input PDF is required".into(),
        ));
    }
    paths.iter().try_for_each(|p| validate_pdf(p.as_ref()))
}
