//! Report store: the directory generated reports are published into.
//!
//! Each report lives at `{dir}/{id}.pdf` where `id` is a v4 UUID. Publishing
//! writes to a [`tempfile::NamedTempFile`] inside the same directory and
//! renames it into place, so a reader either sees the complete file or no
//! file. A published report is never overwritten; it stays until
//! [`ReportStore::remove`] deletes it.
//!
//! Lookups take the id as a string and parse it as a UUID before touching
//! the file system, which rules out path traversal through crafted ids.

use crate::error::ReportError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const EXTENSION: &str = "pdf";

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the report with `id` is (or would be) stored.
    pub fn path_for(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }

    /// Write `bytes` as the report `id`. Fails if that id is already taken.
    pub async fn publish(&self, id: Uuid, bytes: Vec<u8>) -> Result<PathBuf, ReportError> {
        let dir = self.dir.clone();
        let target = self.path_for(&id);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ReportError::StorageFailed {
                path: dir.clone(),
                source: e,
            })?;

        let path = target.clone();
        tokio::task::spawn_blocking(move || write_once(&dir, &path, &bytes))
            .await
            .map_err(|e| ReportError::Internal(format!("Store task panicked: {}", e)))??;

        info!("Published report {}", target.display());
        Ok(target)
    }

    /// Resolve a stored report id to its path.
    pub fn locate(&self, id: &str) -> Result<PathBuf, ReportError> {
        let uuid = parse_id(id)?;
        let path = self.path_for(&uuid);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ReportError::ReportNotFound { id: id.to_string() })
        }
    }

    pub fn exists(&self, id: &str) -> bool {
        self.locate(id).is_ok()
    }

    /// Read the stored PDF bytes.
    pub fn read(&self, id: &str) -> Result<Vec<u8>, ReportError> {
        let path = self.locate(id)?;
        std::fs::read(&path).map_err(|e| ReportError::StorageFailed { path, source: e })
    }

    /// Delete a stored report.
    pub fn remove(&self, id: &str) -> Result<(), ReportError> {
        let path = self.locate(id)?;
        std::fs::remove_file(&path).map_err(|e| ReportError::StorageFailed {
            path: path.clone(),
            source: e,
        })?;
        info!("Removed report {}", path.display());
        Ok(())
    }

    /// Ids of all stored reports, sorted. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<Uuid>, ReportError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(ReportError::StorageFailed {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        let mut ids: Vec<Uuid> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(EXTENSION))
            .filter_map(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

fn parse_id(id: &str) -> Result<Uuid, ReportError> {
    Uuid::parse_str(id.trim()).map_err(|_| ReportError::ReportNotFound { id: id.to_string() })
}

fn write_once(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let storage_err = |e: std::io::Error| ReportError::StorageFailed {
        path: target.to_path_buf(),
        source: e,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.as_file().sync_all().map_err(storage_err)?;
    tmp.persist_noclobber(target)
        .map_err(|e| storage_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), target.display());
    Ok(())
}
