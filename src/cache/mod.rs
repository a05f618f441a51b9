//! Persistent OCR result cache.
//!
//! One JSON record per document, stored under a two-level directory keyed by
//! hash prefix (`{cache_dir}/{id[..2]}/{id}.json`). Only results produced by
//! the remote OCR provider are ever written; records whose recorded source is
//! anything else are treated as misses on read. All IO failures fail open:
//! a broken read is a miss, a broken write is a refused write, and neither
//! reaches the caller as an error.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Recorded origin of a cached extraction, used to gate persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    /// Remote OCR provider output. The only source that may be persisted.
    Remote,
    /// Local fallback output. Refused on write, ignored on read.
    Local,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Remote => "remote",
            CacheSource::Local => "local",
        }
    }
}

/// Persisted cache record shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub document_id: String,
    pub extracted_text: String,
    pub source: CacheSource,
    pub cached_at: DateTime<Utc>,
}

/// Errors that can occur reading or writing cache records.
///
/// These never cross the cache boundary; they are absorbed into miss/refusal
/// semantics and logged.
#[derive(Debug, Error)]
enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] serde_json::Error),
}

/// Aggregate numbers for the operator-facing `cache stats` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub records: usize,
    pub total_text_bytes: u64,
}

/// Durable document-id to extracted-text store.
#[derive(Debug, Clone)]
pub struct OcrCache {
    dir: PathBuf,
}

impl OcrCache {
    /// Create a cache handle rooted at `dir`. The directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of this cache.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for a document.
    ///
    /// Two-level layout by id prefix keeps directories small when many
    /// documents are registered.
    fn record_path(&self, document_id: &str) -> PathBuf {
        let prefix = if document_id.len() >= 2 {
            &document_id[..2]
        } else {
            document_id
        };
        self.dir.join(prefix).join(format!("{}.json", document_id))
    }

    /// Look up cached text for a document.
    ///
    /// Returns `None` when no record exists, the record fails to parse, or
    /// its recorded source is not the remote provider.
    pub fn get(&self, document_id: &str) -> Option<String> {
        let path = self.record_path(document_id);
        if !path.exists() {
            return None;
        }

        let record = match self.read_record(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!(document_id, error = %e, "ignoring unreadable cache record");
                return None;
            }
        };

        if record.source != CacheSource::Remote {
            warn!(
                document_id,
                source = record.source.as_str(),
                "ignoring cache record with non-remote provenance"
            );
            return None;
        }

        debug!(document_id, "cache hit");
        Some(record.extracted_text)
    }

    /// Write a record for a document. Returns `true` only when the record was
    /// durably written.
    ///
    /// Refuses (without touching disk) any source other than the remote
    /// provider; IO failures are logged and reported as `false`.
    pub fn put(&self, document_id: &str, text: &str, source: CacheSource) -> bool {
        if source != CacheSource::Remote {
            warn!(
                document_id,
                source = source.as_str(),
                "refusing to cache non-remote extraction result"
            );
            return false;
        }

        let record = CacheRecord {
            document_id: document_id.to_string(),
            extracted_text: text.to_string(),
            source,
            cached_at: Utc::now(),
        };

        match self.write_record(&record) {
            Ok(()) => {
                debug!(document_id, bytes = text.len(), "cached remote OCR result");
                true
            }
            Err(e) => {
                warn!(document_id, error = %e, "failed to write cache record");
                false
            }
        }
    }

    /// Delete one record, or every record when `document_id` is `None`.
    /// Best-effort: failures are logged, not raised. Returns the number of
    /// records removed.
    pub fn purge(&self, document_id: Option<&str>) -> usize {
        match document_id {
            Some(id) => {
                let path = self.record_path(id);
                if !path.exists() {
                    return 0;
                }
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(document_id = id, "purged cache record");
                        1
                    }
                    Err(e) => {
                        warn!(document_id = id, error = %e, "failed to purge cache record");
                        0
                    }
                }
            }
            None => {
                let mut removed = 0;
                for path in self.record_files() {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "failed to purge cache record")
                        }
                    }
                }
                debug!(removed, "purged all cache records");
                removed
            }
        }
    }

    /// Count records and total cached text size.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for path in self.record_files() {
            match self.read_record(&path) {
                Ok(record) => {
                    stats.records += 1;
                    stats.total_text_bytes += record.extracted_text.len() as u64;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable record in stats")
                }
            }
        }
        stats
    }

    fn read_record(&self, path: &Path) -> Result<CacheRecord, CacheError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_record(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let path = self.record_path(&record.document_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(record)?;
        fs::write(&path, data)?;
        Ok(())
    }

    /// All `*.json` record files under the cache directory.
    fn record_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let subdirs = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return files,
        };
        for subdir in subdirs.filter_map(|e| e.ok()) {
            let Ok(entries) = fs::read_dir(subdir.path()) else {
                continue;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                    files.push(path);
                }
            }
        }
        files
    }
}
