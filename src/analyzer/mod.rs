//! Extraction orchestrator.
//!
//! Sequences the three tiers for one document: cache lookup (cacheable
//! requests only), remote OCR, local fallback. A later tier is never
//! attempted once an earlier one succeeds, and only remote output is ever
//! written back to the cache. No step propagates an error to the caller;
//! the worst outcome is a `success=false` result.
//!
//! Concurrent requests for the same registered document serialize on a
//! per-document lock, so the second request re-checks the cache after the
//! first completes instead of paying for a duplicate remote call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheSource, OcrCache};
use crate::identity;
use crate::local::FallbackEngine;
use crate::models::ExtractionResult;
use crate::remote::RemoteEngine;

/// Orchestrates cache, remote OCR, and local fallback for extraction
/// requests. Collaborators are injected by the caller; the analyzer holds no
/// global state.
pub struct DocumentAnalyzer {
    remote: Arc<dyn RemoteEngine>,
    fallback: Arc<dyn FallbackEngine>,
    cache: OcrCache,
    // Per-document locks; entries live only while a request for that
    // document is in flight.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DocumentAnalyzer {
    pub fn new(
        remote: Arc<dyn RemoteEngine>,
        fallback: Arc<dyn FallbackEngine>,
        cache: OcrCache,
    ) -> Self {
        Self {
            remote,
            fallback,
            cache,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Extract text from document bytes.
    ///
    /// `registered_path` is the document's registered path for pre-registered
    /// (cacheable) documents; ad-hoc uploads pass `None` and never touch the
    /// cache. Cannot fail: exhaustion of all tiers returns a
    /// `success=false` result, not an error.
    pub async fn analyze(&self, bytes: &[u8], registered_path: Option<&str>) -> ExtractionResult {
        match registered_path {
            Some(path) => {
                let document_id = identity::document_id(path);
                let lock = self.document_lock(&document_id).await;

                let result = {
                    let _guard = lock.lock().await;

                    // Re-checked under the lock: a concurrent request for
                    // the same document may have populated the cache while
                    // we waited.
                    match self.cache.get(&document_id) {
                        Some(text) => {
                            info!(document_id, "serving cached extraction");
                            ExtractionResult::cached(text)
                        }
                        None => self.run_extraction(bytes, Some(&document_id)).await,
                    }
                };

                self.release_document_lock(&document_id, lock).await;
                result
            }
            None => self.run_extraction(bytes, None).await,
        }
    }

    /// Remote tier, then local tier. When `document_id` is present, a remote
    /// success is written back to the cache best-effort; the local path has
    /// no write call at all, so low-confidence output can never be persisted
    /// regardless of caller intent.
    async fn run_extraction(
        &self,
        bytes: &[u8],
        document_id: Option<&str>,
    ) -> ExtractionResult {
        let (text, ok) = self.remote.extract(bytes).await;
        if ok {
            if let Some(id) = document_id {
                // Best-effort: a failed write does not change this result.
                self.cache.put(id, &text, CacheSource::Remote);
            }
            info!(chars = text.len(), "remote OCR succeeded");
            return ExtractionResult::remote(text);
        }

        debug!("remote OCR unavailable or failed, trying local fallback");
        let text = self.fallback.extract(bytes);
        if !text.is_empty() {
            info!(chars = text.len(), "local fallback produced text");
            return ExtractionResult::local_fallback(text);
        }

        info!("no text found in document");
        ExtractionResult::no_text()
    }

    async fn document_lock(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a document's lock entry once no other request holds it.
    ///
    /// Checked under the map mutex: a strong count of two means only the map
    /// and this caller reference the lock, so nobody can be waiting on it.
    async fn release_document_lock(&self, document_id: &str, lock: Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        if Arc::strong_count(&lock) == 2 {
            inflight.remove(document_id);
        }
    }

    #[cfg(test)]
    async fn inflight_len(&self) -> usize {
        self.inflight.lock().await.len()
    }

    /// The cache this analyzer reads and writes.
    pub fn cache(&self) -> &OcrCache {
        &self.cache
    }
}
