//! End-to-end tests for the extraction pipeline: tier ordering, provenance
//! gating, and cache behavior across requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;

use doctext::analyzer::DocumentAnalyzer;
use doctext::cache::{CacheSource, OcrCache};
use doctext::identity;
use doctext::local::FallbackEngine;
use doctext::models::TextOrigin;
use doctext::remote::RemoteEngine;

/// Scripted remote engine: succeeds with fixed text or always fails, and
/// counts invocations.
struct ScriptedRemote {
    text: Option<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedRemote {
    fn online(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text),
            calls: AtomicUsize::new(0),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteEngine for ScriptedRemote {
    fn is_configured(&self) -> bool {
        self.text.is_some()
    }

    async fn extract(&self, _bytes: &[u8]) -> (String, bool) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.text {
            Some(text) => (text.to_string(), true),
            None => (String::new(), false),
        }
    }
}

/// Fixed-output local extractor.
struct ScriptedFallback(&'static str);

impl FallbackEngine for ScriptedFallback {
    fn extract(&self, _bytes: &[u8]) -> String {
        self.0.to_string()
    }
}

fn build(
    remote: Arc<ScriptedRemote>,
    fallback: &'static str,
    cache_dir: &std::path::Path,
) -> DocumentAnalyzer {
    DocumentAnalyzer::new(
        remote,
        Arc::new(ScriptedFallback(fallback)),
        OcrCache::new(cache_dir),
    )
}

// Writes with non-remote provenance are no-ops, and a subsequent get misses.
#[test]
fn non_remote_write_is_a_no_op() {
    let dir = tempdir().unwrap();
    let cache = OcrCache::new(dir.path());

    assert!(!cache.put("deadbeef", "locally extracted text", CacheSource::Local));
    assert!(cache.get("deadbeef").is_none());
}

// First request extracts remotely and persists; the second is served from
// cache with identical text and no remote call.
#[tokio::test]
async fn cache_idempotence_across_requests() {
    let dir = tempdir().unwrap();
    let remote = ScriptedRemote::online("INCOME CERTIFICATE FORM ...");
    let analyzer = build(remote.clone(), "", dir.path());

    let first = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert!(first.success);
    assert_eq!(first.source, TextOrigin::Remote);

    // Persisted record keyed by the filename digest.
    let id = identity::document_id("form_500.pdf");
    assert_eq!(
        analyzer.cache().get(&id).as_deref(),
        Some("INCOME CERTIFICATE FORM ...")
    );

    let second = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert!(second.success);
    assert_eq!(second.source, TextOrigin::Cache);
    assert_eq!(second.text, first.text);
    assert_eq!(remote.calls(), 1);
}

// Local success on a cacheable document leaves the cache empty.
#[tokio::test]
async fn local_success_never_reaches_cache() {
    let dir = tempdir().unwrap();
    let remote = ScriptedRemote::offline();
    let analyzer = build(remote, "Partial text", dir.path());

    let result = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert!(result.success);
    assert_eq!(result.source, TextOrigin::Local);
    assert_eq!(result.warning.as_deref(), Some("low-confidence extraction"));

    let id = identity::document_id("form_500.pdf");
    assert!(analyzer.cache().get(&id).is_none());
}

// A manually corrupted record (local provenance or missing text) reads as a
// miss, never as an error.
#[test]
fn corrupted_records_read_as_miss() {
    let dir = tempdir().unwrap();
    let cache = OcrCache::new(dir.path());
    let id = identity::document_id("form_500.pdf");

    let record_dir = dir.path().join(&id[..2]);
    std::fs::create_dir_all(&record_dir).unwrap();
    let path = record_dir.join(format!("{}.json", id));

    std::fs::write(
        &path,
        format!(
            r#"{{"document_id":"{id}","extracted_text":"x","source":"local","cached_at":"2024-01-01T00:00:00Z"}}"#
        ),
    )
    .unwrap();
    assert!(cache.get(&id).is_none());

    std::fs::write(
        &path,
        format!(r#"{{"document_id":"{id}","source":"remote","cached_at":"2024-01-01T00:00:00Z"}}"#),
    )
    .unwrap();
    assert!(cache.get(&id).is_none());
}

// Remote forced to fail + local producing text => degraded success.
#[tokio::test]
async fn fallback_ordering_yields_degraded_success() {
    let dir = tempdir().unwrap();
    let analyzer = build(ScriptedRemote::offline(), "recovered text body", dir.path());

    let result = analyzer.analyze(b"%PDF-1.4", None).await;
    assert!(result.success);
    assert_eq!(result.source, TextOrigin::Local);
    assert!(result.warning.is_some());
}

// Remote forced to fail + empty local output => total failure, not an error.
#[tokio::test]
async fn total_exhaustion_is_a_typed_failure() {
    let dir = tempdir().unwrap();
    let analyzer = build(ScriptedRemote::offline(), "", dir.path());

    let result = analyzer.analyze(b"%PDF-1.4", None).await;
    assert!(!result.success);
    assert_eq!(result.source, TextOrigin::None);
    assert!(result.text.is_empty());
    assert!(result.warning.is_none());
}

// Offline-provider scenario: cacheable document, local fallback text, cache
// stays absent for that id.
#[tokio::test]
async fn offline_provider_scenario() {
    let dir = tempdir().unwrap();
    let analyzer = build(ScriptedRemote::offline(), "Partial text", dir.path());

    let result = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert!(result.success);
    assert_eq!(result.source, TextOrigin::Local);
    assert_eq!(result.text, "Partial text");
    assert_eq!(result.warning.as_deref(), Some("low-confidence extraction"));

    assert_eq!(analyzer.cache().stats().records, 0);
}

// A failed cache write is invisible to the caller: the remote result is
// still returned as a success, and the slot simply stays empty.
#[tokio::test]
async fn cache_write_failure_does_not_affect_remote_result() {
    let dir = tempdir().unwrap();

    // A plain file occupying the record's subdirectory path makes every
    // write for this document fail.
    let id = identity::document_id("form_500.pdf");
    std::fs::write(dir.path().join(&id[..2]), "not a directory").unwrap();

    let cache = OcrCache::new(dir.path());
    assert!(!cache.put(&id, "remote text", CacheSource::Remote));

    let remote = ScriptedRemote::online("INCOME CERTIFICATE FORM ...");
    let analyzer = build(remote.clone(), "", dir.path());

    let result = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert!(result.success);
    assert_eq!(result.source, TextOrigin::Remote);

    // Nothing was persisted, so a repeat request pays for remote again.
    let repeat = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert_eq!(repeat.source, TextOrigin::Remote);
    assert_eq!(remote.calls(), 2);
}

// The cache outlives the analyzer that wrote it: a fresh analyzer over the
// same directory serves the cached text without a remote call.
#[tokio::test]
async fn cache_survives_restart() {
    let dir = tempdir().unwrap();

    {
        let analyzer = build(ScriptedRemote::online("first process lifetime text"), "", dir.path());
        let result = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
        assert_eq!(result.source, TextOrigin::Remote);
    }

    let remote = ScriptedRemote::online("should not be called");
    let analyzer = build(remote.clone(), "", dir.path());
    let result = analyzer.analyze(b"%PDF-1.4", Some("form_500.pdf")).await;
    assert_eq!(result.source, TextOrigin::Cache);
    assert_eq!(result.text, "first process lifetime text");
    assert_eq!(remote.calls(), 0);
}
