//! Remote OCR adapter.
//!
//! Wraps the paid document-understanding HTTP service (Google Document AI
//! wire shape). Every failure mode - missing configuration, transport
//! errors, non-2xx responses, unparseable bodies, near-empty output - is
//! normalized to `("", false)`; nothing crosses this boundary as an error.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Minimum trimmed output length, in characters, for a remote call to count
/// as a success. Guards against the provider returning a near-empty result
/// for a malformed document without an API-level error.
const MIN_TEXT_LEN: usize = 10;

/// Whether provider output clears the usability threshold. Counted in
/// characters, not bytes, so short non-ASCII output does not slip through.
fn usable_output(text: &str) -> bool {
    text.trim().chars().count() > MIN_TEXT_LEN
}

fn default_location() -> String {
    "us".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}

/// Configuration for the remote OCR provider.
///
/// The adapter is considered configured only when project, processor, and
/// access token are all present; otherwise it degrades to the local fallback
/// without attempting a network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOcrConfig {
    /// Cloud project that owns the document processor.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Processor region (default: us).
    #[serde(default = "default_location")]
    pub location: String,
    /// Document processor ID.
    #[serde(default)]
    pub processor_id: Option<String>,
    /// Bearer token for the processor endpoint.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Override the full endpoint URL (primarily for self-hosted gateways).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds. The remote call must never hang the
    /// extraction chain indefinitely.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteOcrConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location: default_location(),
            processor_id: None,
            access_token: None,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteOcrConfig {
    /// Whether every credential needed for a call is present.
    pub fn is_complete(&self) -> bool {
        self.project_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.processor_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.access_token.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Full `:process` URL for the configured processor.
    fn process_url(&self) -> Option<String> {
        if let Some(endpoint) = &self.endpoint {
            return Some(endpoint.clone());
        }
        let project = self.project_id.as_deref()?;
        let processor = self.processor_id.as_deref()?;
        Some(format!(
            "https://{loc}-documentai.googleapis.com/v1/projects/{project}/locations/{loc}/processors/{processor}:process",
            loc = self.location,
        ))
    }
}

/// Errors internal to the remote call. Absorbed into the `(text, success)`
/// return contract before leaving the adapter.
#[derive(Debug, Error)]
enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: HTTP {0}")]
    Api(reqwest::StatusCode),

    #[error("no usable text in response")]
    EmptyText,

    #[error("processor endpoint not configured")]
    NotConfigured,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocument,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    content: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    document: Option<ProcessedDocument>,
}

#[derive(Debug, Deserialize)]
struct ProcessedDocument {
    #[serde(default)]
    text: String,
}

/// Seam for the remote OCR tier, so tests can inject deterministic fakes.
#[async_trait]
pub trait RemoteEngine: Send + Sync {
    /// Whether credentials are present and a call could be attempted.
    fn is_configured(&self) -> bool;

    /// Submit document bytes for OCR. Returns `(text, true)` on success,
    /// `("", false)` on any failure. Never panics, never errors.
    async fn extract(&self, bytes: &[u8]) -> (String, bool);
}

/// Remote OCR client over HTTP.
pub struct RemoteOcr {
    config: RemoteOcrConfig,
    client: Client,
}

impl RemoteOcr {
    /// Create a client from configuration. The request timeout is owned here,
    /// not by callers.
    pub fn new(config: RemoteOcrConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Human-readable configuration status for the `check` command.
    pub fn availability_hint(&self) -> String {
        if self.is_configured() {
            format!(
                "remote OCR configured (project: {}, location: {})",
                self.config.project_id.as_deref().unwrap_or("?"),
                self.config.location
            )
        } else {
            "remote OCR not configured; set DOCTEXT_OCR_PROJECT_ID, \
             DOCTEXT_OCR_PROCESSOR_ID, and DOCTEXT_OCR_ACCESS_TOKEN"
                .to_string()
        }
    }

    async fn call(&self, bytes: &[u8]) -> Result<String, RemoteError> {
        // process_url is Some whenever is_complete holds
        let url = self.config.process_url().ok_or(RemoteError::NotConfigured)?;

        let request = ProcessRequest {
            raw_document: RawDocument {
                content: base64::engine::general_purpose::STANDARD.encode(bytes),
                mime_type: "application/pdf".to_string(),
            },
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.config.access_token.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RemoteError::Api(resp.status()));
        }

        let body: ProcessResponse = resp.json().await?;
        let text = body.document.map(|d| d.text).unwrap_or_default();

        if usable_output(&text) {
            Ok(text)
        } else {
            Err(RemoteError::EmptyText)
        }
    }
}

#[async_trait]
impl RemoteEngine for RemoteOcr {
    fn is_configured(&self) -> bool {
        self.config.is_complete()
    }

    async fn extract(&self, bytes: &[u8]) -> (String, bool) {
        if !self.is_configured() {
            debug!("remote OCR not configured, skipping");
            return (String::new(), false);
        }

        debug!(bytes = bytes.len(), "submitting document to remote OCR");
        match self.call(bytes).await {
            Ok(text) => {
                info!(chars = text.len(), "remote OCR extraction succeeded");
                (text, true)
            }
            Err(e) => {
                warn!(error = %e, "remote OCR extraction failed");
                (String::new(), false)
            }
        }
    }
}
