//! Result types for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Where an extraction result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOrigin {
    /// Previously cached remote OCR output.
    Cache,
    /// Fresh output from the remote OCR provider.
    Remote,
    /// Best-effort local extraction (low confidence).
    Local,
    /// No tier produced usable text.
    None,
}

impl TextOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextOrigin::Cache => "cache",
            TextOrigin::Remote => "remote",
            TextOrigin::Local => "local",
            TextOrigin::None => "none",
        }
    }
}

/// Warning attached to results sourced from the local fallback tier.
pub const LOW_CONFIDENCE_WARNING: &str = "low-confidence extraction";

/// Outcome of one extraction request. Constructed fresh per request,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub text: String,
    pub source: TextOrigin,
    /// Set when `source` is `local`, signalling low confidence to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ExtractionResult {
    /// Cache hit.
    pub fn cached(text: String) -> Self {
        Self {
            success: true,
            text,
            source: TextOrigin::Cache,
            warning: None,
        }
    }

    /// Successful remote OCR call.
    pub fn remote(text: String) -> Self {
        Self {
            success: true,
            text,
            source: TextOrigin::Remote,
            warning: None,
        }
    }

    /// Local fallback produced text; tagged low-confidence.
    pub fn local_fallback(text: String) -> Self {
        Self {
            success: true,
            text,
            source: TextOrigin::Local,
            warning: Some(LOW_CONFIDENCE_WARNING.to_string()),
        }
    }

    /// All tiers exhausted.
    pub fn no_text() -> Self {
        Self {
            success: false,
            text: String::new(),
            source: TextOrigin::None,
            warning: None,
        }
    }

    /// Reshape into the field-level view older callers expect.
    ///
    /// Pure reshaping: the extracted text becomes a single-element paragraph
    /// list; fields and tables are always empty (field parsing belongs to an
    /// external semantic layer).
    pub fn legacy_view(&self) -> DocumentAnalysis {
        let paragraphs = if self.success && !self.text.is_empty() {
            vec![self.text.clone()]
        } else {
            Vec::new()
        };

        DocumentAnalysis {
            success: self.success,
            fields: Vec::new(),
            paragraphs,
            tables: Vec::new(),
        }
    }
}

/// A key-value pair in the legacy field-level result shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Legacy field-shaped result view for callers expecting `fields`,
/// `paragraphs`, and `tables` output.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub success: bool,
    pub fields: Vec<FormField>,
    pub paragraphs: Vec<String>,
    pub tables: Vec<serde_json::Value>,
}
