//! Local fallback text extraction.
//!
//! Best-effort extraction from PDF bytes using two local libraries in
//! priority order: `pdf-extract` first, `lopdf` second. Output from this tier
//! is low confidence and is never written to the cache. The public contract
//! never fails: per-library errors (and panics from font parsing inside
//! `pdf-extract`) are caught and the next library is tried; total failure
//! yields an empty string.

use thiserror::Error;
use tracing::debug;

/// Minimum trimmed output length, in characters, for a library's result to
/// be considered usable. Matches the remote adapter's threshold.
const MIN_TEXT_LEN: usize = 10;

/// Character-counted usability check; byte length would overcount non-ASCII
/// output.
fn usable_text(text: &str) -> bool {
    text.trim().chars().count() > MIN_TEXT_LEN
}

/// Errors internal to a single extraction library attempt.
#[derive(Debug, Error)]
enum LocalExtractError {
    #[error("pdf-extract failed: {0}")]
    PdfExtract(String),

    #[error("pdf-extract panicked")]
    PdfExtractPanic,

    #[error("lopdf failed: {0}")]
    Lopdf(#[from] lopdf::Error),

    #[error("document is encrypted")]
    Encrypted,

    #[error("no usable text extracted")]
    EmptyText,
}

/// Seam for the local fallback tier, so tests can inject deterministic fakes.
pub trait FallbackEngine: Send + Sync {
    /// Extract whatever text can be recovered locally. Returns an empty
    /// string when nothing usable was found. Never panics, never errors.
    fn extract(&self, bytes: &[u8]) -> String;
}

/// Local extractor over PDF bytes.
#[derive(Debug, Default)]
pub struct LocalExtractor;

impl LocalExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Names of the libraries tried, in priority order. Used by the `check`
    /// command.
    pub fn library_names() -> [&'static str; 2] {
        ["pdf-extract", "lopdf"]
    }

    /// Primary library: pdf-extract over the in-memory bytes.
    ///
    /// Wrapped in catch_unwind because its font parsing can panic on
    /// documents with unusual embedded fonts.
    fn extract_pdf_extract(&self, bytes: &[u8]) -> Result<String, LocalExtractError> {
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(LocalExtractError::PdfExtract(e.to_string())),
            Err(_) => return Err(LocalExtractError::PdfExtractPanic),
        };

        if usable_text(&text) {
            Ok(text)
        } else {
            Err(LocalExtractError::EmptyText)
        }
    }

    /// Secondary library: lopdf, extracting page by page in page order and
    /// joining page texts with a blank line.
    fn extract_lopdf(&self, bytes: &[u8]) -> Result<String, LocalExtractError> {
        let mut document = lopdf::Document::load_mem(bytes)?;

        if document.is_encrypted() && document.decrypt("").is_err() {
            return Err(LocalExtractError::Encrypted);
        }

        let mut page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        let mut page_texts = Vec::with_capacity(page_numbers.len());
        for page in page_numbers {
            match document.extract_text(&[page]) {
                Ok(text) if !text.trim().is_empty() => page_texts.push(text),
                Ok(_) => {}
                Err(e) => debug!(page, error = %e, "lopdf failed on page"),
            }
        }

        let text = page_texts.join("\n\n");
        if usable_text(&text) {
            Ok(text)
        } else {
            Err(LocalExtractError::EmptyText)
        }
    }
}

impl FallbackEngine for LocalExtractor {
    fn extract(&self, bytes: &[u8]) -> String {
        debug!(bytes = bytes.len(), "attempting local text extraction");

        match self.extract_pdf_extract(bytes) {
            Ok(text) => {
                debug!(chars = text.len(), "pdf-extract produced text");
                return text;
            }
            Err(e) => debug!(error = %e, "pdf-extract attempt failed"),
        }

        match self.extract_lopdf(bytes) {
            Ok(text) => {
                debug!(chars = text.len(), "lopdf produced text");
                return text;
            }
            Err(e) => debug!(error = %e, "lopdf attempt failed"),
        }

        debug!("no text extracted locally, returning empty");
        String::new()
    }
}
