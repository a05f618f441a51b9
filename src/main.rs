//! Doctext - document text-extraction pipeline.
//!
//! Extracts plain text from documents through a cache / remote OCR / local
//! fallback chain, caching only high-quality remote results.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doctext::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "doctext=info"
    } else {
        "doctext=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Run CLI
    cli::run().await
}
