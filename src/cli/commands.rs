//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use crate::analyzer::DocumentAnalyzer;
use crate::cache::OcrCache;
use crate::config;
use crate::local::LocalExtractor;
use crate::models::TextOrigin;
use crate::remote::{RemoteEngine, RemoteOcr};

#[derive(Parser)]
#[command(name = "doctext")]
#[command(about = "Document text extraction with provenance-gated OCR caching")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a document
    Extract {
        /// Path to the document file
        file: PathBuf,

        /// Treat the file as a pre-registered document, eligible for caching
        /// under its filename identity
        #[arg(long)]
        cacheable: bool,

        /// Emit the legacy field-shaped JSON result instead of plain text
        #[arg(long)]
        legacy: bool,
    },

    /// Inspect and manage the OCR cache (operator surface)
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Report remote provider configuration and local extraction libraries
    Check,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show record count and cached text size
    Stats,

    /// Delete one cached record, or all records when no ID is given
    Purge {
        /// Document ID to purge (purges everything when omitted)
        document_id: Option<String>,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = config::data_dir(cli.data_dir.as_deref());
    let settings = config::load_settings(&data_dir);
    let cache = OcrCache::new(config::cache_dir(&data_dir));

    match cli.command {
        Commands::Extract {
            file,
            cacheable,
            legacy,
        } => {
            let remote = RemoteOcr::new(settings.remote);
            let analyzer =
                DocumentAnalyzer::new(Arc::new(remote), Arc::new(LocalExtractor::new()), cache);
            extract(&analyzer, &file, cacheable, legacy).await
        }
        Commands::Cache { command } => match command {
            CacheCommands::Stats => {
                let stats = cache.stats();
                println!(
                    "{} {} records, {} bytes of cached text",
                    style("cache:").bold(),
                    stats.records,
                    stats.total_text_bytes
                );
                Ok(())
            }
            CacheCommands::Purge { document_id } => {
                let removed = cache.purge(document_id.as_deref());
                println!("{} purged {} record(s)", style("✓").green(), removed);
                Ok(())
            }
        },
        Commands::Check => {
            let remote = RemoteOcr::new(settings.remote);
            check(&remote);
            Ok(())
        }
    }
}

async fn extract(
    analyzer: &DocumentAnalyzer,
    file: &PathBuf,
    cacheable: bool,
    legacy: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", file.display(), e))?;

    // MIME type is informational only; warn but proceed on non-PDF input.
    if let Some(kind) = infer::get(&bytes) {
        if kind.mime_type() != "application/pdf" {
            eprintln!(
                "{} file looks like {}, not PDF; extraction may fail",
                style("warning:").yellow(),
                kind.mime_type()
            );
        }
    }

    let registered_path = if cacheable {
        Some(file.to_string_lossy().into_owned())
    } else {
        None
    };

    let result = analyzer.analyze(&bytes, registered_path.as_deref()).await;

    if legacy {
        println!("{}", serde_json::to_string_pretty(&result.legacy_view())?);
        return Ok(());
    }

    match result.source {
        TextOrigin::None => {
            eprintln!(
                "{} could not read this document (all extraction tiers failed)",
                style("✗").red()
            );
            std::process::exit(1);
        }
        origin => {
            eprintln!(
                "{} extracted {} chars (source: {})",
                style("✓").green(),
                result.text.len(),
                origin.as_str()
            );
            if let Some(warning) = &result.warning {
                eprintln!("{} {}", style("warning:").yellow(), warning);
            }
            println!("{}", result.text);
        }
    }

    Ok(())
}

fn check(remote: &RemoteOcr) {
    let marker = if remote.is_configured() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("{} {}", marker, remote.availability_hint());

    for lib in LocalExtractor::library_names() {
        println!("{} local extraction library: {} (built in)", style("✓").green(), lib);
    }
}
