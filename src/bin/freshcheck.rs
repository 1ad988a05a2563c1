//! freshcheck - food freshness CLI
//!
//! Analyzes image files and prints one JSON result per image.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use freshcheck::{AnalyzerConfig, FoodAnalyzer, RawImage};

/// Classify food type and freshness from photos
#[derive(Parser)]
#[command(name = "freshcheck")]
#[command(version)]
#[command(about = "Food freshness analysis from still images")]
struct Args {
    /// Image files to analyze (JPEG, PNG, WebP, ...)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Path to configuration file.
    #[arg(short, long, env = "FRESHCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Load models before the first image and report their state
    #[arg(long)]
    warm_up: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AnalyzerConfig::load(args.config.as_deref())?;
    let analyzer = FoodAnalyzer::builder().config(config).build()?;

    if args.warm_up {
        let status = analyzer.warm_up().await;
        eprintln!(
            "models: primary {:?}, secondary {:?}",
            status.primary, status.secondary
        );
    }

    for path in &args.images {
        let bytes = std::fs::read(path)?;
        info!(path = %path.display(), bytes = bytes.len(), "analyzing");
        let result = analyzer.analyze(&RawImage::from_bytes(bytes)).await;

        let json = if args.pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{json}");
    }

    Ok(())
}
