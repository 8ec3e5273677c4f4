mod args;

use anyhow::{anyhow, Result};
use args::{Cli, OutputFormat};
use clap::Parser;
use doctext::{
    load_config, load_config_from, DocumentBuffer, ExtractionError, Extractor, ExtractorConfig,
};
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config_path {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    init_tracing(&config, cli.log_level.as_deref());
    if cli.name.is_some() && cli.files.len() > 1 {
        return Err(anyhow!("--name can only be used with a single input file"));
    }

    let extractor = Extractor::new(config);
    let mut failures = 0usize;
    for path in &cli.files {
        let outcome = match load_document(path, cli.name.as_deref()) {
            Ok(document) => extractor.extract_async(document).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(result) => match cli.output {
                OutputFormat::Text => println!("{}", result.full_text),
                OutputFormat::Json => {
                    let mut payload = result.to_payload();
                    payload["file"] = json!(path.display().to_string());
                    println!("{payload}");
                }
            },
            Err(err) => {
                failures += 1;
                warn!("{}: {}", path.display(), err.kind().code());
                match cli.output {
                    OutputFormat::Text => eprintln!("{}: {}", path.display(), err.message()),
                    OutputFormat::Json => {
                        let mut payload = err.to_payload();
                        payload["file"] = json!(path.display().to_string());
                        println!("{payload}");
                    }
                }
            }
        }
    }

    info!("processed {} files, {failures} failed", cli.files.len());
    if failures > 0 {
        return Err(anyhow!("{failures} of {} files failed", cli.files.len()));
    }
    Ok(())
}

fn load_document(path: &Path, name: Option<&str>) -> Result<DocumentBuffer, ExtractionError> {
    let document = DocumentBuffer::read_path(path)?;
    Ok(match name {
        Some(name) => document.with_filename(name),
        None => document,
    })
}

fn init_tracing(config: &ExtractorConfig, override_level: Option<&str>) {
    let default_level = override_level
        .unwrap_or(config.observability.log_level.as_str())
        .trim()
        .to_lowercase();
    let default_level = if default_level.is_empty() {
        "warn".to_string()
    } else {
        default_level
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
