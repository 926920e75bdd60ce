use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::{Config, get_config_dir};
use crate::embeddings::EmbeddingClient;
use crate::generation::CompletionClient;
use crate::ingest::IngestionPipeline;
use crate::query::QueryEngine;
use crate::vector_store::VectorStoreClient;

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir().context("Failed to locate config directory")?;
    Config::load(config_dir)
}

/// Ingest a PDF into the vector index.
pub fn ingest_document(file: &Path, source: Option<&str>) -> Result<()> {
    let config = load_config()?;

    let label = match source {
        Some(label) => label.to_string(),
        None => file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string()),
    };

    info!("Ingesting {} as '{}'", file.display(), label);

    let embeddings =
        EmbeddingClient::new(&config.openai).context("Failed to initialize embedding client")?;
    let store =
        VectorStoreClient::new(&config.pinecone).context("Failed to initialize vector store")?;

    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);
    let count = pipeline.ingest(file, Some(&label))?;

    if count == 0 {
        println!("No text found in document.");
    } else {
        println!("Ingested {} chunks from {}.", count, label);
    }
    Ok(())
}

/// Answer a question from the ingested documents.
pub fn ask_question(question: &str) -> Result<()> {
    let config = load_config()?;

    let embeddings =
        EmbeddingClient::new(&config.openai).context("Failed to initialize embedding client")?;
    let store =
        VectorStoreClient::new(&config.pinecone).context("Failed to initialize vector store")?;
    let completions =
        CompletionClient::new(&config.openai).context("Failed to initialize completion client")?;

    let engine = QueryEngine::new(&config, &embeddings, &store, &completions);
    let result = engine.answer(question)?;

    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &result.sources {
            println!("  - {}", source);
        }
    }
    Ok(())
}

/// Print the active configuration and where it came from.
pub fn show_config() -> Result<()> {
    let config_dir = get_config_dir().context("Failed to locate config directory")?;
    let config = load_config()?;

    println!("Config directory: {}", config_dir.display());
    println!();
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);

    println!();
    println!(
        "OPENAI_API_KEY: {}",
        if config.openai.api_key().is_ok() {
            "set"
        } else {
            "not set"
        }
    );
    println!(
        "PINECONE_API_KEY: {}",
        if config.pinecone.api_key().is_ok() {
            "set"
        } else {
            "not set"
        }
    );
    Ok(())
}

/// Write the default configuration file if none exists yet.
pub fn init_config() -> Result<()> {
    let config_dir = get_config_dir().context("Failed to locate config directory")?;
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let config = Config {
        base_dir: config_dir,
        ..Config::default()
    };
    config.save()?;

    println!("Wrote default config to {}", config_path.display());
    Ok(())
}
