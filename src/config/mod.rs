
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const PINECONE_API_KEY_VAR: &str = "PINECONE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub embedding_dimension: u32,
    /// Texts per embeddings request. The service caps request sizes, so
    /// larger ingestions are split into batches of this many chunks.
    pub embed_batch_size: u32,
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_dimension: 1536,
            embed_batch_size: 256,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    pub base_url: String,
    pub index_name: String,
    pub cloud: String,
    pub region: String,
    pub upsert_batch_size: u32,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pinecone.io".to_string(),
            index_name: "docqa".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            upsert_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows. Must be smaller than
    /// `chunk_size` or the window never advances.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid embed batch size: {0} (must be between 1 and 1000)")]
    InvalidEmbedBatchSize(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid index name: {0} (cannot be empty)")]
    InvalidIndexName(String),
    #[error("Invalid upsert batch size: {0} (must be between 1 and 1000)")]
    InvalidUpsertBatchSize(u32),
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for crate::DocqaError {
    fn from(err: ConfigError) -> Self {
        crate::DocqaError::Config(err.to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            pinecone: PineconeConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.openai.validate()?;
        self.pinecone.validate()?;

        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunking.chunk_size));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunking.chunk_overlap,
                self.chunking.chunk_size,
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.top_k > 100 {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        Ok(())
    }
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if self.embed_batch_size == 0 || self.embed_batch_size > 1000 {
            return Err(ConfigError::InvalidEmbedBatchSize(self.embed_batch_size));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        Ok(())
    }

    pub fn url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        env::var(OPENAI_API_KEY_VAR).map_err(|_| ConfigError::MissingApiKey(OPENAI_API_KEY_VAR))
    }
}

impl PineconeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.url()?;

        if self.index_name.trim().is_empty() {
            return Err(ConfigError::InvalidIndexName(self.index_name.clone()));
        }

        if self.upsert_batch_size == 0 || self.upsert_batch_size > 1000 {
            return Err(ConfigError::InvalidUpsertBatchSize(self.upsert_batch_size));
        }

        Ok(())
    }

    pub fn url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        env::var(PINECONE_API_KEY_VAR).map_err(|_| ConfigError::MissingApiKey(PINECONE_API_KEY_VAR))
    }
}

/// Default configuration directory, e.g. `~/.config/docqa` on Linux.
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("docqa"))
        .ok_or(ConfigError::DirectoryError)
}
