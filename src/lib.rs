use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocqaError>;

#[derive(Error, Debug)]
pub enum DocqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod query;
pub mod vector_store;
