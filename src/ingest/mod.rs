#[cfg(test)]
mod tests;

use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ChunkingConfig, Config};
use crate::embeddings::EmbeddingClient;
use crate::embeddings::chunking::chunk;
use crate::extract::{PageText, extract_pages};
use crate::vector_store::{ChunkMetadata, VectorRecord, VectorStoreClient};
use crate::{DocqaError, Result};

/// Write path: extract pages, chunk, embed, and upsert into the vector
/// index.
///
/// Each run assigns fresh random ids, so re-ingesting the same document
/// creates new, independent records rather than updating prior ones. Callers
/// that need idempotent re-ingestion must delete by source first.
pub struct IngestionPipeline<'a> {
    config: &'a Config,
    embeddings: &'a EmbeddingClient,
    store: &'a VectorStoreClient,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        config: &'a Config,
        embeddings: &'a EmbeddingClient,
        store: &'a VectorStoreClient,
    ) -> Self {
        Self {
            config,
            embeddings,
            store,
        }
    }

    /// Ingest a PDF file, returning the number of chunks written. The
    /// source label defaults to the file name.
    pub fn ingest(&self, path: &Path, source_label: Option<&str>) -> Result<usize> {
        let source = match source_label {
            Some(label) => label.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        };

        let pages = extract_pages(path)?;
        self.ingest_pages(&pages, &source)
    }

    /// Ingest already-extracted pages under the given source label.
    ///
    /// A document with no extractable text is not an error: it is reported
    /// as zero chunks and nothing is written.
    pub fn ingest_pages(&self, pages: &[PageText], source: &str) -> Result<usize> {
        let metadatas = collect_chunks(pages, &self.config.chunking, source)?;

        if metadatas.is_empty() {
            warn!("No extractable text in '{}', nothing to ingest", source);
            return Ok(0);
        }

        let dimension = self.config.openai.embedding_dimension;
        let handle = self.store.ensure_index(dimension)?;

        let batch_size = self.config.openai.embed_batch_size as usize;
        let mut records = Vec::with_capacity(metadatas.len());
        for (batch_index, batch) in metadatas.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|m| m.text.clone()).collect();
            let embeddings = self.embeddings.embed(&texts).map_err(|e| match e {
                DocqaError::Service(message) => DocqaError::Service(format!(
                    "Embedding '{}' (batch {}): {}",
                    source, batch_index, message
                )),
                other => other,
            })?;

            if let Some(first) = embeddings.first() {
                if first.len() != dimension as usize {
                    return Err(DocqaError::Config(format!(
                        "Embedding model produced dimension {} but the index expects {}",
                        first.len(),
                        dimension
                    )));
                }
            }

            records.extend(make_records(batch, embeddings));
        }

        self.store
            .upsert(&handle, &records)
            .map_err(|e| match e {
                DocqaError::Service(message) => {
                    DocqaError::Service(format!("Upserting '{}': {}", source, message))
                }
                other => other,
            })?;

        info!("Ingested {} chunks from {}", records.len(), source);
        Ok(records.len())
    }
}

/// Chunk every page, attaching `{source, page, text}` metadata per chunk.
/// The chunk text is kept in metadata deliberately so retrieval can rebuild
/// its context without fetching documents again.
fn collect_chunks(
    pages: &[PageText],
    chunking: &ChunkingConfig,
    source: &str,
) -> Result<Vec<ChunkMetadata>> {
    let mut metadatas = Vec::new();
    for page in pages {
        for piece in chunk(&page.text, chunking.chunk_size, chunking.chunk_overlap)? {
            metadatas.push(ChunkMetadata {
                source: source.to_string(),
                page: page.number,
                text: piece.to_string(),
            });
        }
    }
    Ok(metadatas)
}

/// Pair each chunk with its embedding under a fresh random id.
fn make_records(
    metadatas: &[ChunkMetadata],
    embeddings: Vec<Vec<f32>>,
) -> Vec<VectorRecord> {
    metadatas
        .iter()
        .zip(embeddings)
        .map(|(metadata, values)| VectorRecord {
            id: Uuid::new_v4().to_string(),
            values,
            metadata: metadata.clone(),
        })
        .collect()
}
