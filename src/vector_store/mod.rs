
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::PineconeConfig;
use crate::{DocqaError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client for a Pinecone-style vector index service.
///
/// The control plane (`base_url`) lists, describes, and creates indexes;
/// each index exposes its own data-plane host for upserts and queries. The
/// index is provisioned lazily: [`ensure_index`](Self::ensure_index) creates
/// it on first use and is a cheap describe call afterwards.
#[derive(Debug, Clone)]
pub struct VectorStoreClient {
    base_url: Url,
    api_key: String,
    index_name: String,
    cloud: String,
    region: String,
    upsert_batch_size: usize,
    agent: ureq::Agent,
}

/// Connection handle for one index's data plane.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    host: Url,
}

/// Metadata stored alongside each vector.
///
/// The chunk text is stored redundantly here so the query path can assemble
/// its context from the match payload alone, without a second fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
    pub text: String,
}

/// A vector plus metadata, keyed by a UUID assigned at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One nearest-neighbor match, normalized at the adapter boundary.
///
/// Records written by the ingestion pipeline always carry metadata; a record
/// without it (or with missing fields) normalizes to defaults rather than
/// failing the whole query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    dimension: u32,
    host: String,
    #[serde(default)]
    metric: String,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u32,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

impl VectorStoreClient {
    /// Build a client using the API key from the environment. A missing key
    /// is a configuration error, fatal before any remote call.
    pub fn new(config: &PineconeConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &PineconeConfig, api_key: String) -> Result<Self> {
        let base_url = config.url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            index_name: config.index_name.clone(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            upsert_batch_size: config.upsert_batch_size as usize,
            agent,
        })
    }

    /// Describe the configured index, or `None` when it does not exist yet.
    fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let url = self
            .base_url
            .join(&format!("/indexes/{}", self.index_name))
            .map_err(|e| DocqaError::Config(format!("Failed to build describe URL: {}", e)))?;

        let response = self
            .agent
            .get(url.as_str())
            .header("Api-Key", &self.api_key)
            .call();

        match response {
            Ok(mut resp) => {
                let body = resp.body_mut().read_to_string().map_err(|e| {
                    DocqaError::Service(format!("Failed to read index description: {}", e))
                })?;
                let description: IndexDescription = serde_json::from_str(&body).map_err(|e| {
                    DocqaError::Service(format!("Malformed index description: {}", e))
                })?;
                Ok(Some(description))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(DocqaError::Service(format!(
                "Failed to describe index '{}': {}",
                self.index_name, e
            ))),
        }
    }

    /// Provision the index; the creation response carries its description,
    /// including the data-plane host.
    fn create_index(&self, dimension: u32) -> Result<IndexDescription> {
        let url = self
            .base_url
            .join("/indexes")
            .map_err(|e| DocqaError::Config(format!("Failed to build create URL: {}", e)))?;

        let request = CreateIndexRequest {
            name: &self.index_name,
            dimension,
            metric: "cosine",
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocqaError::Service(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| {
                DocqaError::Service(format!(
                    "Failed to create index '{}': {}",
                    self.index_name, e
                ))
            })?;

        serde_json::from_str(&response_text)
            .map_err(|e| DocqaError::Service(format!("Malformed index description: {}", e)))
    }

    /// Return a data-plane handle for the configured index, creating the
    /// index with the given dimension and cosine metric when it is absent.
    ///
    /// Idempotent: an existing index is never reconfigured. A dimension
    /// mismatch against an existing index is detected here, from the
    /// describe response, rather than deferred to the first upsert failure.
    pub fn ensure_index(&self, dimension: u32) -> Result<IndexHandle> {
        if let Some(description) = self.describe_index()? {
            if description.dimension != dimension {
                return Err(DocqaError::Config(format!(
                    "Index '{}' has dimension {} but the embedding model produces {}",
                    self.index_name, description.dimension, dimension
                )));
            }
            debug!(
                "Index '{}' exists (dimension {}, metric {})",
                self.index_name, description.dimension, description.metric
            );
            return IndexHandle::from_host(&description.host);
        }

        info!(
            "Index '{}' not found, creating with dimension {}",
            self.index_name, dimension
        );
        let description = self.create_index(dimension)?;
        IndexHandle::from_host(&description.host)
    }

    /// Write records by id, overwriting any existing record with the same
    /// id. Large inputs are partitioned into batches with one remote write
    /// per batch; a failed batch aborts the remaining ones and reports its
    /// zero-based index, while earlier batches stay committed.
    pub fn upsert(&self, handle: &IndexHandle, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No records to upsert");
            return Ok(());
        }

        let url = handle
            .host
            .join("/vectors/upsert")
            .map_err(|e| DocqaError::Config(format!("Failed to build upsert URL: {}", e)))?;

        let batch_count = records.len().div_ceil(self.upsert_batch_size);
        for (batch_index, batch) in records.chunks(self.upsert_batch_size).enumerate() {
            debug!(
                "Upserting batch {}/{} ({} records)",
                batch_index + 1,
                batch_count,
                batch.len()
            );

            let request = UpsertRequest { vectors: batch };
            let request_json = serde_json::to_string(&request)
                .map_err(|e| DocqaError::Service(format!("Failed to serialize request: {}", e)))?;

            self.agent
                .post(url.as_str())
                .header("Api-Key", &self.api_key)
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
                .map_err(|e| {
                    DocqaError::Service(format!("Upsert batch {} failed: {}", batch_index, e))
                })?;
        }

        info!(
            "Upserted {} records to index '{}' in {} batches",
            records.len(),
            self.index_name,
            batch_count
        );
        Ok(())
    }

    /// Nearest-neighbor query, returning up to `top_k` matches in the
    /// store's descending-similarity order.
    pub fn query(
        &self,
        handle: &IndexHandle,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        if top_k == 0 {
            return Err(DocqaError::Validation(
                "top_k must be greater than 0".to_string(),
            ));
        }

        let url = handle
            .host
            .join("/query")
            .map_err(|e| DocqaError::Config(format!("Failed to build query URL: {}", e)))?;

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocqaError::Service(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| DocqaError::Service(format!("Query failed: {}", e)))?;

        let response: QueryResponse = serde_json::from_str(&response_text)
            .map_err(|e| DocqaError::Service(format!("Malformed query response: {}", e)))?;

        debug!("Query returned {} matches", response.matches.len());

        Ok(response
            .matches
            .into_iter()
            .map(|raw| QueryMatch {
                id: raw.id,
                score: raw.score,
                metadata: raw.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

impl IndexHandle {
    /// The control plane reports hosts without a scheme; assume HTTPS unless
    /// one is present (mock servers hand out full http URLs).
    fn from_host(host: &str) -> Result<Self> {
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        let host = Url::parse(&url)
            .map_err(|e| DocqaError::Service(format!("Invalid index host '{}': {}", url, e)))?;

        Ok(Self { host })
    }
}
