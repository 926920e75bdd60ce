// Embeddings module
// Content chunking plus the remote embedding service client

pub mod chunking;
pub mod openai;

pub use chunking::chunk;
pub use openai::EmbeddingClient;
