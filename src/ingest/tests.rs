use super::*;
use crate::config::{OpenAiConfig, PineconeConfig};
use crate::vector_store::VectorStoreClient;
use httpmock::prelude::*;
use serde_json::json;
use std::collections::HashSet;

const TEST_DIMENSION: u32 = 64;

fn test_config(server: &MockServer) -> Config {
    Config {
        openai: OpenAiConfig {
            base_url: server.base_url(),
            embedding_dimension: TEST_DIMENSION,
            ..OpenAiConfig::default()
        },
        pinecone: PineconeConfig {
            base_url: server.base_url(),
            index_name: "test-index".to_string(),
            ..PineconeConfig::default()
        },
        ..Config::default()
    }
}

fn embedding(seed: f32) -> Vec<f32> {
    vec![seed; TEST_DIMENSION as usize]
}

fn mock_describe(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/indexes/test-index");
        then.status(200).json_body(json!({
            "name": "test-index",
            "dimension": TEST_DIMENSION,
            "metric": "cosine",
            "host": server.base_url()
        }));
    })
}

fn pipeline_parts(server: &MockServer) -> (Config, EmbeddingClient, VectorStoreClient) {
    let config = test_config(server);
    let embeddings = EmbeddingClient::with_api_key(&config.openai, "test-key".to_string())
        .expect("embedding client");
    let store = VectorStoreClient::with_api_key(&config.pinecone, "test-key".to_string())
        .expect("store client");
    (config, embeddings, store)
}

#[test]
fn metadata_carries_source_page_and_text() {
    let pages = vec![
        PageText {
            number: 1,
            text: "a".repeat(250),
        },
        PageText {
            number: 3,
            text: "b".repeat(90),
        },
    ];
    let chunking = ChunkingConfig {
        chunk_size: 100,
        chunk_overlap: 20,
    };

    let metadatas = collect_chunks(&pages, &chunking, "report.pdf").expect("chunking succeeds");

    // Page 1: windows at 0, 80, 160 -> 3 chunks. Page 3: one short chunk.
    assert_eq!(metadatas.len(), 4);
    assert!(metadatas[..3].iter().all(|m| m.page == 1));
    assert_eq!(metadatas[3].page, 3);
    assert!(metadatas.iter().all(|m| m.source == "report.pdf"));
    assert_eq!(metadatas[0].text.len(), 100);
    assert_eq!(metadatas[3].text.len(), 90);
}

#[test]
fn records_get_distinct_ids() {
    let metadatas: Vec<ChunkMetadata> = (0..10)
        .map(|i| ChunkMetadata {
            source: "a.pdf".to_string(),
            page: 1,
            text: format!("chunk {}", i),
        })
        .collect();
    let embeddings: Vec<Vec<f32>> = (0..10).map(|i| embedding(i as f32)).collect();

    let records = make_records(&metadatas, embeddings);

    let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(records[4].metadata.text, "chunk 4");
}

#[test]
fn ingest_pages_reports_chunk_count() {
    let server = MockServer::start();
    mock_describe(&server);
    let embed = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "data": [
                { "index": 0, "embedding": embedding(0.1) },
                { "index": 1, "embedding": embedding(0.2) },
                { "index": 2, "embedding": embedding(0.3) }
            ]
        }));
    });
    let upsert = server.mock(|when, then| {
        when.method(POST).path("/vectors/upsert");
        then.status(200).json_body(json!({ "upsertedCount": 3 }));
    });

    let (mut config, embeddings, store) = pipeline_parts(&server);
    config.chunking = ChunkingConfig {
        chunk_size: 100,
        chunk_overlap: 20,
    };
    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);

    let pages = vec![PageText {
        number: 1,
        text: "x".repeat(250),
    }];
    let count = pipeline
        .ingest_pages(&pages, "a.pdf")
        .expect("ingestion succeeds");

    assert_eq!(count, 3);
    embed.assert();
    upsert.assert();
}

#[test]
fn empty_document_reports_zero_without_remote_calls() {
    let server = MockServer::start();
    let describe = mock_describe(&server);
    let embed = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": [] }));
    });

    let (config, embeddings, store) = pipeline_parts(&server);
    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);

    let pages = vec![PageText {
        number: 1,
        text: String::new(),
    }];
    let count = pipeline
        .ingest_pages(&pages, "empty.pdf")
        .expect("empty ingestion is not an error");

    assert_eq!(count, 0);
    describe.assert_hits(0);
    embed.assert_hits(0);
}

#[test]
fn page_without_text_contributes_zero_chunks() {
    let server = MockServer::start();
    mock_describe(&server);
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "data": [ { "index": 0, "embedding": embedding(0.5) } ]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/vectors/upsert");
        then.status(200).json_body(json!({ "upsertedCount": 1 }));
    });

    let (config, embeddings, store) = pipeline_parts(&server);
    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);

    // Two pages, text on page 1 only: the count equals page 1's chunks.
    let pages = vec![
        PageText {
            number: 1,
            text: "short page".to_string(),
        },
        PageText {
            number: 2,
            text: String::new(),
        },
    ];
    let count = pipeline
        .ingest_pages(&pages, "partial.pdf")
        .expect("ingestion succeeds");

    assert_eq!(count, 1);
}

#[test]
fn reingestion_writes_records_again() {
    let server = MockServer::start();
    mock_describe(&server);
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "data": [ { "index": 0, "embedding": embedding(0.5) } ]
        }));
    });
    let upsert = server.mock(|when, then| {
        when.method(POST).path("/vectors/upsert");
        then.status(200).json_body(json!({ "upsertedCount": 1 }));
    });

    let (config, embeddings, store) = pipeline_parts(&server);
    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);

    let pages = vec![PageText {
        number: 1,
        text: "the same document".to_string(),
    }];

    // No dedup: each ingestion reports its own count and writes again.
    assert_eq!(pipeline.ingest_pages(&pages, "a.pdf").expect("first"), 1);
    assert_eq!(pipeline.ingest_pages(&pages, "a.pdf").expect("second"), 1);
    upsert.assert_hits(2);
}

#[test]
fn embedding_failure_carries_source_and_batch_context() {
    let server = MockServer::start();
    mock_describe(&server);
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(503);
    });
    let upsert = server.mock(|when, then| {
        when.method(POST).path("/vectors/upsert");
        then.status(200).json_body(json!({ "upsertedCount": 0 }));
    });

    let (config, embeddings, store) = pipeline_parts(&server);
    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);

    let pages = vec![PageText {
        number: 1,
        text: "some text".to_string(),
    }];
    let result = pipeline.ingest_pages(&pages, "flaky.pdf");

    match result {
        Err(DocqaError::Service(message)) => {
            assert!(message.contains("flaky.pdf"), "message: {message}");
            assert!(message.contains("batch 0"), "message: {message}");
        }
        other => panic!("expected service error, got {other:?}"),
    }
    // Nothing reaches the store when embedding fails.
    upsert.assert_hits(0);
}

#[test]
fn dimension_mismatch_is_a_configuration_error() {
    let server = MockServer::start();
    mock_describe(&server);
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({
            "data": [ { "index": 0, "embedding": [0.1, 0.2, 0.3] } ]
        }));
    });

    let (config, embeddings, store) = pipeline_parts(&server);
    let pipeline = IngestionPipeline::new(&config, &embeddings, &store);

    let pages = vec![PageText {
        number: 1,
        text: "some text".to_string(),
    }];
    let result = pipeline.ingest_pages(&pages, "a.pdf");

    assert!(matches!(result, Err(DocqaError::Config(_))));
}
