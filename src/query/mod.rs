
use tracing::{debug, info};

use crate::config::Config;
use crate::embeddings::EmbeddingClient;
use crate::generation::CompletionClient;
use crate::vector_store::{QueryMatch, VectorStoreClient};
use crate::{DocqaError, Result};

/// Canned response when retrieval finds nothing relevant.
pub const NO_MATCH_ANSWER: &str = "I don't know.";

const PROMPT_TEMPLATE: &str = "\
You are a knowledgeable assistant who answers questions using ONLY the given context.
If the answer is not contained within the context, say 'I don't know based on the provided information.'

Context:
{context}

Question: {question}
Answer:";

/// An answer with one source label per context passage, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Read path: embed the question, retrieve the top-K most similar chunks,
/// and generate an answer grounded in their text.
pub struct QueryEngine<'a> {
    config: &'a Config,
    embeddings: &'a EmbeddingClient,
    store: &'a VectorStoreClient,
    completions: &'a CompletionClient,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        config: &'a Config,
        embeddings: &'a EmbeddingClient,
        store: &'a VectorStoreClient,
        completions: &'a CompletionClient,
    ) -> Self {
        Self {
            config,
            embeddings,
            store,
            completions,
        }
    }

    pub fn answer(&self, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(DocqaError::Validation(
                "question cannot be empty".to_string(),
            ));
        }

        let question_embedding = self
            .embeddings
            .embed(&[question.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                DocqaError::Service("Embedding service returned no vector".to_string())
            })?;

        let handle = self
            .store
            .ensure_index(self.config.openai.embedding_dimension)?;
        let matches = self.store.query(
            &handle,
            &question_embedding,
            self.config.retrieval.top_k,
            true,
        )?;

        if matches.is_empty() {
            // Nothing to ground an answer in; skip the generation call.
            info!("No matches for question, returning canned answer");
            return Ok(Answer {
                answer: NO_MATCH_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let (context, sources) = assemble_context(&matches);
        let prompt = build_prompt(&context, question);

        debug!(
            "Generating answer from {} passages ({} context chars)",
            matches.len(),
            context.len()
        );

        let answer = self.completions.complete(&prompt)?;

        Ok(Answer { answer, sources })
    }
}

/// Concatenate match texts in rank order, blank-line separated, and build
/// the parallel source labels. A match without stored text contributes an
/// empty passage rather than failing the query.
fn assemble_context(matches: &[QueryMatch]) -> (String, Vec<String>) {
    let mut passages = Vec::with_capacity(matches.len());
    let mut sources = Vec::with_capacity(matches.len());

    for m in matches {
        passages.push(m.metadata.text.as_str());
        sources.push(format!("{} - Page {}", m.metadata.source, m.metadata.page));
    }

    (passages.join("\n\n"), sources)
}

fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}
