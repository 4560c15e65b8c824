use std::time::Instant;
use tracing::{debug, info};

use buddy_core::error::{Error, Result};
use buddy_core::traits::Generator;
use buddy_core::types::RetrievedDocument;
use buddy_core::Personality;
use buddy_vector::Retriever;

/// Joins retrieved documents into the `{context}` block of a template.
pub fn format_context(docs: &[RetrievedDocument]) -> String {
    docs.iter().map(|d| d.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Retrieval, personality template and generation for a single question.
pub struct AnswerPipeline<G: Generator> {
    retriever: Retriever,
    generator: G,
    k: usize,
}

impl<G: Generator> AnswerPipeline<G> {
    pub fn new(retriever: Retriever, generator: G, k: usize) -> Self {
        Self { retriever, generator, k }
    }

    pub fn retriever(&self) -> &Retriever { &self.retriever }

    pub fn k(&self) -> usize { self.k }

    /// `personality` is a variant name or UI label; unknown labels fail before any I/O.
    pub async fn answer(&self, question: &str, personality: &str) -> Result<String> {
        let personality: Personality = personality.parse()?;
        self.answer_as(question, personality).await
    }

    pub async fn answer_as(&self, question: &str, personality: Personality) -> Result<String> {
        let started = Instant::now();
        let docs = self.retriever.retrieve(question, self.k).await?;
        debug!(hits = docs.len(), ids = ?docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), "context documents");

        let prompt = personality.render(&format_context(&docs), question);
        let reply = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| Error::upstream("generation", &e))?;
        info!(%personality, docs = docs.len(), reply_chars = reply.len(), "answered in {:.2?}", started.elapsed());
        Ok(reply)
    }
}
