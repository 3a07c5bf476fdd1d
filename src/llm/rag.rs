use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::prompt::PromptTemplate;
use crate::database::Retriever;
use crate::document::ScoredChunk;
use crate::error::Result;
use crate::providers::traits::CompletionProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
}

/// Retrieve-then-generate over a document index. Holds no per-query state.
pub struct RagChain {
    retriever: Retriever,
    llm: Arc<dyn CompletionProvider>,
    prompt: PromptTemplate,
}

impl RagChain {
    pub fn new(retriever: Retriever, llm: Arc<dyn CompletionProvider>, prompt: PromptTemplate) -> Self {
        Self {
            retriever,
            llm,
            prompt,
        }
    }

    /// Joins retrieved chunk texts, best match first, with blank lines.
    pub fn format_context(results: &[ScoredChunk]) -> String {
        results
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub async fn build_prompt(&self, question: &str) -> Result<String> {
        let results = self.retriever.retrieve(question).await?;
        debug!("Retrieved {} chunk(s) (k = {})", results.len(), self.retriever.k());
        let context = Self::format_context(&results);
        Ok(self.prompt.format(&context, question))
    }

    pub async fn invoke(&self, question: &str) -> Result<Answer> {
        let prompt = self.build_prompt(question).await?;
        let text = self.llm.complete(&prompt).await?;
        Ok(Answer { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DocumentIndex;
    use crate::error::RagError;
    use crate::testing::{FakeEmbedder, FakeLlm, FakeStore};

    fn chain(
        embedder: Arc<FakeEmbedder>,
        store: Arc<FakeStore>,
        llm: Arc<FakeLlm>,
        k: usize,
    ) -> RagChain {
        let retriever = DocumentIndex::new(embedder, store).as_retriever(k);
        RagChain::new(retriever, llm, PromptTemplate::default())
    }

    #[tokio::test]
    async fn test_context_is_joined_in_score_order() {
        let store = Arc::new(FakeStore::with_results(&[
            ("Battery lasts eight hours.", 0.92),
            ("Charge with the USB-C port.", 0.81),
            ("The lid hinge is metal.", 0.10),
        ]));
        let llm = Arc::new(FakeLlm::default());
        let chain = chain(Arc::new(FakeEmbedder::default()), store, llm.clone(), 2);

        let answer = chain.invoke("How long does the battery last?").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "Context:\nBattery lasts eight hours.\n\nCharge with the USB-C port.\n\nQuestion: How long does the battery last?"
        ));
        assert!(!prompts[0].contains("hinge"));
        assert_eq!(answer.text, format!("echo: {}", prompts[0].len()));
    }

    #[tokio::test]
    async fn test_empty_index_still_calls_model() {
        let llm = Arc::new(FakeLlm::default());
        let chain = chain(
            Arc::new(FakeEmbedder::default()),
            Arc::new(FakeStore::default()),
            llm.clone(),
            4,
        );

        chain.invoke("Anything there?").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Context:\n\n\nQuestion: Anything there?"));
    }

    #[tokio::test]
    async fn test_empty_question_is_embedded() {
        let embedder = Arc::new(FakeEmbedder::default());
        let store = Arc::new(FakeStore::with_results(&[("only chunk", 0.3)]));
        let llm = Arc::new(FakeLlm::default());
        let chain = chain(embedder.clone(), store.clone(), llm, 4);

        chain.invoke("").await.unwrap();

        assert_eq!(embedder.calls(), 1);
        assert_eq!(embedder.seen.lock().unwrap()[0], vec![String::new()]);
        assert_eq!(store.searches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_generation() {
        let llm = Arc::new(FakeLlm::default());
        let chain = chain(
            Arc::new(FakeEmbedder::failing(401)),
            Arc::new(FakeStore::default()),
            llm.clone(),
            4,
        );

        let err = chain.invoke("question").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingService { status: 401, .. }));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let llm = Arc::new(FakeLlm {
            fail: true,
            ..Default::default()
        });
        let chain = chain(
            Arc::new(FakeEmbedder::default()),
            Arc::new(FakeStore::default()),
            llm,
            4,
        );

        assert!(matches!(
            chain.invoke("question").await,
            Err(RagError::Generation(_))
        ));
    }
}
