use crate::error::SearchError;
use crate::models::RetrievalResult;
use async_trait::async_trait;
use std::sync::Arc;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Turns a question and its retrieved passages into a natural-language answer.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, query: &str, context: &RetrievalResult) -> Result<String, SearchError>;
}

#[async_trait]
impl<A> Answerer for Arc<A>
where
    A: Answerer + ?Sized,
{
    async fn answer(&self, query: &str, context: &RetrievalResult) -> Result<String, SearchError> {
        (**self).answer(query, context).await
    }
}

/// Prompt sent to an LLM answerer: instructions, retrieved context, question.
pub fn build_prompt(query: &str, context: &RetrievalResult) -> String {
    format!(
        "{PROMPT_PREAMBLE}\n\n{}\n\nQuestion: {query}\nHelpful Answer:",
        context.context()
    )
}

/// Offline answerer that replies with the best matching passage.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveAnswerer;

#[async_trait]
impl Answerer for ExtractiveAnswerer {
    async fn answer(&self, _query: &str, context: &RetrievalResult) -> Result<String, SearchError> {
        Ok(context
            .best()
            .map(|hit| hit.text.trim().to_string())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoredChunk;

    fn retrieved(texts: &[&str]) -> RetrievalResult {
        RetrievalResult {
            hits: texts
                .iter()
                .enumerate()
                .map(|(index, text)| ScoredChunk {
                    chunk_index: index,
                    chunk_id: format!("chunk-{index}"),
                    text: text.to_string(),
                    score: 1.0 - index as f32 * 0.1,
                })
                .collect(),
        }
    }

    #[test]
    fn prompt_contains_context_then_question() {
        let prompt = build_prompt("Who grades artists?", &retrieved(&["Panel A", "Panel B"]));
        let context_at = prompt.find("Panel A\n\nPanel B").unwrap_or(usize::MAX);
        let question_at = prompt.find("Question: Who grades artists?").unwrap_or(0);
        assert!(context_at < question_at);
        assert!(prompt.ends_with("Helpful Answer:"));
    }

    #[tokio::test]
    async fn extractive_answer_is_the_best_passage() -> Result<(), SearchError> {
        let answer = ExtractiveAnswerer
            .answer("fees?", &retrieved(&["  Vocal fee is 2000.\n", "Other"]))
            .await?;
        assert_eq!(answer, "Vocal fee is 2000.");
        Ok(())
    }

    #[tokio::test]
    async fn extractive_answer_is_empty_without_context() -> Result<(), SearchError> {
        let answer = ExtractiveAnswerer.answer("fees?", &RetrievalResult::default()).await?;
        assert!(answer.is_empty());
        Ok(())
    }
}
