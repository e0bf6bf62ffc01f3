use crate::answer::Answerer;
use crate::embeddings::Embedder;
use crate::error::ChatError;
use crate::models::{ChatReply, ChatRequest};
use crate::retriever::Retriever;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Substring that marks an answer as a refusal, compared in lowercase.
pub const REFUSAL_MARKER: &str = "sorry";

/// Request lifecycle; any stage may fall through to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Validated,
    Retrieved,
    Answered,
    Responded,
    Failed,
}

/// Answers one chat request at a time against a shared, prebuilt index.
///
/// Holds no mutable state, so one instance serves any number of concurrent
/// requests.
pub struct ChatOrchestrator<E, A>
where
    E: Embedder,
    A: Answerer,
{
    retriever: Retriever<E>,
    answerer: A,
}

impl<E, A> ChatOrchestrator<E, A>
where
    E: Embedder,
    A: Answerer,
{
    pub fn new(retriever: Retriever<E>, answerer: A) -> Self {
        Self {
            retriever,
            answerer,
        }
    }

    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    /// Runs a request to exactly one reply. Never fails.
    pub async fn respond(&self, request: &ChatRequest) -> ChatReply {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("chat", %request_id);

        async {
            let outcome = self.answer(&request.message).await;
            let stage = match &outcome {
                Ok(_) => RequestStage::Responded,
                Err(error) => {
                    warn!(%error, "chat request failed");
                    RequestStage::Failed
                }
            };
            info!(stage = ?stage, "chat request finished");
            ChatReply::from(outcome)
        }
        .instrument(span)
        .await
    }

    /// Validates, retrieves and answers; applies the no-answer policy.
    pub async fn answer(&self, message: &str) -> Result<String, ChatError> {
        debug!(stage = ?RequestStage::Received, chars = message.len());

        let query = message.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyQuery);
        }
        debug!(stage = ?RequestStage::Validated);

        let context = self.retriever.search(query).await?;
        debug!(stage = ?RequestStage::Retrieved, hits = context.len());

        let answer = self.answerer.answer(query, &context).await?;
        debug!(stage = ?RequestStage::Answered, chars = answer.len());

        let answer = answer.trim();
        if is_refusal(answer) {
            return Err(ChatError::NoAnswerAvailable);
        }

        Ok(answer.to_string())
    }
}

/// Empty answers and anything mentioning the refusal marker count as "no answer".
pub fn is_refusal(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer.to_lowercase().contains(REFUSAL_MARKER)
}
