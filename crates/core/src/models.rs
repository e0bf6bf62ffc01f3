use crate::error::ChatError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::path::PathBuf;

pub const EMPTY_QUERY_MESSAGE: &str = "❌ Empty user query.";
pub const NO_ANSWER_MESSAGE: &str = "⚠️ Sorry, I do not have the answer to this question, yet.";
pub const BACKEND_ERROR_PREFIX: &str = "❌ Backend error: ";

/// Text pulled out of a single PDF, plus whatever went wrong on the way.
///
/// A failed stage leaves its part of `text` empty; the document still takes
/// part in the corpus with whatever the other stage produced.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct DocumentExtraction {
    pub path: PathBuf,
    #[serde(skip_serializing)]
    pub text: String,
    pub chars: usize,
    pub pages: usize,
    pub table_rows: usize,
    pub text_failure: Option<String>,
    pub table_failure: Option<String>,
}

impl DocumentExtraction {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn failed_entirely(&self) -> bool {
        self.text_failure.is_some() && self.table_failure.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusReport {
    pub corpus: String,
    pub documents: Vec<DocumentExtraction>,
    pub built_at: DateTime<Utc>,
}

impl CorpusReport {
    pub fn failures(&self) -> impl Iterator<Item = &DocumentExtraction> {
        self.documents
            .iter()
            .filter(|document| document.text_failure.is_some() || document.table_failure.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub char_start: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk_index: usize,
    pub chunk_id: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn best(&self) -> Option<&ScoredChunk> {
        self.hits.first()
    }

    /// Retrieved passages joined the way they are handed to an answerer.
    pub fn context(&self) -> String {
        self.hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply_type", rename_all = "lowercase")]
pub enum ChatReply {
    Gemini { reply: String },
    Error { message: String },
}

impl ChatReply {
    pub fn is_error(&self) -> bool {
        matches!(self, ChatReply::Error { .. })
    }
}

impl From<Result<String, ChatError>> for ChatReply {
    fn from(value: Result<String, ChatError>) -> Self {
        match value {
            Ok(reply) => ChatReply::Gemini { reply },
            Err(ChatError::EmptyQuery) => ChatReply::Error {
                message: EMPTY_QUERY_MESSAGE.to_string(),
            },
            Err(ChatError::NoAnswerAvailable) => ChatReply::Error {
                message: NO_ANSWER_MESSAGE.to_string(),
            },
            Err(ChatError::Backend(details)) => ChatReply::Error {
                message: format!("{BACKEND_ERROR_PREFIX}{details}"),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RagOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 150,
            top_k: 5,
        }
    }
}
