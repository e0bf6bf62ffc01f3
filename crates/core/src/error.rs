use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("documents directory not found: {0}")]
    MissingDirectory(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("index build failed: {0}")]
    IndexBuild(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("search request failed: {0}")]
    Request(String),
}

/// Per-request failure as seen by a chat caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("empty user query")]
    EmptyQuery,

    #[error("no answer available")]
    NoAnswerAvailable,

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<SearchError> for ChatError {
    fn from(value: SearchError) -> Self {
        ChatError::Backend(value.to_string())
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
