pub mod gemini;

pub use gemini::{
    GeminiAnswerer, GeminiClient, GeminiConfig, GeminiEmbedder, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_EMBEDDING_DIMENSIONS, DEFAULT_LLM_MODEL,
    DEFAULT_TEMPERATURE,
};
