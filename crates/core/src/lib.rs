pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod retriever;

pub use answer::{build_prompt, Answerer, ExtractiveAnswerer};
pub use chunking::{split_text, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ChatError, IngestError, SearchError};
pub use extractor::{
    detect_tables, extract_document, flatten_row, LopdfExtractor, PageTable, PageText,
    PdfExtractor,
};
pub use index::VectorIndex;
pub use ingest::{build_corpus, build_index, discover_pdf_files, embed_chunks, IndexBuild};
pub use models::{
    ChatReply, ChatRequest, Chunk, CorpusReport, DocumentExtraction, EmbeddedChunk, RagOptions,
    RetrievalResult, ScoredChunk, BACKEND_ERROR_PREFIX, EMPTY_QUERY_MESSAGE, NO_ANSWER_MESSAGE,
};
pub use orchestrator::{is_refusal, ChatOrchestrator, RequestStage, REFUSAL_MARKER};
pub use providers::{GeminiAnswerer, GeminiClient, GeminiConfig, GeminiEmbedder};
pub use retriever::{Retriever, DEFAULT_TOP_K};
