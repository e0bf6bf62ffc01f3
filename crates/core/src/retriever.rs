use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::index::VectorIndex;
use crate::models::RetrievalResult;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 5;

/// Embeds a query with the index's embedder and returns the `top_k` nearest chunks.
pub struct Retriever<E> {
    index: Arc<VectorIndex>,
    embedder: E,
    top_k: usize,
}

impl<E> Retriever<E>
where
    E: Embedder,
{
    pub fn new(index: Arc<VectorIndex>, embedder: E, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn search(&self, query: &str) -> Result<RetrievalResult, SearchError> {
        let query_vector = self.embedder.embed(query).await?;
        let hits = self.index.knn(&query_vector, self.top_k)?;
        debug!(hits = hits.len(), top_k = self.top_k, "retrieved chunks");
        Ok(RetrievalResult { hits })
    }
}
