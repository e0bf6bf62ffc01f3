use crate::error::SearchError;
use crate::models::{Chunk, EmbeddedChunk, ScoredChunk};
use std::cmp::Ordering;

/// Flat in-memory cosine index, built once and read-only afterwards.
///
/// Vectors are stored pre-normalized so a lookup is one dot product per
/// chunk. Holding only owned, immutable data keeps the index `Send + Sync`,
/// so concurrent lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimensions: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Builds the index; an empty input produces an empty index.
    pub fn build(entries: Vec<EmbeddedChunk>) -> Result<Self, SearchError> {
        let dimensions = entries.first().map(|entry| entry.vector.len()).unwrap_or_default();
        let mut chunks = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.vector.len() != dimensions {
                return Err(SearchError::DimensionMismatch {
                    expected: dimensions,
                    actual: entry.vector.len(),
                });
            }
            vectors.push(normalized(&entry.vector));
            chunks.push(entry.chunk);
        }

        Ok(Self {
            dimensions,
            chunks,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns up to `k` chunks by descending cosine similarity.
    ///
    /// Equal scores keep chunk order.
    pub fn knn(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query_vector.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let query = normalized(query_vector);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, dot(&query, vector)))
            .collect();

        scored.sort_by(|left, right| match right.1.total_cmp(&left.1) {
            Ordering::Equal => left.0.cmp(&right.0),
            other => other,
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, score)| {
                let chunk = &self.chunks[position];
                ScoredChunk {
                    chunk_index: chunk.chunk_index,
                    chunk_id: chunk.chunk_id.clone(),
                    text: chunk.text.clone(),
                    score,
                }
            })
            .collect())
    }
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

fn normalized(vector: &[f32]) -> Vec<f32> {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 && magnitude.is_finite() {
        vector.iter().map(|value| value / magnitude).collect()
    } else {
        vec![0.0; vector.len()]
    }
}
