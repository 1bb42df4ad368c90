//! Similarity computation and top-k ranking for embeddings.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical vectors
/// - 0.0 means orthogonal vectors
/// - -1.0 means opposite vectors
///
/// Similarity is undefined when either vector has zero norm; this returns
/// `f32::NEG_INFINITY` for that case so zero vectors sort after every real
/// score instead of injecting NaN into a sort.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(f32::NEG_INFINITY);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// A similarity search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// ID of the matched item.
    pub id: String,

    /// Similarity score.
    pub score: f32,
}

impl SimilarityResult {
    /// Create a new similarity result.
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Rank candidates by cosine similarity to `query` and return the top `k`,
/// best first.
///
/// Candidates with equal scores keep their input order (stable sort), so
/// output is deterministic across runs. If `k` exceeds the candidate count
/// the whole collection is returned sorted; an empty collection yields an
/// empty result.
///
/// This is a brute-force linear scan, O(n) per query with no pre-built
/// index. At inbox scale (hundreds to low thousands of documents) the scan
/// costs less than maintaining an approximate structure would.
pub fn rank_top_k(
    query: &Embedding,
    candidates: &[(String, Embedding)],
    k: usize,
) -> Result<Vec<SimilarityResult>> {
    let mut scored: Vec<(OrderedFloat<f32>, &str)> = Vec::with_capacity(candidates.len());

    for (id, embedding) in candidates {
        let score = cosine_similarity(query, embedding)?;
        scored.push((OrderedFloat(score), id.as_str()));
    }

    // Stable sort, descending: ties keep candidate order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(score, id)| SimilarityResult::new(id, score.0))
        .collect())
}
