use tertulia_model::Embedding;
use tokio::sync::RwLock;

use super::TextSegment;

/// A segment matched by a query.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredSegment {
    /// The matched segment.
    pub segment: TextSegment,
    /// Relevance score in `[0, 1]`, see [`relevance_score`].
    pub score: f64,
}

/// Cosine similarity of two vectors.
///
/// Vectors of different lengths, empty vectors and zero vectors have a
/// similarity of zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Maps a cosine similarity from `[-1, 1]` onto `[0, 1]`.
#[inline]
pub fn relevance_score(cosine: f64) -> f64 {
    (cosine + 1.0) / 2.0
}

/// An in-memory store of embedded segments.
///
/// Segments are kept in insertion order, which also breaks ties between
/// equally scored matches.
#[derive(Debug, Default)]
pub struct EmbeddingStore {
    entries: RwLock<Vec<(TextSegment, Embedding)>>,
}

impl EmbeddingStore {
    /// Adds segments with their vectors.
    pub async fn add_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (TextSegment, Embedding)>,
    {
        self.entries.write().await.extend(entries);
    }

    /// Returns the number of stored segments.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the store has no segments.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Returns at most `max_results` segments scoring at least `min_score`,
    /// best first.
    pub async fn search(
        &self,
        query: &[f32],
        max_results: usize,
        min_score: f64,
    ) -> Vec<ScoredSegment> {
        let entries = self.entries.read().await;
        let mut scored: Vec<(usize, f64)> = entries
            .iter()
            .enumerate()
            .map(|(idx, (_, vector))| {
                (idx, relevance_score(cosine_similarity(query, vector)))
            })
            .collect();
        // Stable, so ties keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(max_results)
            .filter(|(_, score)| *score >= min_score)
            .map(|(idx, score)| ScoredSegment {
                segment: entries[idx].0.clone(),
                score,
            })
            .collect()
    }
}
