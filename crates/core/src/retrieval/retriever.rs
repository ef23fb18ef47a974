use std::sync::Arc;

use super::{
    DocumentSplitter, Embedder, EmbeddingStore, RetrievalError, ScoredSegment,
};

const DEFAULT_MAX_RESULTS: usize = 2;
const DEFAULT_MIN_SCORE: f64 = 0.6;

/// Ingests documents into an [`EmbeddingStore`] and answers queries with
/// the best matching segments.
#[derive(Clone)]
pub struct Retriever {
    embedder: Embedder,
    splitter: DocumentSplitter,
    store: Arc<EmbeddingStore>,
    max_results: usize,
    min_score: f64,
}

impl Retriever {
    /// Creates a retriever with an empty store.
    pub fn new(embedder: Embedder) -> Self {
        Self {
            embedder,
            splitter: DocumentSplitter::default(),
            store: Default::default(),
            max_results: DEFAULT_MAX_RESULTS,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Sets the splitter used by [`Retriever::ingest`].
    #[inline]
    pub fn with_splitter(mut self, splitter: DocumentSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Sets how many segments a query returns at most.
    #[inline]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Sets the lowest relevance score a returned segment may have.
    #[inline]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Returns the embedder.
    #[inline]
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Returns the backing store.
    #[inline]
    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Splits and embeds `text`, then stores the segments. Returns how many
    /// segments were added.
    pub async fn ingest(
        &self,
        source: &str,
        text: &str,
    ) -> Result<usize, RetrievalError> {
        let segments = self.splitter.split(source, text);
        if segments.is_empty() {
            warn!("document `{source}` is empty, nothing to ingest");
            return Ok(0);
        }
        let texts = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = self.embedder.embed_all(texts).await?;
        let count = segments.len();
        self.store.add_all(segments.into_iter().zip(vectors)).await;
        info!("ingested {count} segments from `{source}`");
        Ok(count)
    }

    /// Returns the configured number of best segments for `query`.
    #[inline]
    pub async fn retrieve(
        &self,
        query: &str,
    ) -> Result<Vec<ScoredSegment>, RetrievalError> {
        self.retrieve_with(query, self.max_results, self.min_score)
            .await
    }

    /// Returns at most `max_results` segments scoring at least `min_score`,
    /// best first.
    pub async fn retrieve_with(
        &self,
        query: &str,
        max_results: usize,
        min_score: f64,
    ) -> Result<Vec<ScoredSegment>, RetrievalError> {
        let vector = self.embedder.embed(query).await?;
        let found = self.store.search(&vector, max_results, min_score).await;
        debug!("retrieved {} segments for query `{query}`", found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use tertulia_test_model::VocabularyEmbeddingProvider;

    use super::*;

    fn vocabulary_retriever() -> Retriever {
        let embedder = Embedder::new(VocabularyEmbeddingProvider::new([
            "gato", "perro", "pez",
        ]));
        Retriever::new(embedder).with_splitter(DocumentSplitter::new(10))
    }

    #[tokio::test]
    async fn test_ingest_segment_count() {
        let retriever = vocabulary_retriever();
        let text = "gato gato perro pez pez pez gato";
        let count = retriever.ingest("animales", text).await.unwrap();
        assert_eq!(count, text.chars().count().div_ceil(10));
        assert_eq!(retriever.store().len().await, count);
        assert_eq!(retriever.ingest("vacío", "").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_order_threshold_and_limit() {
        let retriever = vocabulary_retriever();
        // Segments: "gato gato ", "perro pez ", "pez pez ga", "to".
        retriever
            .ingest("animales", "gato gato perro pez pez pez gato")
            .await
            .unwrap();

        let found = retriever.retrieve_with("pez", 10, 0.0).await.unwrap();
        let texts: Vec<_> =
            found.iter().map(|s| s.segment.text.as_str()).collect();
        assert_eq!(texts[0], "pez pez ga");
        assert_eq!(texts[1], "perro pez ");
        assert!(found.windows(2).all(|w| w[0].score >= w[1].score));

        let found = retriever.retrieve_with("pez", 1, 0.0).await.unwrap();
        assert_eq!(found.len(), 1);

        // Segments without "pez" score 0.5 and fall under the threshold.
        let found = retriever.retrieve_with("pez", 10, 0.6).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.score >= 0.6));
    }

    #[tokio::test]
    async fn test_embedder_shape_checked() {
        let embedder = Embedder::new(VocabularyEmbeddingProvider::new(Vec::<String>::new()));
        let err = embedder.embed("gato").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding { .. }));
    }
}
