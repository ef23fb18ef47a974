use crate::provider::ModelProviderError;

/// A fixed-dimension vector representing the meaning of a text.
pub type Embedding = Vec<f32>;

/// A type that turns texts into [`Embedding`]s.
///
/// Implementations must be deterministic for the retrieval layer to give
/// stable results: embedding the same text twice yields the same vector.
pub trait EmbeddingProvider: Send + Sync {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Returns the dimension of the produced vectors.
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts. The returned vectors are in the same order
    /// as `texts`.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Embedding>, Self::Error>> + Send + 'static;
}
