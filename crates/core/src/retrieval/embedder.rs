use std::pin::Pin;
use std::sync::Arc;

use tertulia_model::{Embedding, EmbeddingProvider, ModelProviderError};
use tracing::Instrument;

use super::RetrievalError;

type EmbedResult = Result<Vec<Embedding>, RetrievalError>;
type BoxedEmbedFuture = Pin<Box<dyn Future<Output = EmbedResult> + Send>>;
type HandlerFn = Arc<dyn Fn(Vec<String>) -> BoxedEmbedFuture + Send + Sync>;

/// A type-erased embedding provider.
///
/// Checks that the provider answers with one vector of the advertised
/// dimension per input text.
#[derive(Clone)]
pub struct Embedder {
    handler_fn: HandlerFn,
    dimension: usize,
}

impl Embedder {
    /// Wraps `provider`.
    pub fn new<P: EmbeddingProvider + 'static>(provider: P) -> Self {
        let dimension = provider.dimension();
        let handler_fn: HandlerFn = Arc::new(move |texts| {
            let fut = provider.embed(&texts);
            Box::pin(
                async move {
                    let vectors = fut.await.map_err(|err| {
                        error!("embedding failed: {err}");
                        RetrievalError::Embedding {
                            kind: err.kind(),
                            message: err.to_string(),
                        }
                    })?;
                    check_shape(&texts, &vectors, dimension)?;
                    Ok(vectors)
                }
                .instrument(debug_span!("embed")),
            )
        });
        Self {
            handler_fn,
            dimension,
        }
    }

    /// Returns the dimension of the produced vectors.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embeds every text, in order.
    #[inline]
    pub async fn embed_all(&self, texts: Vec<String>) -> EmbedResult {
        (self.handler_fn)(texts).await
    }

    /// Embeds a single text.
    pub async fn embed(&self, text: &str) -> Result<Embedding, RetrievalError> {
        let mut vectors = self.embed_all(vec![text.to_owned()]).await?;
        vectors.pop().ok_or_else(|| {
            RetrievalError::UnexpectedShape("no vector returned".to_owned())
        })
    }
}

fn check_shape(
    texts: &[String],
    vectors: &[Embedding],
    dimension: usize,
) -> Result<(), RetrievalError> {
    if texts.len() != vectors.len() {
        return Err(RetrievalError::UnexpectedShape(format!(
            "{} texts but {} vectors",
            texts.len(),
            vectors.len()
        )));
    }
    if let Some(vector) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(RetrievalError::UnexpectedShape(format!(
            "expected dimension {dimension}, got {}",
            vector.len()
        )));
    }
    Ok(())
}
