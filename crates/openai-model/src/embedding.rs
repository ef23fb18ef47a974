use std::sync::Arc;

use reqwest::Client;
use tertulia_model::{Embedding, EmbeddingProvider, ErrorKind};

use crate::proto::{self, EmbeddingResponse};
use crate::{Error, OpenAIConfig, check_status};

/// Embedding provider backed by the `/embeddings` endpoint.
#[derive(Clone, Debug)]
pub struct OpenAIEmbeddingProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
    dimension: usize,
}

impl OpenAIEmbeddingProvider {
    /// Creates a provider producing vectors of `dimension` components.
    ///
    /// The dimension is forwarded to the API, so it must be supported by the
    /// configured model.
    #[inline]
    pub fn new(config: OpenAIConfig, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
            dimension,
        }
    }
}

impl EmbeddingProvider for OpenAIEmbeddingProvider {
    type Error = Error;

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Embedding>, Self::Error>> + Send + 'static
    {
        let expected = texts.len();
        let dimension = self.dimension;
        let resp_fut = self
            .client
            .post(self.config.endpoint("/embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&proto::create_embedding_request(
                &self.config.model,
                texts,
                Some(dimension),
            ))
            .send();

        async move {
            if expected == 0 {
                return Ok(vec![]);
            }
            let resp = resp_fut.await.map_err(Error::from_reqwest)?;
            let resp = check_status(resp).await?;
            let mut body: EmbeddingResponse =
                resp.json().await.map_err(Error::from_reqwest)?;

            // The API doesn't promise to keep the input order.
            body.data.sort_by_key(|data| data.index);
            if body.data.len() != expected {
                return Err(Error::new(
                    format!(
                        "expected {expected} embeddings, got {}",
                        body.data.len()
                    ),
                    ErrorKind::MalformedResponse,
                ));
            }
            if let Some(bad) =
                body.data.iter().find(|data| data.embedding.len() != dimension)
            {
                return Err(Error::new(
                    format!(
                        "expected dimension {dimension}, got {}",
                        bad.embedding.len()
                    ),
                    ErrorKind::MalformedResponse,
                ));
            }
            Ok(body.data.into_iter().map(|data| data.embedding).collect())
        }
    }
}
