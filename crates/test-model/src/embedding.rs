use std::future::ready;

use tertulia_model::{Embedding, EmbeddingProvider, ErrorKind};

use crate::Error;

/// An embedding provider over a small fixed vocabulary.
///
/// Every vocabulary word is a basis vector, and a text embeds to the count
/// of each word it contains. Words outside the vocabulary are ignored, so a
/// text with no known word embeds to the zero vector.
#[derive(Clone, Debug)]
pub struct VocabularyEmbeddingProvider {
    vocabulary: Vec<String>,
}

impl VocabularyEmbeddingProvider {
    /// Creates a provider with the given vocabulary.
    pub fn new<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vocabulary: vocabulary
                .into_iter()
                .map(|word| word.into().to_lowercase())
                .collect(),
        }
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0; self.vocabulary.len()];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase);
        for word in words {
            if let Some(idx) = self.vocabulary.iter().position(|w| *w == word)
            {
                vector[idx] += 1.0;
            }
        }
        vector
    }
}

impl EmbeddingProvider for VocabularyEmbeddingProvider {
    type Error = Error;

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Embedding>, Self::Error>> + Send + 'static
    {
        let result = if self.vocabulary.is_empty() {
            Err(Error {
                message: "empty vocabulary",
                kind: ErrorKind::Other,
            })
        } else {
            Ok(texts.iter().map(|text| self.embed_one(text)).collect())
        };
        ready(result)
    }
}
