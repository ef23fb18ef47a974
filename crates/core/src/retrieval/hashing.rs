use std::convert::Infallible;
use std::future::ready;

use tertulia_model::{Embedding, EmbeddingProvider};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A local, deterministic embedding provider based on feature hashing.
///
/// Every lowercase word of the text is hashed with FNV-1a onto one of the
/// vector components, with a sign taken from the hash as well. The result
/// is L2-normalized. Texts sharing words end up close to each other, which
/// is enough for keyword-level retrieval without a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    /// Creates a provider producing `dimension` components. A dimension of
    /// zero is treated as one.
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase);
        for word in words {
            let hash = fnv1a(word.as_bytes());
            let idx = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    type Error = Infallible;

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Embedding>, Self::Error>> + Send + 'static
    {
        ready(Ok(texts.iter().map(|text| self.embed_one(text)).collect()))
    }
}
