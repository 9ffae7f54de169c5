//! Deterministic bag-of-words embeddings via signed feature hashing.
//!
//! No model files, no network. Texts sharing tokens land close together,
//! which is enough for offline use and for exercising the embedding index.

use anyhow::Result;

use super::{normalize, EmbeddingModel};
use crate::text::content_tokens;

pub struct HashingEmbeddings {
    dimension: usize,
    seed: u64,
}

impl HashingEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self::with_seed(dimension, 0x5eed)
    }

    pub fn with_seed(dimension: usize, seed: u64) -> Self {
        Self {
            dimension: dimension.max(1),
            seed,
        }
    }

    fn token_hash(&self, token: &str) -> u64 {
        stable_hash(&[&self.seed.to_le_bytes()[..], token.as_bytes()])
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in content_tokens(text) {
            let h = self.token_hash(&token);
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        normalize(&mut v);
        v
    }
}

/// First eight bytes of the blake3 digest, little-endian. Unlike the std
/// hasher this does not change between toolchains.
fn stable_hash(parts: &[&[u8]]) -> u64 {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

impl Default for HashingEmbeddings {
    fn default() -> Self {
        Self::new(512)
    }
}

impl EmbeddingModel for HashingEmbeddings {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine;

    #[test]
    fn test_deterministic() {
        let e = HashingEmbeddings::default();
        assert_eq!(e.embed_query("GDP growth").unwrap(), e.embed_query("gdp growth").unwrap());
        assert_eq!(e.embed_query("x").unwrap().len(), 512);
    }

    #[test]
    fn test_shared_tokens_are_closer() {
        let e = HashingEmbeddings::default();
        let q = e.embed_query("population total").unwrap();
        let near = e.embed_document("Population, total").unwrap();
        let far = e.embed_document("Inflation, consumer prices").unwrap();
        assert!(cosine(&q, &near) > cosine(&q, &far));
        assert!((cosine(&q, &near) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashingEmbeddings::new(8);
        assert!(e.embed_query("the of").unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_token_hash_is_pinned_to_blake3() {
        // blake3("") = af1349b9f5f9a1a6...
        assert_eq!(stable_hash(&[]), 0xa6a1_f9f5_b949_13af);
        assert_eq!(stable_hash(&[&b"gdp"[..], &b"growth"[..]]), stable_hash(&[&b"gdpgrowth"[..]]));

        let a = HashingEmbeddings::with_seed(64, 7);
        let b = HashingEmbeddings::with_seed(64, 7);
        assert_eq!(a.token_hash("inflation"), b.token_hash("inflation"));
        assert_ne!(a.token_hash("inflation"), HashingEmbeddings::with_seed(64, 8).token_hash("inflation"));
    }
}
