//! Deterministic feature-hashing embedder
//!
//! Needs no model download or network, so it backs offline builds and tests.
//! Each lowercase alphanumeric token is hashed into one of `dimensions`
//! buckets with a hash-derived sign; the result is L2 normalized.

use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Default number of buckets
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    pub fn new(dimensions: usize) -> anyhow::Result<Self> {
        if dimensions == 0 {
            anyhow::bail!("hash embedder needs at least one dimension");
        }
        Ok(Self { dimensions })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed_text(text)).collect()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = FxHasher::default();
            hasher.write(token.to_lowercase().as_bytes());
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedding::new(64).unwrap();
        let a = embedder.embed(&["The Eagle has landed"]);
        let b = embedder.embed(&["the eagle HAS landed!"]);
        assert_eq!(a, b);
        assert!((dot(&a[0], &a[0]) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let embedder = HashEmbedding::new(256).unwrap();
        let v = embedder.embed(&[
            "oxygen tank pressure dropped",
            "oxygen tank pressure warning",
            "lunar module descent burn",
        ]);
        assert!(dot(&v[0], &v[1]) > dot(&v[0], &v[2]));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedding::new(8).unwrap();
        let v = embedder.embed(&[""]);
        assert_eq!(v[0], vec![0.0; 8]);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(HashEmbedding::new(0).is_err());
    }
}
