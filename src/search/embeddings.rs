//! Embedding encoders
//!
//! The neural model used in production lives outside this crate; anything
//! that turns text into a unit vector can implement [`Embedder`]. The
//! bundled [`HashEmbedder`] is deterministic and dependency-free so the
//! semantic path works without a model.

use tracing::warn;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::model::Reference;
use crate::search::vector::l2_normalize;

pub const DEFAULT_DIMS: usize = 384;

/// Text encoder contract. Output vectors are unit length, or all zeros when
/// the text carries no tokens.
pub trait Embedder: Send + Sync {
    /// Identifier stored next to every vector this encoder produced.
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Hash embedder using FNV-1a
///
/// Each lowercased alphanumeric token lands in one signed bucket; the
/// bucket counts are then L2-normalized.
pub struct HashEmbedder {
    dim: usize,
    name: String,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMS)
    }
}

impl HashEmbedder {
    /// Create embedder with specified dimension (at least 1).
    #[must_use]
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self {
            dim,
            name: format!("hash-fnv1a-{dim}"),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = usize::try_from(hash % self.dim as u64).unwrap_or(0);
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.encode(text))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(PRIME)
    })
}

/// Resolve the configured encoder. `None` means semantic search is
/// unavailable and callers fall back to empty results.
#[must_use]
pub fn embedder_from_config(config: &SearchConfig) -> Option<Box<dyn Embedder>> {
    if !config.use_embeddings {
        return None;
    }
    match config.embedding_backend.as_str() {
        "hash" => Some(Box::new(HashEmbedder::new(config.embedding_dims))),
        other => {
            warn!(backend = other, "unknown embedding backend; semantic search disabled");
            None
        }
    }
}

/// Text a reference is embedded from: title, abstract and a keyword line.
#[must_use]
pub fn build_search_text(reference: &Reference) -> String {
    let keywords = if reference.keywords.is_empty() {
        String::new()
    } else {
        format!("Keywords: {}", reference.keywords.join(", "))
    };
    [
        reference.title.trim(),
        reference.abstract_text.trim(),
        keywords.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::vector::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_hash_embedding_is_deterministic_unit_length() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("Cultural capital and schooling").unwrap();
        let b = embedder.embed("Cultural capital and schooling").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMS);
        assert!((norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hash_embedding_case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("Social CAPITAL!").unwrap();
        let b = embedder.embed("social, capital").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_similar_texts_score_higher() {
        let embedder = HashEmbedder::default();
        let seed = embedder.embed("habitus field capital").unwrap();
        let near = embedder.embed("habitus and field theory").unwrap();
        let far = embedder.embed("protein folding kinetics").unwrap();
        assert!(cosine_similarity(&seed, &near) > cosine_similarity(&seed, &far));
    }

    #[test]
    fn test_empty_text_gives_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let v = embedder.embed("  ... ").unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_model_name_carries_dimension() {
        assert_eq!(HashEmbedder::new(128).model_name(), "hash-fnv1a-128");
        assert_eq!(HashEmbedder::new(0).dimension(), 1);
    }

    #[test]
    fn test_embedder_from_config() {
        let mut config = SearchConfig::default();
        assert!(embedder_from_config(&config).is_some());
        config.embedding_backend = "onnx".to_string();
        assert!(embedder_from_config(&config).is_none());
        config.embedding_backend = "hash".to_string();
        config.use_embeddings = false;
        assert!(embedder_from_config(&config).is_none());
    }

    #[test]
    fn test_build_search_text() {
        let mut reference = Reference::new(1, "Title here");
        reference.abstract_text = "An abstract.".to_string();
        reference.keywords = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build_search_text(&reference),
            "Title here An abstract. Keywords: a, b"
        );
        assert_eq!(build_search_text(&Reference::new(2, "Only")), "Only");
    }
}
