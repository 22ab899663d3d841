//! Deterministic local embeddings.
//!
//! Bag of hashed tokens: every token is hashed with 32-bit FNV-1a, reduced
//! modulo the dimensionality, and counted into that bucket. The result is L2
//! normalized. Identical text always yields a bit-identical vector, which is
//! what lets the offline vector builder and the server agree without a model.

use super::{Embedder, Embedding, TextType};
use crate::error::Result;
use async_trait::async_trait;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Network-free embedder. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    /// `dim` of zero is bumped to one so bucketing stays defined.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vec = vec![0f32; self.dim];
        for token in tokenize(text) {
            let bucket = fnv1a(&token) as usize % self.dim;
            vec[bucket] += 1.0;
        }
        l2_normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str, _text_type: TextType) -> Result<Embedding> {
        Ok(self.embed_text(text))
    }
}

/// 32-bit FNV-1a over UTF-16 code units, not bytes.
///
/// The unit choice is part of the vector asset format: CJK tokens land in
/// different buckets under a byte-wise hash.
pub fn fnv1a(token: &str) -> u32 {
    token.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Lowercase, keep `[a-z0-9]` and CJK Unified Ideographs, split on everything else.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_token_char(c) { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Scale to unit length in place. A zero vector stays zero.
pub fn l2_normalize(vec: &mut [f32]) {
    let mut norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        norm = 1.0;
    }
    for val in vec.iter_mut() {
        *val /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(vec: &[f32]) -> f32 {
        vec.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_fnv1a_known_values() {
        // Reference values for 32-bit FNV-1a.
        assert_eq!(fnv1a(""), 0x811c_9dc5);
        assert_eq!(fnv1a("a"), 0xe40c_292c);
        assert_eq!(fnv1a("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("  Open THE playlist.m3u8, now!  "),
            vec!["open", "the", "playlist", "m3u8", "now"]
        );
    }

    #[test]
    fn test_tokenize_keeps_cjk() {
        assert_eq!(tokenize("扫描 storage"), vec!["扫描", "storage"]);
        assert_eq!(tokenize("日本語ｶﾀｶﾅ"), vec!["日本語"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("  !!  ").is_empty());
    }

    #[test]
    fn test_embedding_is_unit_length() {
        let embedder = LocalEmbedder::new(64);
        for text in ["echo hello", "scan my storage for junk", "a b c d e f g", "清理 手机"] {
            let vec = embedder.embed_text(text);
            assert_eq!(vec.len(), 64);
            assert!((norm(&vec) - 1.0).abs() < 1e-5, "norm of {:?}", text);
        }
    }

    #[test]
    fn test_embedding_of_tokenless_text_is_zero() {
        let vec = LocalEmbedder::new(16).embed_text("?!...");
        assert_eq!(vec.len(), 16);
        assert!(vec.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = LocalEmbedder::new(64);
        let a = embedder.embed_text("open the playlist");
        let b = embedder.embed_text("open the playlist");
        let a_bits: Vec<u32> = a.iter().map(|x| x.to_bits()).collect();
        let b_bits: Vec<u32> = b.iter().map(|x| x.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn test_repeated_token_accumulates_in_one_bucket() {
        let vec = LocalEmbedder::new(8).embed_text("echo echo echo");
        let non_zero: Vec<f32> = vec.into_iter().filter(|&x| x != 0.0).collect();
        assert_eq!(non_zero, vec![1.0]);
    }

    #[test]
    fn test_zero_dim_is_clamped() {
        assert_eq!(LocalEmbedder::new(0).dim(), 1);
    }

    #[tokio::test]
    async fn test_embedder_trait_never_fails() {
        let embedder = LocalEmbedder::new(32);
        let vec = embedder.embed("hello", TextType::Query).await.unwrap();
        assert_eq!(vec.len(), 32);
    }
}
