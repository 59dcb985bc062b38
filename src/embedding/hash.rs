//! Deterministic hash-based embeddings.
//!
//! Three feature families are hashed into a fixed-size vector: character
//! trigrams, whole words (two buckets each, so a shared word contributes
//! twice), and word bigrams. The result is L2-normalized. Not semantic, but
//! stable across runs and good enough for word-overlap similarity.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::memory::vector::normalize;

/// Embed `text` into exactly `dimensions` components. Empty or whitespace-only
/// input yields the zero vector.
pub fn hash_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimensions];
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.is_empty() {
        return embedding;
    }

    // Character trigrams; windows of pure whitespace carry no signal
    let chars: Vec<char> = lower.chars().collect();
    for window in chars.windows(3) {
        if window.iter().all(|c| c.is_whitespace()) {
            continue;
        }
        embedding[bucket(&window, dimensions)] += 1.0;
    }

    // Whole words, weighted highest; a second bucket spreads collisions
    for word in &words {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        let hash = hasher.finish();
        embedding[(hash % dimensions as u64) as usize] += 2.0;
        embedding[((hash >> 16) % dimensions as u64) as usize] += 1.0;
    }

    // Word bigrams capture a little ordering
    for pair in words.windows(2) {
        embedding[bucket(&(pair[0], pair[1]), dimensions)] += 1.5;
    }

    normalize(&mut embedding);
    embedding
}

fn bucket<T: Hash>(value: &T, dimensions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    (hasher.finish() % dimensions as u64) as usize
}
