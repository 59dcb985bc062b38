//! Concurrent in-memory vector store.
//!
//! All entries live in a [`DashMap`] keyed by id, so reads and writes from
//! different tasks never contend on a single lock. Search is a full scan —
//! fine at the soft-cap scale this store is built for.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::types::{now_millis, Memory, MemoryType, SearchResult};
use super::vector::cosine_similarity;
use crate::error::{EngineError, Result};

pub struct MemoryStore {
    entries: DashMap<String, Memory>,
    dimensions: usize,
}

impl MemoryStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: DashMap::new(),
            dimensions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert new content. Mints a v7 id, stamps both timestamps with the
    /// current time, and clamps importance into [0, 1].
    pub fn insert(
        &self,
        content: String,
        embedding: Vec<f32>,
        memory_type: MemoryType,
        importance: f64,
    ) -> Result<Memory> {
        if embedding.len() != self.dimensions {
            return Err(EngineError::Input(format!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        let now = now_millis();
        let memory = Memory {
            id: Uuid::now_v7().to_string(),
            content,
            embedding,
            memory_type,
            importance: importance.clamp(0.0, 1.0),
            created_at: now,
            last_accessed: now,
            access_count: 0,
        };
        self.entries.insert(memory.id.clone(), memory.clone());
        Ok(memory)
    }

    /// Fetch by id, counting the access.
    pub fn get(&self, id: &str) -> Option<Memory> {
        let mut entry = self.entries.get_mut(id)?;
        entry.last_accessed = now_millis();
        entry.access_count += 1;
        Some(entry.value().clone())
    }

    pub fn remove(&self, id: &str) -> Option<Memory> {
        self.entries.remove(id).map(|(_, m)| m)
    }

    /// Top-k by cosine similarity against `query`, dropping hits below
    /// `min_similarity`. A `type_filter` restricts results to one memory
    /// type. Ties break by importance, then by recency of creation.
    /// Returned memories get their access metadata bumped.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        min_similarity: f32,
        type_filter: Option<MemoryType>,
    ) -> Vec<SearchResult> {
        let mut hits: Vec<SearchResult> = self
            .entries
            .iter()
            .filter_map(|entry| {
                if type_filter.is_some_and(|ty| entry.memory_type != ty) {
                    return None;
                }
                let similarity = cosine_similarity(query, &entry.embedding);
                (similarity >= min_similarity).then(|| SearchResult {
                    memory: entry.value().clone(),
                    similarity,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.memory
                        .importance
                        .partial_cmp(&a.memory.importance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
        });
        hits.truncate(k);

        let now = now_millis();
        for hit in &hits {
            if let Some(mut entry) = self.entries.get_mut(&hit.memory.id) {
                entry.last_accessed = now;
                entry.access_count += 1;
            }
        }
        hits
    }

    /// Multiply importance of memories untouched for `stale_after_days` by
    /// `factor`. Returns how many were decayed.
    pub fn decay_stale(&self, stale_after_days: i64, factor: f64) -> usize {
        let cutoff = now_millis() - stale_after_days * 86_400_000;
        let mut decayed = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.last_accessed < cutoff {
                entry.importance = (entry.importance * factor).clamp(0.0, 1.0);
                decayed += 1;
            }
        }
        decayed
    }

    /// Evict lowest-value memories until the store fits under `soft_cap`.
    ///
    /// Value is `importance * e^(-age_days * decay) * ln(1 + accesses)`, so
    /// old, unimportant, never-recalled entries go first. Anything at or
    /// above `importance_floor` is never evicted, even over the cap.
    /// Returns the evicted ids.
    pub fn evict_if_needed(
        &self,
        soft_cap: usize,
        importance_floor: f64,
        decay_per_day: f64,
    ) -> Vec<String> {
        let excess = self.entries.len().saturating_sub(soft_cap);
        if excess == 0 {
            return Vec::new();
        }

        let now = now_millis();
        let mut candidates: Vec<(String, f64, i64)> = self
            .entries
            .iter()
            .filter(|entry| entry.importance < importance_floor)
            .map(|entry| {
                let age_days = (now - entry.created_at).max(0) as f64 / 86_400_000.0;
                let score = entry.importance
                    * (-age_days * decay_per_day).exp()
                    * (1.0 + f64::from(entry.access_count)).ln();
                (entry.id.clone(), score, entry.created_at)
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.2.cmp(&b.2))
        });

        let evicted: Vec<String> = candidates
            .into_iter()
            .take(excess)
            .map(|(id, _, _)| id)
            .collect();
        for id in &evicted {
            self.entries.remove(id);
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted low-value memories");
        }
        evicted
    }

    /// Load previously persisted memories, keeping their ids and metadata.
    pub fn restore(&self, memories: Vec<Memory>) {
        for memory in memories {
            self.entries.insert(memory.id.clone(), memory);
        }
    }

    /// Clone out everything for a flush.
    pub fn snapshot(&self) -> Vec<Memory> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    pub fn count_by_type(&self) -> Vec<(MemoryType, usize)> {
        MemoryType::ALL
            .iter()
            .map(|&ty| {
                let count = self.entries.iter().filter(|e| e.memory_type == ty).count();
                (ty, count)
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}
