//! In-memory chunk index, the file-search twin of the memory store.

use std::collections::HashMap;

use dashmap::DashMap;
use serde::Serialize;

use crate::memory::vector::cosine_similarity;

/// One embedded chunk of one file.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub path: String,
    pub chunk_index: u32,
    pub text: String,
    pub embedding: Vec<f32>,
    pub file_type: String,
    pub mtime: i64,
}

/// A file-search hit returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct FileHit {
    pub path: String,
    pub name: String,
    pub file_type: String,
    pub chunk: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub chunks: usize,
}

/// Concurrent map keyed by (path, chunk_index). A path's chunk set is only
/// ever replaced wholesale, so no stale chunk from an older version of a file
/// survives a re-index.
pub struct ChunkIndex {
    chunks: DashMap<(String, u32), ChunkRecord>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self {
            chunks: DashMap::new(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            files: self.file_count(),
            chunks: self.chunk_count(),
        }
    }

    /// Swap in a fresh chunk set for `path`, dropping whatever was there.
    pub fn replace_path(&self, path: &str, records: Vec<ChunkRecord>) {
        self.remove_path(path);
        for record in records {
            self.chunks
                .insert((record.path.clone(), record.chunk_index), record);
        }
    }

    /// Drop every chunk belonging to `path`. Returns how many were removed.
    pub fn remove_path(&self, path: &str) -> usize {
        let keys: Vec<(String, u32)> = self
            .chunks
            .iter()
            .filter(|e| e.key().0 == path)
            .map(|e| e.key().clone())
            .collect();
        for key in &keys {
            self.chunks.remove(key);
        }
        keys.len()
    }

    /// Cosine-rank all chunks against `query`, best first.
    pub fn search(&self, query: &[f32], k: usize, min_similarity: f32) -> Vec<FileHit> {
        let mut hits: Vec<FileHit> = self
            .chunks
            .iter()
            .filter_map(|entry| {
                let record = entry.value();
                let similarity = cosine_similarity(query, &record.embedding);
                (similarity >= min_similarity).then(|| FileHit {
                    path: record.path.clone(),
                    name: file_name(&record.path),
                    file_type: record.file_type.clone(),
                    chunk: record.text.clone(),
                    similarity,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    /// Per-path chunk counts, used by stats and flush.
    pub fn files(&self) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for entry in self.chunks.iter() {
            *map.entry(entry.key().0.clone()).or_insert(0) += 1;
        }
        map
    }

    /// Clone out every record for persistence.
    pub fn snapshot(&self) -> Vec<ChunkRecord> {
        self.chunks.iter().map(|e| e.value().clone()).collect()
    }

    /// Snapshot of one path's records, ordered by chunk index.
    pub fn records_for(&self, path: &str) -> Vec<ChunkRecord> {
        let mut records: Vec<ChunkRecord> = self
            .chunks
            .iter()
            .filter(|e| e.key().0 == path)
            .map(|e| e.value().clone())
            .collect();
        records.sort_by_key(|r| r.chunk_index);
        records
    }

    pub fn restore(&self, records: Vec<ChunkRecord>) {
        for record in records {
            self.chunks
                .insert((record.path.clone(), record.chunk_index), record);
        }
    }
}

impl Default for ChunkIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn file_name(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
