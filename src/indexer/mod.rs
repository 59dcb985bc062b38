//! File indexing pipeline: walk → parse → chunk → embed → index.
//!
//! A scan is a cancellable background pass over the configured folders.
//! Overlapping scan requests queue on one async mutex, so two scans never
//! race each other over the same roots. Unchanged files (same content hash
//! and mtime as last time) are skipped without re-embedding.

pub mod chunker;
pub mod index;
pub mod parser;
pub mod watcher;

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IndexerConfig;
use crate::db::snapshot;
use crate::embedding::EmbeddingService;
use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use index::{ChunkIndex, ChunkRecord, FileHit, IndexStats};

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "target",
    ".git",
    ".svn",
    ".hg",
    "__pycache__",
    ".venv",
    "venv",
    ".cache",
    "build",
    "dist",
    ".Trash",
    "Library",
];

const FILE_MIN_SIMILARITY: f32 = 0.1;
const LAST_SCAN_KEY: &str = "last_scan_report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Extension not on the allow-list, or the file produced no text.
    Skipped,
    /// Content hash and mtime match the last index; nothing re-embedded.
    Unchanged,
    /// Freshly (re-)indexed with this many chunks.
    Indexed(usize),
}

#[derive(Debug, Clone, Copy, Default, Serialize, serde::Deserialize)]
pub struct ScanReport {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
    pub chunks_indexed: usize,
    pub cancelled: bool,
}

pub struct FileIndexer {
    index: Arc<ChunkIndex>,
    embeddings: Arc<EmbeddingService>,
    db: Arc<Mutex<Connection>>,
    events: EventBus,
    /// path -> (content hash, mtime) from the last successful index.
    known_files: DashMap<String, (String, i64)>,
    /// Serializes full scans; watcher-triggered single-file updates don't
    /// take it.
    scan_lock: tokio::sync::Mutex<()>,
    config: IndexerConfig,
}

impl FileIndexer {
    pub fn new(
        config: IndexerConfig,
        embeddings: Arc<EmbeddingService>,
        db: Arc<Mutex<Connection>>,
        events: EventBus,
    ) -> Self {
        Self {
            index: Arc::new(ChunkIndex::new()),
            embeddings,
            db,
            events,
            known_files: DashMap::new(),
            scan_lock: tokio::sync::Mutex::new(()),
            config,
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Restore the in-memory index from a prior flush.
    pub fn restore(&self, records: Vec<ChunkRecord>, files: Vec<snapshot::FileMeta>) {
        self.index.restore(records);
        for meta in files {
            self.known_files.insert(meta.path, (meta.hash, meta.mtime));
        }
    }

    /// Walk every configured folder and index eligible files. Queues behind
    /// any scan already in flight; checks `cancel` between files.
    pub async fn scan_all(&self, cancel: &CancellationToken) -> ScanReport {
        let _guard = self.scan_lock.lock().await;
        let mut report = ScanReport::default();

        for folder in self.config.folders.clone() {
            let root = crate::config::expand_tilde(&folder.path);
            if !root.exists() {
                warn!(path = %root.display(), "indexed folder does not exist, skipping");
                continue;
            }
            let depth = if folder.recursive {
                self.config.max_depth
            } else {
                1
            };

            let entries = WalkDir::new(&root)
                .max_depth(depth)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));
            for entry in entries {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    info!("scan cancelled");
                    return report;
                }
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        debug!(error = %err, "walk error");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if is_excluded(path, &folder.exclude) {
                    continue;
                }
                if !parser::is_supported(&parser::extension_of(path)) {
                    continue;
                }

                report.files_seen += 1;
                match self.index_file(path).await {
                    Ok(IndexOutcome::Indexed(chunks)) => {
                        report.files_indexed += 1;
                        report.chunks_indexed += chunks;
                    }
                    Ok(IndexOutcome::Unchanged) => report.files_unchanged += 1,
                    Ok(IndexOutcome::Skipped) => {}
                    Err(err) => {
                        report.files_failed += 1;
                        warn!(path = %path.display(), error = %err, "failed to index file");
                    }
                }
            }
        }

        info!(
            indexed = report.files_indexed,
            unchanged = report.files_unchanged,
            failed = report.files_failed,
            chunks = report.chunks_indexed,
            "scan complete"
        );
        if let Ok(json) = serde_json::to_string(&report) {
            let conn = self.db.lock();
            if let Err(err) = snapshot::set_config(&conn, LAST_SCAN_KEY, &json) {
                warn!(error = %err, "failed to record scan report");
            }
        }
        report
    }

    /// The report of the most recent completed scan, if any.
    pub fn last_scan_report(&self) -> Option<ScanReport> {
        let conn = self.db.lock();
        let json = snapshot::get_config(&conn, LAST_SCAN_KEY).ok().flatten()?;
        serde_json::from_str(&json).ok()
    }

    /// Parse, chunk, and embed one file, then atomically replace its entries
    /// in the index and the durable store.
    pub async fn index_file(&self, path: &Path) -> Result<IndexOutcome> {
        if !parser::is_supported(&parser::extension_of(path)) {
            return Ok(IndexOutcome::Skipped);
        }

        let path_str = path.to_string_lossy().into_owned();
        let mtime = file_mtime(path);
        let hash = content_hash(path)?;
        if let Some(known) = self.known_files.get(&path_str) {
            if known.0 == hash && known.1 == mtime {
                return Ok(IndexOutcome::Unchanged);
            }
        }

        let text = parser::parse_file(path)?;
        let chunks = chunker::chunk_text(&text, self.config.chunk_size, self.config.chunk_overlap);
        if chunks.is_empty() {
            return Ok(IndexOutcome::Skipped);
        }

        let file_type = parser::extension_of(path);
        let mut records = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.into_iter().enumerate() {
            let embedding = self.embeddings.embed(&chunk).await;
            records.push(ChunkRecord {
                path: path_str.clone(),
                chunk_index: i as u32,
                text: chunk,
                embedding,
                file_type: file_type.clone(),
                mtime,
            });
        }

        let count = records.len();
        self.index.replace_path(&path_str, records.clone());
        {
            let mut conn = self.db.lock();
            snapshot::replace_chunks(&mut conn, &path_str, &records, &hash, mtime)?;
        }
        self.known_files.insert(path_str.clone(), (hash, mtime));

        self.events.publish(EngineEvent::FileIndexed {
            path: path_str,
            chunks: count,
        });
        debug!(path = %path.display(), chunks = count, "indexed file");
        Ok(IndexOutcome::Indexed(count))
    }

    /// Whether a watch-reported path would also be picked up by a scan:
    /// supported extension, inside a configured folder, not matching the
    /// folder's exclude patterns, and no skipped directory on the way down
    /// from the root.
    pub fn should_index(&self, path: &Path) -> bool {
        if !parser::is_supported(&parser::extension_of(path)) {
            return false;
        }
        for folder in &self.config.folders {
            let root = crate::config::expand_tilde(&folder.path);
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            if is_excluded(path, &folder.exclude) {
                return false;
            }
            // every directory between the root and the file obeys the
            // scan's skip rules; the file name itself may be dot-prefixed
            let mut components: Vec<_> = relative.components().collect();
            components.pop();
            let skipped = components.iter().any(|c| match c {
                std::path::Component::Normal(name) => {
                    let name = name.to_string_lossy();
                    SKIP_DIRS.contains(&name.as_ref()) || name.starts_with('.')
                }
                _ => false,
            });
            return !skipped;
        }
        false
    }

    /// Drop a deleted file from the index and the durable store.
    pub fn remove_file(&self, path: &Path) -> Result<usize> {
        let path_str = path.to_string_lossy().into_owned();
        let removed = self.index.remove_path(&path_str);
        self.known_files.remove(&path_str);
        let mut conn = self.db.lock();
        snapshot::delete_path(&mut conn, &path_str)?;
        Ok(removed)
    }

    /// Embed the query and rank indexed chunks by similarity.
    pub async fn search(&self, query: &str, k: usize) -> Vec<FileHit> {
        let vector = self.embeddings.embed(query).await;
        self.index.search(&vector, k, FILE_MIN_SIMILARITY)
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    SKIP_DIRS.contains(&name.as_ref()) || name.starts_with('.')
}

fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    patterns.iter().any(|p| path_str.contains(p.as_str()))
}

fn file_mtime(path: &Path) -> i64 {
    path.metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn content_hash(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| crate::error::EngineError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
