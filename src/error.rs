//! Error taxonomy for engine, store, and indexer operations.
//!
//! Provider failures deliberately never surface from `think` — the engine
//! degrades to memory-only responses and reports `ai_enhanced = false`
//! instead. [`EngineError::Provider`] exists for callers that talk to a
//! provider directly.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or empty input, rejected before any embedding work.
    #[error("invalid input: {0}")]
    Input(String),

    /// AI provider call failed or timed out.
    #[error("ai provider error: {0}")]
    Provider(String),

    /// A flush or load against the durable store failed. In-memory state is
    /// left as it was — already-applied mutations are not rolled back.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// A file could not be parsed during indexing. Logged and skipped; a scan
    /// never aborts on this.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// Direct lookup of an id that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
