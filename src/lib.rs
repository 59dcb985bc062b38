//! Local cognitive layer — semantic memory, adaptive recall, and file search.
//!
//! noesis stores arbitrary text as vector-searchable memories, answers queries
//! by combining recalled memories with an optional language-model assist, and
//! learns over time (tabular Q-learning) which response strategy works. It also
//! keeps a semantically searchable index of local files, kept fresh by a
//! debounced filesystem watch.
//!
//! Everything runs in one process against one SQLite database. Embeddings are
//! deterministic by default (feature hashing, no network), so the whole system
//! works offline; an Ollama endpoint can take over embedding and completion
//! when reachable.
//!
//! # Modules
//!
//! - [`config`] — TOML configuration with environment overrides
//! - [`db`] — SQLite schema and transactional snapshots
//! - [`embedding`] — text-to-vector pipeline (hash primary, Ollama secondary)
//! - [`memory`] — concurrent vector memory store
//! - [`learning`] — Q-learning strategy selector with experience replay
//! - [`ai`] — pluggable completion providers (Ollama, Claude)
//! - [`engine`] — think/remember/recall/evolve/cycle orchestration
//! - [`indexer`] — file scanning, chunking, watching, and search
//! - [`app`] — the process-wide state bundle and status/flush surface
//! - [`runtime`] — background tasks (cycle timer, watch loop) and shutdown

pub mod ai;
pub mod app;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod events;
pub mod indexer;
pub mod learning;
pub mod memory;
pub mod runtime;

pub use error::EngineError;
