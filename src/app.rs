//! Process-wide state bundle.
//!
//! One [`AppState`] is constructed at startup and shared (by `Arc`) into the
//! CLI handlers and background tasks. Nothing here is a singleton; every
//! component receives its collaborators explicitly.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::ai;
use crate::config::NoesisConfig;
use crate::db::{self, snapshot};
use crate::embedding::EmbeddingService;
use crate::engine::CognitiveEngine;
use crate::events::EventBus;
use crate::indexer::FileIndexer;
use crate::learning::QLearner;
use crate::memory::MemoryStore;

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub memory_count: usize,
    pub thought_count: usize,
    pub uptime_secs: u64,
    pub ai_provider: String,
    pub embedding_provider: String,
    pub indexed_files: usize,
    pub indexed_chunks: usize,
    pub learning_trend: f64,
}

pub struct AppState {
    pub config: NoesisConfig,
    pub engine: Arc<CognitiveEngine>,
    pub indexer: Arc<FileIndexer>,
    pub embeddings: Arc<EmbeddingService>,
    pub events: EventBus,
    pub db: Arc<Mutex<Connection>>,
    started_at: Instant,
}

impl AppState {
    /// Open the database, restore persisted state, and wire every component
    /// together. The single connection opened here is shared for the process
    /// lifetime.
    pub async fn init(config: NoesisConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        let db = Arc::new(Mutex::new(conn));

        let embeddings = Arc::new(EmbeddingService::new(config.embedding.clone()));
        embeddings.probe_remote().await;

        let store = Arc::new(MemoryStore::new(config.embedding.dimensions));
        let learner = Arc::new(QLearner::new(config.learning.clone()));
        let events = EventBus::default();

        {
            let conn = db.lock();
            let memories = snapshot::load_memories(&conn)?;
            if !memories.is_empty() {
                info!(count = memories.len(), "restored memories");
            }
            store.restore(memories);
            learner.import(snapshot::load_q_table(&conn)?);
        }

        let provider = ai::build_provider(&config.ai);
        let engine = Arc::new(CognitiveEngine::new(
            Arc::clone(&store),
            Arc::clone(&learner),
            Arc::clone(&embeddings),
            provider,
            events.clone(),
            Arc::clone(&db),
            config.memory.clone(),
            config.ai.clone(),
        ));

        let indexer = Arc::new(FileIndexer::new(
            config.indexer.clone(),
            Arc::clone(&embeddings),
            Arc::clone(&db),
            events.clone(),
        ));
        {
            let conn = db.lock();
            let chunks = snapshot::load_chunks(&conn)?;
            if !chunks.is_empty() {
                info!(count = chunks.len(), "restored file chunks");
            }
            indexer.restore(chunks, snapshot::load_file_meta(&conn)?);
        }

        Ok(Self {
            config,
            engine,
            indexer,
            embeddings,
            events,
            db,
            started_at: Instant::now(),
        })
    }

    pub fn status(&self) -> SystemStatus {
        let index_stats = self.indexer.stats();
        SystemStatus {
            memory_count: self.engine.memory_count(),
            thought_count: self.engine.thought_count(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            ai_provider: self.engine.ai_provider_name(),
            embedding_provider: self.embeddings.backend().as_str().to_string(),
            indexed_files: index_stats.files,
            indexed_chunks: index_stats.chunks,
            learning_trend: self.engine.learning_trend(),
        }
    }

    /// Persist all in-memory state. Called on shutdown and on demand.
    pub fn flush(&self) -> crate::error::Result<()> {
        self.engine.flush()
    }
}
