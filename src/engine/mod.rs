//! The cognitive engine: orchestrates embedding, recall, strategy selection,
//! optional AI enhancement, and learning feedback for every interaction.
//!
//! `think` is the main loop in miniature: embed → recall → pick a strategy →
//! respond → score the outcome → learn from it → remember the exchange.
//! A configured AI provider only ever improves a response; its failure is
//! reported as `ai_enhanced = false`, never as an error.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Timelike;
use parking_lot::{Mutex, RwLock};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::AiProvider;
use crate::config::{AiConfig, MemoryConfig};
use crate::db::snapshot;
use crate::embedding::EmbeddingService;
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::learning::{QLearner, RewardSignals, StateKey, Strategy, Transition};
use crate::memory::types::now_millis;
use crate::memory::{Memory, MemoryStore, MemoryType, SearchResult, Thought};

const MAX_THOUGHTS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub decayed_memories: usize,
    pub replayed_transitions: usize,
    pub ai_available: bool,
    pub embedding_backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub memory_count: usize,
    pub memories_by_type: Vec<(String, usize)>,
    pub thought_count: usize,
    pub learner: crate::learning::LearnerStats,
}

pub struct CognitiveEngine {
    store: Arc<MemoryStore>,
    learner: Arc<QLearner>,
    embeddings: Arc<EmbeddingService>,
    /// Hot-swappable; re-read on every think rather than captured at startup.
    provider: RwLock<Option<Arc<dyn AiProvider>>>,
    events: EventBus,
    db: Arc<Mutex<Connection>>,
    thoughts: Mutex<VecDeque<Thought>>,
    memory_config: MemoryConfig,
    ai_config: AiConfig,
}

impl CognitiveEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<MemoryStore>,
        learner: Arc<QLearner>,
        embeddings: Arc<EmbeddingService>,
        provider: Option<Arc<dyn AiProvider>>,
        events: EventBus,
        db: Arc<Mutex<Connection>>,
        memory_config: MemoryConfig,
        ai_config: AiConfig,
    ) -> Self {
        Self {
            store,
            learner,
            embeddings,
            provider: RwLock::new(provider),
            events,
            db,
            thoughts: Mutex::new(VecDeque::with_capacity(MAX_THOUGHTS)),
            memory_config,
            ai_config,
        }
    }

    /// Swap the AI provider at runtime. `None` disables enhancement.
    pub fn set_ai_provider(&self, provider: Option<Arc<dyn AiProvider>>) {
        let name = provider.as_ref().map(|p| p.name()).unwrap_or("none");
        info!(provider = name, "ai provider changed");
        *self.provider.write() = provider;
    }

    pub fn ai_provider_name(&self) -> String {
        self.provider
            .read()
            .as_ref()
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| "none".to_string())
    }

    /// Full think pipeline. Never fails because of a missing or broken AI
    /// provider; only empty input is rejected.
    pub async fn think(&self, input: &str) -> Result<Thought> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EngineError::Input("empty input".into()));
        }

        let query = self.embeddings.embed(input).await;
        let limit = self.memory_config.recall_limit;
        let mut hits = self
            .store
            .search(&query, limit, self.memory_config.min_similarity, None);

        let prior_confidence = confidence_from(&hits, false);
        let hour = chrono::Local::now().hour();
        let state = StateKey::from_context(prior_confidence, hits.len(), hour);
        let strategy = self.learner.select_action(state);

        match strategy {
            Strategy::WidenRecall => {
                hits = self.store.search(
                    &query,
                    limit.max(1) * 2,
                    self.memory_config.min_similarity,
                    None,
                );
            }
            Strategy::NarrowRecall => hits.truncate(2),
            Strategy::MemoryOnly | Strategy::BlendAi => {}
        }

        let mut ai_enhanced = false;
        let mut response = None;
        if strategy == Strategy::BlendAi && !self.ai_config.privacy_mode {
            let provider = self.provider.read().clone();
            if let Some(provider) = provider {
                match provider.complete(input, &hits).await {
                    Ok(text) if !text.trim().is_empty() => {
                        ai_enhanced = true;
                        response = Some(text);
                    }
                    Ok(_) => debug!("provider returned empty completion"),
                    Err(err) => {
                        warn!(error = %err, "provider failed, degrading to memory-only");
                    }
                }
            }
        }
        let response = response.unwrap_or_else(|| synthesize_response(input, &hits));

        let confidence = confidence_from(&hits, ai_enhanced);
        let memory_reuse = if limit == 0 {
            0.0
        } else {
            (hits.len() as f64 / limit as f64).min(1.0)
        };
        let reward = self.learner.reward(&RewardSignals {
            confidence,
            memory_reuse,
        });
        let next_state = StateKey::from_context(confidence, hits.len(), hour);
        self.learner.update(state, strategy, reward, next_state);
        self.learner.record(Transition {
            state,
            action: strategy,
            reward,
            next_state,
        });

        // the interaction itself becomes an episodic memory
        self.store_memory(
            format!("Q: {input}\nA: {response}"),
            MemoryType::Episodic,
            0.5,
        )
        .await?;

        let thought = Thought {
            response,
            confidence,
            memory_ids: hits.iter().map(|h| h.memory.id.clone()).collect(),
            ai_enhanced,
            strategy: strategy.as_str().to_string(),
            created_at: now_millis(),
        };
        {
            let mut thoughts = self.thoughts.lock();
            if thoughts.len() >= MAX_THOUGHTS {
                thoughts.pop_front();
            }
            thoughts.push_back(thought.clone());
        }
        self.events.publish(EngineEvent::ThoughtGenerated {
            confidence,
            ai_enhanced,
            strategy: strategy.as_str().to_string(),
        });
        Ok(thought)
    }

    /// Store new content as a memory, durably.
    pub async fn remember(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: f64,
    ) -> Result<Memory> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::Input("empty content".into()));
        }
        self.store_memory(content.to_string(), memory_type, importance)
            .await
    }

    /// Embed the query and return ranked matches, optionally restricted to
    /// one memory type.
    pub async fn recall(
        &self,
        query: &str,
        k: usize,
        type_filter: Option<MemoryType>,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::Input("empty query".into()));
        }
        let vector = self.embeddings.embed(query).await;
        Ok(self
            .store
            .search(&vector, k, self.memory_config.min_similarity, type_filter))
    }

    pub fn get_memory(&self, id: &str) -> Result<Memory> {
        self.store
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Run a learner evolution pass and persist the adjusted Q-table.
    pub async fn evolve(&self) -> Result<crate::learning::EvolveSummary> {
        let summary = self.learner.evolve().await;
        let rows = self.learner.export();
        let mut conn = self.db.lock();
        snapshot::save_q_table(&mut conn, &rows)?;
        Ok(summary)
    }

    /// Periodic maintenance: decay stale memories, replay one experience
    /// batch, and re-probe provider availability.
    pub async fn cycle(&self) -> CycleReport {
        let decayed = self.store.decay_stale(
            self.memory_config.stale_after_days,
            self.memory_config.stale_decay_factor,
        );
        let replayed = self.learner.replay_batch().await;

        self.embeddings.probe_remote().await;
        let provider = self.provider.read().clone();
        let ai_available = match provider {
            Some(p) => p.is_available().await,
            None => false,
        };

        let report = CycleReport {
            decayed_memories: decayed,
            replayed_transitions: replayed,
            ai_available,
            embedding_backend: self.embeddings.backend().as_str().to_string(),
        };
        self.events.publish(EngineEvent::CycleCompleted {
            decayed,
            replayed,
        });
        debug!(?report, "cycle complete");
        report
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            memory_count: self.store.len(),
            memories_by_type: self
                .store
                .count_by_type()
                .into_iter()
                .map(|(ty, n)| (ty.as_str().to_string(), n))
                .collect(),
            thought_count: self.thoughts.lock().len(),
            learner: self.learner.stats(),
        }
    }

    pub fn get_thoughts(&self, limit: usize) -> Vec<Thought> {
        let thoughts = self.thoughts.lock();
        thoughts.iter().rev().take(limit).cloned().collect()
    }

    pub fn thought_count(&self) -> usize {
        self.thoughts.lock().len()
    }

    pub fn memory_count(&self) -> usize {
        self.store.len()
    }

    pub fn learning_trend(&self) -> f64 {
        self.learner.stats().reward_trend
    }

    /// Persist all in-memory state (memories and Q-table). Chunks are
    /// persisted eagerly by the indexer and need no flush.
    pub fn flush(&self) -> Result<()> {
        let memories = self.store.snapshot();
        let rows = self.learner.export();
        let mut conn = self.db.lock();
        snapshot::save_memories(&mut conn, &memories)?;
        snapshot::save_q_table(&mut conn, &rows)?;
        info!(memories = memories.len(), q_rows = rows.len(), "state flushed");
        Ok(())
    }

    async fn store_memory(
        &self,
        content: String,
        memory_type: MemoryType,
        importance: f64,
    ) -> Result<Memory> {
        let embedding = self.embeddings.embed(&content).await;
        let memory = self.store.insert(content, embedding, memory_type, importance)?;

        let evicted = self.store.evict_if_needed(
            self.memory_config.soft_cap,
            self.memory_config.importance_floor,
            self.memory_config.recency_decay_per_day,
        );
        {
            let conn = self.db.lock();
            snapshot::save_memory(&conn, &memory)?;
            for id in &evicted {
                snapshot::delete_memory(&conn, id)?;
            }
        }

        self.events.publish(EngineEvent::MemoryStored {
            id: memory.id.clone(),
            memory_type: memory.memory_type.as_str().to_string(),
        });
        Ok(memory)
    }
}

/// Confidence is the mean similarity of the top three hits, nudged up when an
/// AI completion succeeded, clamped to [0, 1]. No recall at all floors at 0.1
/// so the learner still distinguishes "nothing known" from "contradicted".
fn confidence_from(hits: &[SearchResult], ai_enhanced: bool) -> f64 {
    let base = if hits.is_empty() {
        0.1
    } else {
        let top: Vec<f64> = hits.iter().take(3).map(|h| h.similarity as f64).collect();
        top.iter().sum::<f64>() / top.len() as f64
    };
    let boosted = if ai_enhanced { base + 0.1 } else { base };
    boosted.clamp(0.0, 1.0)
}

/// Memory-only response synthesis: lead with the best match, note support.
fn synthesize_response(input: &str, hits: &[SearchResult]) -> String {
    match hits.first() {
        None => format!("I don't have any memories related to \"{input}\" yet."),
        Some(best) => {
            let mut response = format!(
                "Based on what I remember (similarity {:.2}): {}",
                best.similarity, best.memory.content
            );
            if hits.len() > 1 {
                response.push_str(&format!(
                    "\n({} more related memor{} considered)",
                    hits.len() - 1,
                    if hits.len() == 2 { "y" } else { "ies" }
                ));
            }
            response
        }
    }
}
