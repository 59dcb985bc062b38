use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NoesisConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub ai: AiConfig,
    pub memory: MemoryConfig,
    pub learning: LearningConfig,
    pub indexer: IndexerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    /// Seconds between background cognitive cycles.
    pub cycle_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"hash"` (deterministic, offline) or `"ollama"` (falls back to hash).
    pub provider: String,
    pub dimensions: usize,
    pub ollama_url: String,
    pub ollama_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    /// `"none"`, `"ollama"`, or `"claude"`.
    pub provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub claude_api_key: Option<String>,
    pub claude_model: String,
    pub timeout_secs: u64,
    /// When set, no text ever leaves the process — providers are never called.
    pub privacy_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Soft cap on stored memories; eviction kicks in above this.
    pub soft_cap: usize,
    /// Memories at or above this importance are never evicted.
    pub importance_floor: f64,
    /// Per-day exponential decay rate used in the eviction recency term.
    pub recency_decay_per_day: f64,
    /// Default number of memories recalled during a think.
    pub recall_limit: usize,
    /// Results below this similarity are dropped from recall.
    pub min_similarity: f32,
    /// Memories not accessed for this many days count as stale in `cycle()`.
    pub stale_after_days: i64,
    /// Importance multiplier applied to stale memories each cycle.
    pub stale_decay_factor: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub exploration_min: f64,
    pub exploration_max: f64,
    /// Multiplicative epsilon decay applied per training step.
    pub exploration_decay: f64,
    pub replay_capacity: usize,
    pub replay_batch: usize,
    /// Q entries with fewer visits than this are pruned by `evolve()`.
    pub prune_visit_floor: u32,
    /// Default reward weights (see `learning::RewardSignals`).
    pub reward_confidence_weight: f64,
    pub reward_reuse_weight: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexerConfig {
    pub folders: Vec<IndexedFolder>,
    /// Target chunk size in tokens (whitespace words).
    pub chunk_size: usize,
    /// Overlap between consecutive chunks; must be < chunk_size.
    pub chunk_overlap: usize,
    pub max_depth: usize,
    /// Milliseconds of quiet time before a watch event triggers a rescan.
    pub debounce_ms: u64,
}

/// A root folder registered for indexing. Config entity — the core only
/// records last-scan times against it, never mutates it otherwise.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct IndexedFolder {
    pub path: String,
    pub recursive: bool,
    /// Substring patterns; any path containing one is skipped.
    pub exclude: Vec<String>,
}

impl Default for IndexedFolder {
    fn default() -> Self {
        Self {
            path: String::new(),
            recursive: true,
            exclude: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            cycle_interval_secs: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_noesis_dir()
            .join("noesis.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".into(),
            dimensions: 384,
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "nomic-embed-text".into(),
            timeout_secs: 5,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "llama3.2".into(),
            claude_api_key: None,
            claude_model: "claude-3-5-haiku-latest".into(),
            timeout_secs: 30,
            privacy_mode: false,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            soft_cap: 10_000,
            importance_floor: 0.8,
            recency_decay_per_day: 0.01,
            recall_limit: 5,
            min_similarity: 0.2,
            stale_after_days: 7,
            stale_decay_factor: 0.95,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.2,
            exploration_min: 0.02,
            exploration_max: 0.5,
            exploration_decay: 0.9995,
            replay_capacity: 1000,
            replay_batch: 32,
            prune_visit_floor: 2,
            reward_confidence_weight: 0.7,
            reward_reuse_weight: 0.3,
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            chunk_size: 512,
            chunk_overlap: 128,
            max_depth: 10,
            debounce_ms: 2000,
        }
    }
}

/// Returns `~/.noesis/`
pub fn default_noesis_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".noesis")
}

/// Returns the default config file path: `~/.noesis/config.toml`
pub fn default_config_path() -> PathBuf {
    default_noesis_dir().join("config.toml")
}

impl NoesisConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            NoesisConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (NOESIS_DB, NOESIS_LOG_LEVEL,
    /// NOESIS_AI_PROVIDER, NOESIS_CLAUDE_API_KEY).
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("NOESIS_DB") {
            self.storage.db_path = val;
        }
        if let Some(val) = var("NOESIS_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = var("NOESIS_AI_PROVIDER") {
            self.ai.provider = val;
        }
        if let Some(val) = var("NOESIS_CLAUDE_API_KEY") {
            self.ai.claude_api_key = Some(val);
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.indexer.chunk_overlap < self.indexer.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.indexer.chunk_overlap,
            self.indexer.chunk_size
        );
        anyhow::ensure!(self.embedding.dimensions > 0, "dimensions must be > 0");
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
