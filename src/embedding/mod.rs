//! Text embedding service.
//!
//! Always answers. The hash backend ([`hash::hash_embedding`]) is the floor:
//! deterministic, offline, infallible. When Ollama is configured and reachable
//! the service upgrades itself to remote embeddings, and any remote failure
//! falls back to hash for that call — `embed` never returns an error and never
//! returns the wrong number of dimensions.

pub mod hash;

use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EmbeddingConfig;
use crate::error::{EngineError, Result};
use crate::memory::vector::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Hash,
    Ollama,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Hash => "hash",
            Backend::Ollama => "ollama",
        }
    }
}

pub struct EmbeddingService {
    backend: RwLock<Backend>,
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl EmbeddingService {
    /// Starts on the hash backend; call [`probe_remote`](Self::probe_remote)
    /// to upgrade to Ollama when configured.
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            backend: RwLock::new(Backend::Hash),
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    pub fn backend(&self) -> Backend {
        *self.backend.read()
    }

    /// Check whether the configured remote embedder is reachable and switch
    /// to it if so. Safe to call repeatedly (the cycle task re-probes).
    pub async fn probe_remote(&self) -> bool {
        if self.config.provider != "ollama" {
            return false;
        }
        let url = format!("{}/api/tags", self.config.ollama_url);
        let reachable = matches!(
            self.client
                .get(&url)
                .timeout(Duration::from_secs(2))
                .send()
                .await,
            Ok(resp) if resp.status().is_success()
        );
        let mut backend = self.backend.write();
        match (reachable, *backend) {
            (true, Backend::Hash) => {
                *backend = Backend::Ollama;
                info!("ollama embedding backend online");
            }
            (false, Backend::Ollama) => {
                *backend = Backend::Hash;
                warn!("ollama unreachable, embeddings fall back to hash");
            }
            _ => {}
        }
        reachable
    }

    /// Embed text. Infallible: remote failures degrade to the hash backend
    /// for this call, and the result always has exactly `dimensions()`
    /// components. Empty input yields the zero vector.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let backend = *self.backend.read();
        if backend == Backend::Ollama {
            match self.embed_remote(text).await {
                Ok(vector) => return vector,
                Err(err) => {
                    warn!(error = %err, "remote embedding failed, using hash fallback");
                }
            }
        }
        hash::hash_embedding(text, self.config.dimensions)
    }

    async fn embed_remote(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            embeddings: Vec<Vec<f64>>,
        }

        let url = format!("{}/api/embed", self.config.ollama_url);
        let resp = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.config.ollama_model,
                input: text,
            })
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| EngineError::Provider(format!("ollama embed request: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Provider(format!(
                "ollama embed returned {}",
                resp.status()
            )));
        }

        let body: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Provider(format!("ollama embed response: {e}")))?;

        let first = body
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Provider("ollama returned no embeddings".into()))?;

        // Remote models may disagree on width; pad or truncate so every
        // vector in the store stays comparable.
        let mut vector: Vec<f32> = first.into_iter().map(|x| x as f32).collect();
        if vector.len() != self.config.dimensions {
            debug!(
                got = vector.len(),
                want = self.config.dimensions,
                "resizing remote embedding"
            );
            vector.resize(self.config.dimensions, 0.0);
        }
        normalize(&mut vector);
        Ok(vector)
    }
}
