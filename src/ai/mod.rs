//! Optional AI completion providers.
//!
//! The engine treats a provider as a best-effort enhancement: a failed or
//! timed-out call degrades the think to memory-only, it never propagates.
//! Providers are interchangeable behind [`AiProvider`] and hot-swappable at
//! runtime (the engine holds them behind a lock, not by value).

pub mod claude;
pub mod ollama;

use std::sync::Arc;

use tracing::info;

use crate::config::AiConfig;
use crate::error::Result;
use crate::memory::SearchResult;

#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a completion for `prompt`, informed by recalled memories.
    async fn complete(&self, prompt: &str, context: &[SearchResult]) -> Result<String>;

    /// Cheap reachability check, used by the cycle task.
    async fn is_available(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Build the configured provider, or `None` when AI is disabled — either
/// explicitly (`provider = "none"`), by privacy mode, or because the claude
/// key is missing.
pub fn build_provider(config: &AiConfig) -> Option<Arc<dyn AiProvider>> {
    if config.privacy_mode {
        info!("privacy mode on, ai providers disabled");
        return None;
    }
    match config.provider.as_str() {
        "ollama" => Some(Arc::new(ollama::OllamaProvider::new(
            &config.ollama_url,
            &config.ollama_model,
            config.timeout_secs,
        ))),
        "claude" => {
            let key = config.claude_api_key.as_deref()?;
            Some(Arc::new(claude::ClaudeProvider::new(
                key,
                &config.claude_model,
                config.timeout_secs,
            )))
        }
        _ => None,
    }
}

/// Render recalled memories into a prompt block.
pub fn format_memory_context(memories: &[SearchResult]) -> String {
    if memories.is_empty() {
        return String::new();
    }
    let mut context = String::from("\n--- Relevant Memories ---\n");
    for (i, hit) in memories.iter().enumerate() {
        context.push_str(&format!(
            "{}. [{}] (similarity: {:.2}): {}\n",
            i + 1,
            hit.memory.memory_type,
            hit.similarity,
            hit.memory.content
        ));
    }
    context.push_str("--- End Memories ---\n\n");
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Memory, MemoryType};

    fn hit(content: &str, similarity: f32) -> SearchResult {
        SearchResult {
            memory: Memory {
                id: "m1".into(),
                content: content.into(),
                embedding: vec![],
                memory_type: MemoryType::Semantic,
                importance: 0.5,
                created_at: 0,
                last_accessed: 0,
                access_count: 0,
            },
            similarity,
        }
    }

    #[test]
    fn empty_context_formats_to_nothing() {
        assert_eq!(format_memory_context(&[]), "");
    }

    #[test]
    fn context_lists_memories_with_similarity() {
        let text = format_memory_context(&[hit("rust is fast", 0.91)]);
        assert!(text.contains("1. [semantic] (similarity: 0.91): rust is fast"));
    }

    #[test]
    fn privacy_mode_disables_providers() {
        let config = AiConfig {
            provider: "ollama".into(),
            privacy_mode: true,
            ..AiConfig::default()
        };
        assert!(build_provider(&config).is_none());
    }

    #[test]
    fn claude_without_key_is_disabled() {
        let config = AiConfig {
            provider: "claude".into(),
            claude_api_key: None,
            ..AiConfig::default()
        };
        assert!(build_provider(&config).is_none());
    }

    #[test]
    fn ollama_provider_builds() {
        let config = AiConfig {
            provider: "ollama".into(),
            ..AiConfig::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
