//! Local completions via the Ollama HTTP API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{format_memory_context, AiProvider};
use crate::error::{EngineError, Result};
use crate::memory::SearchResult;

pub struct OllamaProvider {
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait::async_trait]
impl AiProvider for OllamaProvider {
    async fn complete(&self, prompt: &str, context: &[SearchResult]) -> Result<String> {
        let memory_context = format_memory_context(context);
        let full_prompt = format!(
            "You are a personal cognitive assistant with access to the user's \
             stored memories. Use the memory context below when it is relevant.\n\
             {memory_context}\
             User: {prompt}\n\
             Assistant:"
        );

        let url = format!("{}/api/generate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: full_prompt,
                stream: false,
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EngineError::Provider(format!("ollama request: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Provider(format!(
                "ollama returned {}",
                resp.status()
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Provider(format!("ollama response: {e}")))?;
        Ok(body.response.trim().to_string())
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
