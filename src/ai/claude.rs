//! Cloud completions via the Anthropic Messages API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{format_memory_context, AiProvider};
use crate::error::{EngineError, Result};
use crate::memory::SearchResult;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    api_key: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ClaudeProvider {
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[async_trait::async_trait]
impl AiProvider for ClaudeProvider {
    async fn complete(&self, prompt: &str, context: &[SearchResult]) -> Result<String> {
        let memory_context = format_memory_context(context);
        let system = format!(
            "You are a personal cognitive assistant with access to the user's \
             stored memories. Use the memory context below when it is relevant. \
             Be concise.\n{memory_context}"
        );

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: 1024,
                system,
                messages: vec![Message {
                    role: "user",
                    content: prompt,
                }],
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EngineError::Provider(format!("claude request: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Provider(format!(
                "claude returned {status}: {body}"
            )));
        }

        let body: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Provider(format!("claude response: {e}")))?;
        let text = body
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .unwrap_or_default();
        Ok(text)
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}
