//! Language-model clients.
//!
//! [`ChatModel`] is the seam the store client talks to: a list of
//! [`ChatTurn`]s in, the assistant's text out. Two HTTP backends are
//! provided:
//!
//! | `llm.provider` | Endpoint |
//! |----------------|----------|
//! | `ollama` | `POST {url}/api/chat` with `stream: false` |
//! | `openai` | `POST {url}/v1/chat/completions` (any compatible server) |

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::http::post_json_with_retry;
use crate::models::ChatTurn;

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send the conversation and return the assistant's reply text.
    async fn chat(&self, messages: &[ChatTurn]) -> Result<String>;
}

/// Chat completion against a local Ollama instance.
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f64,
    top_p: f64,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatTurn]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "top_p": self.top_p,
            },
        });
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/api/chat", self.url),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_chat(&json)
    }
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    match json.pointer("/message/content") {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Null) | None => {
            bail!("Invalid Ollama response: missing message.content")
        }
        Some(other) => Ok(other.to_string()),
    }
}

/// Chat completion against an OpenAI-compatible server.
///
/// The bearer token comes from `LLM_API_KEY`, then `OPENAI_API_KEY`; local
/// servers that need no key work without either.
pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f64,
    top_p: f64,
    max_retries: u32,
    api_key: Option<String>,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty());

        Ok(Self {
            client: build_client(config)?,
            endpoint: completions_endpoint(&config.url),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_retries: config.max_retries,
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatTurn]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "top_p": self.top_p,
        });
        let json = post_json_with_retry(
            &self.client,
            &self.endpoint,
            self.api_key.as_deref(),
            &body,
            self.max_retries,
            "LLM",
        )
        .await?;
        parse_openai_chat(&json)
    }
}

/// Resolve the chat completions endpoint from a base URL.
fn completions_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String> {
    // content may be null when the model refuses or only calls tools
    match json.pointer("/choices/0/message/content") {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Null) => Ok(String::new()),
        Some(other) => Ok(other.to_string()),
        None => bail!("Invalid LLM response: missing choices[0].message.content"),
    }
}

fn build_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Create the configured chat model.
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_content_is_extracted() {
        let json = serde_json::json!({
            "model": "llama3",
            "message": { "role": "assistant", "content": "Three topics." },
            "done": true
        });
        assert_eq!(parse_ollama_chat(&json).unwrap(), "Three topics.");
        assert!(parse_ollama_chat(&serde_json::json!({ "done": true })).is_err());
    }

    #[test]
    fn openai_null_content_is_empty() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        });
        assert_eq!(parse_openai_chat(&json).unwrap(), "");
    }

    #[test]
    fn endpoint_resolution() {
        assert_eq!(
            completions_endpoint("http://localhost:1234/v1"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("http://localhost:1234/"),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }
}
