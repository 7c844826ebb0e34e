//! Groq-compatible chat-completion client.
//!
//! Single-turn completions against an OpenAI-style `/chat/completions`
//! endpoint with a fixed model and sampling settings. The response text is
//! returned raw; extracting the JSON payload from it is the analysis
//! layer's concern.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::ChatApi;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
const TEMPERATURE: f32 = 0.6;
const TOP_P: f32 = 0.95;

/// Client for the hosted LLM provider
pub struct GroqClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

impl GroqClient {
    /// Create a client with the default endpoint and model
    pub fn new(api_key: String) -> Self {
        Self::with_options(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    /// Create a client against a custom endpoint and/or model
    pub fn with_options(
        api_key: String,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// The model identifier requests are pinned to
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatApi for GroqClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": TEMPERATURE,
                "max_completion_tokens": max_tokens,
                "top_p": TOP_P,
            }))
            .send()
            .await
            .context("Failed to reach LLM provider")?
            .error_for_status()
            .context("LLM provider rejected the completion request")?;

        let completion: ChatCompletion = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let client = GroqClient::new("key".to_string());
        assert_eq!(client.model(), "deepseek-r1-distill-llama-70b");
    }

    #[test]
    fn test_completion_parsing() {
        let json = r#"{
            "choices": [
                { "message": { "role": "assistant", "content": "```json\n[]\n```" } }
            ]
        }"#;

        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        assert_eq!(content, "```json\n[]\n```");
    }

    #[test]
    fn test_empty_choices_yield_empty_content() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        assert_eq!(content, "");
    }
}
