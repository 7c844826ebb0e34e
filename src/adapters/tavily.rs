//! Tavily-compatible web-search client.
//!
//! Used to fetch short background context for extracted themes. The raw
//! `answer`/`results` fields are returned as-is; choosing between them (and
//! truncating the fallback) happens in the analysis layer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchAnswer, SearchApi};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Client for the hosted search provider
pub struct TavilyClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    content: String,
}

impl TavilyClient {
    /// Create a client with the default endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SearchApi for TavilyClient {
    async fn search(&self, query: &str) -> Result<SearchAnswer> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "query": query,
                "search_depth": "basic",
                "include_answer": true,
            }))
            .send()
            .await
            .context("Failed to reach search provider")?
            .error_for_status()
            .context("Search provider rejected the query")?;

        let search: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(SearchAnswer {
            answer: search.answer.filter(|a| !a.trim().is_empty()),
            top_result: search
                .results
                .into_iter()
                .next()
                .map(|r| r.content)
                .filter(|c| !c.is_empty()),
        })
    }
}
