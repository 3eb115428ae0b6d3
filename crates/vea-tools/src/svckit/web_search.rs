//! Web Search Tool
//!
//! Up-to-date results from the Tavily search API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use vea_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::{ParamType, ParameterSchema},
};

use crate::error::{Result, ToolFailure};

pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Tool for searching the web
pub struct TavilySearchTool {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    max_results: usize,
}

impl TavilySearchTool {
    pub const NAME: &'static str = "tavily_search";

    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: TAVILY_BASE_URL.into(),
            max_results: 2,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ToolFailure::MissingApiKey("TAVILY_API_KEY"))?;

        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Search the web for current events, recent developments and other time-sensitive information.".into(),
            parameters: vec![ParameterSchema::required("query", ParamType::String, "Search query")],
            category: Some("web_search".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let query = call.str_arg("query").unwrap_or_default();

        Ok(match self.search(query).await {
            Ok(found) => {
                tracing::debug!(query = %query, hits = found.results.len(), "Web search complete");
                ToolResult::json(Self::NAME, json!({ "query": query, "results": found.results }))
            }
            Err(failure) => {
                tracing::warn!(query = %query, error = %failure, "Web search failed");
                ToolResult::failure(Self::NAME, failure.to_string())
            }
        })
    }
}
