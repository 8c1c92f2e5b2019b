//! Web search builtin tool
//!
//! Search via configurable providers (Brave, Serper), with results
//! formatted as short spoken-friendly text rather than link lists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{ParamKind, ParamSpec, Tool};
use crate::{Error, Result};

/// Default number of results when the model does not ask for a count
const DEFAULT_RESULTS: usize = 5;

/// Search provider configuration
#[derive(Debug, Clone)]
pub enum SearchProvider {
    /// Brave Search API
    Brave {
        /// API key for Brave Search
        api_key: String,
    },
    /// Serper (Google) Search API
    Serper {
        /// API key for Serper
        api_key: String,
    },
}

/// One search hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Result title
    pub title: String,
    /// Result snippet/description
    pub snippet: String,
}

/// Brave Search API response
#[derive(Debug, Deserialize)]
struct BraveSearchResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    description: String,
}

/// Serper API response
#[derive(Debug, Deserialize)]
struct SerperSearchResponse {
    organic: Option<Vec<SerperResult>>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    title: String,
    snippet: String,
}

/// Serper API request body
#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

/// Web search tool backed by an HTTP search API
pub struct WebSearchTool {
    provider: SearchProvider,
    client: reqwest::Client,
}

impl WebSearchTool {
    /// Create a web search tool for the given provider
    #[must_use]
    pub fn new(provider: SearchProvider) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        match &self.provider {
            SearchProvider::Brave { api_key } => self.search_brave(api_key, query, limit).await,
            SearchProvider::Serper { api_key } => self.search_serper(api_key, query, limit).await,
        }
    }

    async fn search_brave(
        &self,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .query(&[("q", query), ("count", &limit.to_string())])
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Tool(format!("Brave search error {status}")));
        }

        let parsed: BraveSearchResponse = response.json().await?;
        Ok(parsed
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.description,
            })
            .collect())
    }

    async fn search_serper(
        &self,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .post("https://google.serper.dev/search")
            .header("X-API-KEY", api_key)
            .json(&SerperRequest { q: query, num: limit })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Tool(format!("Serper search error {status}")));
        }

        let parsed: SerperSearchResponse = response.json().await?;
        Ok(parsed
            .organic
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                snippet: r.snippet,
            })
            .collect())
    }
}

/// Format hits as short numbered lines; links are useless spoken aloud
fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No search results found for: {query}");
    }
    let mut out = format!("Search results for: {query}\n");
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("{}. {}. {}\n", i + 1, hit.title, hit.snippet));
    }
    out
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("query", ParamKind::String, "The search query"),
            ParamSpec::optional(
                "max_results",
                ParamKind::Integer,
                "Maximum number of results (default 5)",
            ),
        ]
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let query = arguments["query"].as_str().unwrap_or_default().trim();
        if query.is_empty() {
            return Ok("No search query provided.".to_string());
        }

        #[allow(clippy::cast_possible_truncation)]
        let limit = arguments["max_results"]
            .as_u64()
            .map_or(DEFAULT_RESULTS, |n| n as usize)
            .clamp(1, 10);

        tracing::info!(%query, limit, "web search");
        let hits = self.search(query, limit).await?;
        Ok(format_hits(query, &hits))
    }
}
