//! Web search collection (SerpAPI)
//!
//! Each configured query is sent to the search provider; organic results are
//! flattened into one line per snippet and joined into the text block that
//! feeds the content prompt.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::types::SearchSnippet;

const MISSING_DESCRIPTION: &str = "No description available";

/// A search backend able to answer one keyword query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, num_results: u32, language: &str)
        -> Result<Vec<SearchSnippet>>;

    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl From<OrganicResult> for SearchSnippet {
    fn from(result: OrganicResult) -> Self {
        SearchSnippet {
            title: result.title.unwrap_or_default(),
            link: result.link.unwrap_or_default(),
            description: result
                .snippet
                .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
        }
    }
}

/// SerpAPI `search.json` client
#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: Client,
    endpoint: String,
    engine: String,
    api_key: SecretString,
}

impl SerpApiProvider {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("SERP_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent("autopost-rs/0.3")
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            engine: config.engine.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(
        &self,
        query: &str,
        num_results: u32,
        language: &str,
    ) -> Result<Vec<SearchSnippet>> {
        let num = num_results.to_string();
        let params = [
            ("engine", self.engine.as_str()),
            ("q", query),
            ("num", num.as_str()),
            ("hl", language),
            ("api_key", self.api_key.expose_secret()),
        ];

        let response = self.client.get(&self.endpoint).query(&params).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Search(format!("{}: {}", status, text)));
        }

        let parsed: SerpApiResponse = serde_json::from_str(&text)?;
        if let Some(message) = parsed.error {
            return Err(Error::Search(message));
        }

        Ok(parsed
            .organic_results
            .into_iter()
            .map(SearchSnippet::from)
            .collect())
    }

    fn name(&self) -> &str {
        "SerpAPI"
    }
}

/// Runs every configured query and flattens the results.
pub struct SearchCollector {
    provider: Arc<dyn SearchProvider>,
    queries: Vec<String>,
    results_per_query: u32,
    language: String,
}

impl SearchCollector {
    pub fn new(provider: Arc<dyn SearchProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            queries: config.queries.clone(),
            results_per_query: config.results_per_query,
            language: config.language.clone(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let provider = SerpApiProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), config))
    }

    /// Query the provider once per query, in order. A failing query logs and
    /// contributes nothing.
    pub async fn collect(&self) -> Vec<SearchSnippet> {
        let mut snippets = Vec::new();

        for query in &self.queries {
            info!("🔎 Searching {} for '{}'", self.provider.name(), query);
            match self
                .provider
                .search(query, self.results_per_query, &self.language)
                .await
            {
                Ok(results) => {
                    info!("Query '{}' returned {} results", query, results.len());
                    for result in &results {
                        debug!("Found result: {:?}", result);
                    }
                    snippets.extend(results);
                }
                Err(e) => {
                    error!("Search for '{}' failed: {}", query, e);
                }
            }
        }

        snippets
    }

    /// Collect and render everything into one text block.
    pub async fn gather(&self) -> String {
        let snippets = self.collect().await;
        let text = render_snippets(&snippets);
        debug!("Combined {} snippets into summary text", snippets.len());
        text
    }
}

/// One `Title: .. | Desc: .. | Link: ..` line per snippet, newline separated.
pub fn render_snippets(snippets: &[SearchSnippet]) -> String {
    snippets
        .iter()
        .map(SearchSnippet::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organic_result_defaults() {
        let parsed: SerpApiResponse = serde_json::from_str(
            r#"{"organic_results": [{"title": "Fintech weekly", "link": "https://f.example"}]}"#,
        )
        .unwrap();

        let snippet = SearchSnippet::from(parsed.organic_results.into_iter().next().unwrap());
        assert_eq!(snippet.title, "Fintech weekly");
        assert_eq!(snippet.description, MISSING_DESCRIPTION);
    }

    #[test]
    fn test_missing_organic_results_is_empty() {
        let parsed: SerpApiResponse =
            serde_json::from_str(r#"{"search_metadata": {"status": "Success"}}"#).unwrap();
        assert!(parsed.organic_results.is_empty());
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_render_snippets() {
        let snippets = vec![
            SearchSnippet::new("A", "https://a", "first"),
            SearchSnippet::new("B", "https://b", "second"),
        ];
        assert_eq!(
            render_snippets(&snippets),
            "Title: A | Desc: first | Link: https://a\nTitle: B | Desc: second | Link: https://b"
        );
        assert_eq!(render_snippets(&[]), "");
    }

    #[test]
    fn test_provider_requires_key() {
        let config = SearchConfig::default();
        assert!(SerpApiProvider::new(&config).is_err());
    }
}
