use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use super::{fetch_text, truncate_chars, KnowledgeSource};
use crate::config::DocumentSourceConfig;
use crate::error::{ToolError, ToolResult};

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Wikipedia search returning page intro extracts
#[derive(Debug, Clone)]
pub struct Wikipedia {
    client: Client,
    base_url: String,
    top_k: usize,
    doc_chars: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    extract: String,
}

impl Wikipedia {
    /// Create an adapter from its caps and endpoint
    pub fn new(client: Client, config: &DocumentSourceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            top_k: config.top_k,
            doc_chars: config.doc_chars,
        }
    }

    fn page_url(&self, title: &str) -> String {
        format!("{}/wiki/{}", self.base_url, title.replace(' ', "_"))
    }
}

#[async_trait]
impl KnowledgeSource for Wikipedia {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up general knowledge about people, places, companies, facts, historical \
         events, or other subjects on Wikipedia. Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> ToolResult<String> {
        let url = format!("{}/w/api.php", self.base_url);
        // generator=search ranks pages and returns their intros in one round trip.
        let query = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("generator", "search".to_string()),
            ("gsrsearch", input.trim().to_string()),
            ("gsrlimit", self.top_k.to_string()),
            ("prop", "extracts".to_string()),
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
            ("redirects", "1".to_string()),
        ];
        let body = fetch_text(&self.client, self.name(), &url, &query).await?;

        let response: QueryResponse =
            serde_json::from_str(&body).map_err(|e| ToolError::InvalidResponse {
                tool: self.name().to_string(),
                message: e.to_string(),
            })?;

        let mut pages: Vec<Page> = response
            .query
            .map(|q| q.pages.into_values().collect())
            .unwrap_or_default();
        pages.sort_by_key(|page| page.index);

        info!(tool = "wikipedia", results = pages.len(), "Wikipedia search completed");

        let summaries: Vec<String> = pages
            .iter()
            .filter(|page| !page.extract.trim().is_empty())
            .take(self.top_k)
            .map(|page| {
                let doc = format!(
                    "Page: {}\nURL: {}\nSummary: {}",
                    page.title,
                    self.page_url(&page.title),
                    page.extract.trim()
                );
                truncate_chars(&doc, self.doc_chars)
            })
            .collect();

        if summaries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(summaries.join("\n\n"))
    }
}
