//! Knowledge-source adapters and the catalog the reasoning loop selects from.
//!
//! Every adapter exposes the same text-in/text-out contract
//! ([`KnowledgeSource`]). A [`ToolSpec`] binds an adapter to a name and a
//! result cap; the [`SourceCatalog`] holds the registered specs in order.

mod arxiv;
mod web_search;
mod wikipedia;

pub use arxiv::*;
pub use web_search::*;
pub use wikipedia::*;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::SourcesConfig;
use crate::error::{ToolError, ToolResult};

/// An external knowledge source answering a text query with text.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Name the synthesizer uses to select this source.
    fn name(&self) -> &str;

    /// One-line description shown to the synthesizer.
    fn description(&self) -> &str;

    /// Run the query and return the result text.
    async fn invoke(&self, input: &str) -> ToolResult<String>;
}

/// A registered tool: an adapter plus the bound on its result length.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    max_result_chars: usize,
    source: Arc<dyn KnowledgeSource>,
}

impl ToolSpec {
    /// Bind an adapter under its own name
    pub fn new(source: Arc<dyn KnowledgeSource>, max_result_chars: usize) -> Self {
        Self {
            name: source.name().to_string(),
            description: source.description().to_string(),
            max_result_chars,
            source,
        }
    }

    /// Tool name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Upper bound on the length of a result, in characters
    pub fn max_result_chars(&self) -> usize {
        self.max_result_chars
    }

    /// Invoke the adapter and cap the result.
    pub async fn invoke(&self, input: &str) -> ToolResult<String> {
        let result = self.source.invoke(input).await?;
        Ok(truncate_chars(&result, self.max_result_chars))
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("max_result_chars", &self.max_result_chars)
            .finish()
    }
}

/// Registry of available tools.
///
/// Built once at startup and shared read-only (behind an `Arc`) for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    tools: Vec<ToolSpec>,
}

impl SourceCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard catalog: web search, arXiv, Wikipedia.
    pub fn from_config(config: &SourcesConfig) -> ToolResult<Self> {
        let client = http_client()?;
        let mut catalog = Self::new();

        let web = WebSearch::new(client.clone(), &config.web_search);
        catalog.register(ToolSpec::new(Arc::new(web), config.web_search.max_chars));

        let arxiv = Arxiv::new(client.clone(), &config.arxiv);
        catalog.register(ToolSpec::new(
            Arc::new(arxiv),
            joined_cap(config.arxiv.top_k, config.arxiv.doc_chars),
        ));

        let wikipedia = Wikipedia::new(client, &config.wikipedia);
        catalog.register(ToolSpec::new(
            Arc::new(wikipedia),
            joined_cap(config.wikipedia.top_k, config.wikipedia.doc_chars),
        ));

        info!(tools = %catalog.names().join(", "), "Source catalog initialized");
        Ok(catalog)
    }

    /// Register a tool, replacing any tool already registered under its name.
    ///
    /// A replaced tool keeps its position. Returns the replaced spec.
    pub fn register(&mut self, spec: ToolSpec) -> Option<ToolSpec> {
        match self.tools.iter_mut().find(|t| t.name == spec.name) {
            Some(existing) => {
                debug!(tool = %spec.name, "Replacing registered tool");
                Some(std::mem::replace(existing, spec))
            }
            None => {
                self.tools.push(spec);
                None
            }
        }
    }

    /// All tools in registration order
    pub fn list(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Look up a tool by name. Exact matches win; otherwise the name is
    /// compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools
            .iter()
            .find(|t| t.name == name)
            .or_else(|| self.tools.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Cap for `top_k` documents of `doc_chars` each, joined by blank lines.
fn joined_cap(top_k: usize, doc_chars: usize) -> usize {
    top_k * doc_chars + 2 * top_k.saturating_sub(1)
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn http_client() -> ToolResult<Client> {
    Client::builder()
        .user_agent(concat!("research-agent/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ToolError::Http {
            tool: "catalog".to_string(),
            message: e.to_string(),
        })
}

/// GET a URL and return the body, mapping transport and status failures.
pub(crate) async fn fetch_text(
    client: &Client,
    tool: &str,
    url: &str,
    query: &[(&str, String)],
) -> ToolResult<String> {
    debug!(tool = %tool, url = %url, "Calling knowledge source");

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ToolError::Http {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| ToolError::InvalidResponse {
        tool: tool.to_string(),
        message: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(ToolError::Api {
            tool: tool.to_string(),
            status: status.as_u16(),
            message: truncate_chars(&body, 200),
        });
    }

    Ok(body)
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl KnowledgeSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "static test source"
        }

        async fn invoke(&self, _input: &str) -> ToolResult<String> {
            Ok(self.reply.to_string())
        }
    }

    fn spec(name: &'static str, reply: &'static str) -> ToolSpec {
        ToolSpec::new(Arc::new(StaticSource { name, reply }), 10)
    }

    #[test]
    fn test_register_preserves_order() {
        let mut catalog = SourceCatalog::new();
        catalog.register(spec("WebSearch", "a"));
        catalog.register(spec("arxiv", "b"));
        catalog.register(spec("wikipedia", "c"));
        assert_eq!(catalog.names(), vec!["WebSearch", "arxiv", "wikipedia"]);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_reregistration_replaces_in_place() {
        let mut catalog = SourceCatalog::new();
        catalog.register(spec("WebSearch", "old"));
        catalog.register(spec("arxiv", "b"));
        let replaced = catalog.register(spec("WebSearch", "new"));

        assert!(replaced.is_some());
        assert_eq!(catalog.names(), vec!["WebSearch", "arxiv"]);
        let result = catalog.get("WebSearch").unwrap().invoke("q").await.unwrap();
        assert_eq!(result, "new");
    }

    #[test]
    fn test_get_falls_back_to_case_insensitive() {
        let mut catalog = SourceCatalog::new();
        catalog.register(spec("wikipedia", "c"));
        assert!(catalog.get("wikipedia").is_some());
        assert!(catalog.get("Wikipedia").is_some());
        assert!(catalog.get("encyclopedia").is_none());
    }

    #[tokio::test]
    async fn test_invoke_caps_result_length() {
        let tool = spec("long", "0123456789abcdef");
        let result = tool.invoke("q").await.unwrap();
        assert_eq!(result, "0123456789");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_joined_cap() {
        assert_eq!(joined_cap(3, 500), 1504);
        assert_eq!(joined_cap(1, 500), 500);
        assert_eq!(joined_cap(0, 500), 0);
    }

    #[test]
    fn test_from_config_registers_three_tools() {
        let catalog = SourceCatalog::from_config(&SourcesConfig::default()).unwrap();
        assert_eq!(catalog.names(), vec!["WebSearch", "arxiv", "wikipedia"]);
        assert_eq!(catalog.get("WebSearch").unwrap().max_result_chars(), 1500);
    }

    #[test]
    fn test_squash_whitespace() {
        assert_eq!(squash_whitespace("  a\n  b\tc "), "a b c");
    }
}
