use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{fetch_text, truncate_chars, KnowledgeSource};
use crate::config::WebSearchConfig;
use crate::error::{ToolError, ToolResult};

const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

/// DuckDuckGo instant-answer search
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: Client,
    base_url: String,
    max_chars: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(default)]
    answer: serde_json::Value,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a leaf topic or a named group of topics
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Leaf {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl WebSearch {
    /// Create an adapter from its cap and endpoint
    pub fn new(client: Client, config: &WebSearchConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_chars: config.max_chars,
        }
    }
}

#[async_trait]
impl KnowledgeSource for WebSearch {
    fn name(&self) -> &str {
        "WebSearch"
    }

    fn description(&self) -> &str {
        "Search the web for current events and general information. \
         Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> ToolResult<String> {
        let url = format!("{}/", self.base_url);
        let query = [
            ("q", input.trim().to_string()),
            ("format", "json".to_string()),
            ("no_html", "1".to_string()),
            ("skip_disambig", "1".to_string()),
        ];
        // The endpoint labels its JSON as javascript, so decode the text body.
        let body = fetch_text(&self.client, self.name(), &url, &query).await?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| ToolError::InvalidResponse {
                tool: self.name().to_string(),
                message: e.to_string(),
            })?;

        let snippets = answer.snippets();
        info!(tool = "WebSearch", results = snippets.len(), "Web search completed");

        if snippets.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(truncate_chars(&snippets.join("\n"), self.max_chars))
    }
}

impl InstantAnswer {
    fn snippets(&self) -> Vec<String> {
        let mut snippets = Vec::new();

        // Answer is usually a string but some instant answers return an object.
        if let Some(answer) = self.answer.as_str().filter(|a| !a.trim().is_empty()) {
            snippets.push(answer.trim().to_string());
        }
        if !self.abstract_text.trim().is_empty() {
            snippets.push(with_url(
                &format!("{}: {}", self.heading, self.abstract_text.trim()),
                &self.abstract_url,
            ));
        }

        let mut pending: Vec<&RelatedTopic> = self.related_topics.iter().rev().collect();
        while let Some(topic) = pending.pop() {
            match topic {
                RelatedTopic::Leaf { text, first_url } if !text.trim().is_empty() => {
                    snippets.push(with_url(text.trim(), first_url));
                }
                RelatedTopic::Leaf { .. } => {}
                RelatedTopic::Group { topics } => pending.extend(topics.iter().rev()),
            }
        }

        snippets
    }
}

fn with_url(text: &str, url: &str) -> String {
    if url.is_empty() {
        text.to_string()
    } else {
        format!("{} ({})", text, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippets_flatten_groups_in_order() {
        let json = r#"{
            "Heading": "Rust",
            "AbstractText": "Rust is a language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "Answer": "",
            "RelatedTopics": [
                {"Text": "Cargo - package manager", "FirstURL": "https://duckduckgo.com/Cargo"},
                {"Name": "Tools", "Topics": [
                    {"Text": "rustup", "FirstURL": "https://duckduckgo.com/rustup"}
                ]},
                {"Text": "Clippy", "FirstURL": ""}
            ]
        }"#;
        let answer: InstantAnswer = serde_json::from_str(json).unwrap();
        assert_eq!(
            answer.snippets(),
            vec![
                "Rust: Rust is a language. (https://en.wikipedia.org/wiki/Rust)".to_string(),
                "Cargo - package manager (https://duckduckgo.com/Cargo)".to_string(),
                "rustup (https://duckduckgo.com/rustup)".to_string(),
                "Clippy".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_answer_has_no_snippets() {
        let answer: InstantAnswer = serde_json::from_str("{}").unwrap();
        assert!(answer.snippets().is_empty());
    }
}
