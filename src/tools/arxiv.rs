use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::info;

use super::{fetch_text, squash_whitespace, truncate_chars, KnowledgeSource};
use crate::config::DocumentSourceConfig;
use crate::error::{ToolError, ToolResult};

const NO_RESULT: &str = "No good Arxiv Result was found";

/// arXiv paper search over the Atom export API
#[derive(Debug, Clone)]
pub struct Arxiv {
    client: Client,
    base_url: String,
    top_k: usize,
    doc_chars: usize,
}

/// A paper entry from an Atom feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArxivEntry {
    pub url: String,
    pub published: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

impl Arxiv {
    /// Create an adapter from its caps and endpoint
    pub fn new(client: Client, config: &DocumentSourceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            top_k: config.top_k,
            doc_chars: config.doc_chars,
        }
    }
}

#[async_trait]
impl KnowledgeSource for Arxiv {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "Search scientific papers on arXiv.org (physics, mathematics, computer science, \
         quantitative biology and finance, statistics). Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> ToolResult<String> {
        let url = format!("{}/api/query", self.base_url);
        let query = [
            ("search_query", format!("all:{}", input.trim())),
            ("start", "0".to_string()),
            ("max_results", self.top_k.to_string()),
        ];
        let feed = fetch_text(&self.client, self.name(), &url, &query).await?;

        let entries = parse_feed(&feed).map_err(|e| ToolError::InvalidResponse {
            tool: self.name().to_string(),
            message: e.to_string(),
        })?;
        info!(tool = "arxiv", results = entries.len(), "arXiv search completed");

        if entries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(entries
            .iter()
            .take(self.top_k)
            .map(|entry| truncate_chars(&entry.render(), self.doc_chars))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

impl ArxivEntry {
    fn render(&self) -> String {
        format!(
            "Published: {}\nTitle: {}\nURL: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.url,
            self.authors.join(", "),
            self.summary
        )
    }
}

/// Entry child whose text is being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Published,
    Title,
    Summary,
    AuthorName,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Field::Id),
            b"published" => Some(Field::Published),
            b"title" => Some(Field::Title),
            b"summary" => Some(Field::Summary),
            b"name" => Some(Field::AuthorName),
            _ => None,
        }
    }
}

impl ArxivEntry {
    fn set(&mut self, field: Field, text: &str) {
        match field {
            Field::Id => self.url = text.trim().to_string(),
            Field::Published => self.published = text.trim().chars().take(10).collect(),
            Field::Title => self.title = squash_whitespace(text),
            Field::Summary => self.summary = squash_whitespace(text),
            Field::AuthorName => self.authors.push(squash_whitespace(text)),
        }
    }
}

/// Parse the `<entry>` elements of an arXiv Atom feed.
///
/// Entries without a title are skipped. Elements outside `<entry>` (the
/// feed's own title, for instance) are ignored.
pub fn parse_feed(feed: &str) -> Result<Vec<ArxivEntry>, quick_xml::Error> {
    let mut reader = Reader::from_str(feed);
    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"entry" => {
                current = Some(ArxivEntry::default());
            }
            Event::Start(e) if current.is_some() => {
                field = Field::from_tag(e.local_name().as_ref());
                text.clear();
            }
            Event::Text(t) if field.is_some() => text.push_str(&t.unescape()?),
            Event::CData(c) if field.is_some() => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if e.local_name().as_ref() == b"entry" => {
                if let Some(entry) = current.take().filter(|entry| !entry.title.is_empty()) {
                    entries.push(entry);
                }
                field = None;
            }
            Event::End(e) => {
                let closed = Field::from_tag(e.local_name().as_ref());
                if let (Some(entry), Some(open)) = (current.as_mut(), field) {
                    if closed == Some(open) {
                        entry.set(open, &text);
                        field = None;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}
