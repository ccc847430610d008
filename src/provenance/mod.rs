//! Post-hoc source attribution for synthesized answers.
//!
//! [`extract`] scans an answer for URLs, classifies each by where it points
//! and adds keyword-triggered hints for answers that talk about papers or
//! Wikipedia without linking them.
//!
//! The keyword hints are approximate: they name a repository home page, not
//! a document the answer actually cited. They trade precision for recall and
//! should be presented as such.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[a-zA-Z0-9]|[$-_@.&+]|[!*(),]|%[0-9a-fA-F]{2})+").ok()
});

/// Words that suggest academic content.
pub const ACADEMIC_KEYWORDS: [&str; 4] = ["arxiv", "paper", "research", "study"];

/// Words that suggest encyclopedia content.
pub const ENCYCLOPEDIA_KEYWORDS: [&str; 2] = ["wikipedia", "wiki"];

/// Trailing characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '>', ']', '*'];

/// What kind of source a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Academic,
    Encyclopedia,
    Research,
    Web,
}

impl SourceKind {
    /// Classify a URL. Checked in order: arxiv.org, wikipedia.org, doi.org.
    pub fn classify(url: &str) -> Self {
        if url.contains("arxiv.org") {
            SourceKind::Academic
        } else if url.contains("wikipedia.org") {
            SourceKind::Encyclopedia
        } else if url.contains("doi.org") {
            SourceKind::Research
        } else {
            SourceKind::Web
        }
    }

    /// Display title used for linked sources of this kind
    pub fn title(&self) -> &'static str {
        match self {
            SourceKind::Academic => "arXiv Academic Paper",
            SourceKind::Encyclopedia => "Wikipedia Article",
            SourceKind::Research => "Research Paper",
            SourceKind::Web => "Web Source",
        }
    }

    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Academic => "academic",
            SourceKind::Encyclopedia => "encyclopedia",
            SourceKind::Research => "research",
            SourceKind::Web => "web",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source attributed to an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

impl Source {
    /// Create a source linked from the answer text
    pub fn linked(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = SourceKind::classify(&url);
        Self {
            title: kind.title().to_string(),
            url,
            kind,
        }
    }

    /// Generic arXiv hint
    pub fn arxiv_repository() -> Self {
        Self {
            title: "arXiv Repository".to_string(),
            url: "https://arxiv.org".to_string(),
            kind: SourceKind::Academic,
        }
    }

    /// Generic Wikipedia hint
    pub fn wikipedia_home() -> Self {
        Self {
            title: "Wikipedia".to_string(),
            url: "https://wikipedia.org".to_string(),
            kind: SourceKind::Encyclopedia,
        }
    }
}

/// A synthesized answer and its sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
    pub sources: Vec<Source>,
}

impl AnswerResult {
    /// Attribute sources to an answer
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let sources = extract(&text);
        Self { text, sources }
    }

    /// An answer with no sources, such as a failure notice
    pub fn unattributed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Recover the sources an answer refers to.
///
/// Pure and deterministic. Linked sources come first, unique by URL in order
/// of first appearance, followed by at most one academic and one
/// encyclopedia hint.
pub fn extract(text: &str) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    let mut seen = HashSet::new();

    for url in find_urls(text) {
        if seen.insert(url) {
            sources.push(Source::linked(url));
        }
    }

    let lowered = text.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));
    let has_kind = |sources: &[Source], kind: SourceKind| sources.iter().any(|s| s.kind == kind);

    if mentions(&ACADEMIC_KEYWORDS) && !has_kind(&sources, SourceKind::Academic) {
        sources.push(Source::arxiv_repository());
    }
    if mentions(&ENCYCLOPEDIA_KEYWORDS) && !has_kind(&sources, SourceKind::Encyclopedia) {
        sources.push(Source::wikipedia_home());
    }

    sources
}

/// URL-shaped substrings in order of appearance.
fn find_urls(text: &str) -> Vec<&str> {
    let Some(pattern) = URL_PATTERN.as_ref() else {
        return Vec::new();
    };

    pattern
        .find_iter(text)
        .map(|m| trim_url(m.as_str()))
        .filter(|url| url.split_once("://").is_some_and(|(_, rest)| !rest.is_empty()))
        .collect()
}

/// Strip sentence punctuation and an unbalanced closing parenthesis.
fn trim_url(url: &str) -> &str {
    let mut url = url;
    loop {
        let trimmed = url.trim_end_matches(TRAILING_PUNCTUATION);
        let trimmed = if trimmed.ends_with(')')
            && trimmed.matches(')').count() > trimmed.matches('(').count()
        {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_arxiv_link() {
        let sources = extract("See https://arxiv.org/abs/1234 for details");
        assert_eq!(
            sources,
            vec![Source {
                title: "arXiv Academic Paper".to_string(),
                url: "https://arxiv.org/abs/1234".to_string(),
                kind: SourceKind::Academic,
            }]
        );
    }

    #[test]
    fn test_keyword_only_answer_gets_repository_hint() {
        let sources = extract("No links here, just a research study summary");
        assert_eq!(
            sources,
            vec![Source {
                title: "arXiv Repository".to_string(),
                url: "https://arxiv.org".to_string(),
                kind: SourceKind::Academic,
            }]
        );
    }

    #[test]
    fn test_empty_text_has_no_sources() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_arxiv_takes_precedence_over_doi() {
        let sources = extract("https://arxiv.org/abs/10.1000/doi.org.mirror");
        assert_eq!(sources[0].kind, SourceKind::Academic);
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(SourceKind::classify("https://en.wikipedia.org/wiki/Rust"), SourceKind::Encyclopedia);
        assert_eq!(SourceKind::classify("https://doi.org/10.1000/182"), SourceKind::Research);
        assert_eq!(SourceKind::classify("https://www.rust-lang.org"), SourceKind::Web);
        assert_eq!(
            SourceKind::classify("https://wikipedia.org/wiki/Doi.org"),
            SourceKind::Encyclopedia
        );
    }

    #[test]
    fn test_duplicate_urls_keep_first_position() {
        let text = "A https://example.com/a then https://doi.org/10.1/x and https://example.com/a again";
        let urls: Vec<_> = extract(text).into_iter().map(|s| s.url).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://doi.org/10.1/x"]);
    }

    #[test]
    fn test_sentence_punctuation_is_not_part_of_url() {
        let sources = extract("Read https://example.com/page. Also (https://example.com/other).");
        let urls: Vec<_> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/page", "https://example.com/other"]);
    }

    #[test]
    fn test_balanced_parentheses_are_kept() {
        let sources = extract("https://en.wikipedia.org/wiki/Rust_(programming_language)");
        assert_eq!(
            sources[0].url,
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
    }

    #[test]
    fn test_markdown_link_url() {
        let sources = extract("[paper](https://arxiv.org/abs/1706.03762)");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://arxiv.org/abs/1706.03762");
    }

    #[test]
    fn test_percent_escapes_and_query_strings() {
        let sources = extract("https://example.com/search?q=rust%20lang&page=2 is useful");
        assert_eq!(sources[0].url, "https://example.com/search?q=rust%20lang&page=2");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let sources = extract("This PAPER shows");
        assert_eq!(sources, vec![Source::arxiv_repository()]);
    }

    #[test]
    fn test_academic_hint_skipped_when_academic_link_present() {
        let sources = extract("This paper https://arxiv.org/abs/1 is a study");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "arXiv Academic Paper");
    }

    #[test]
    fn test_academic_hint_added_when_only_doi_link_present() {
        let sources = extract("The paper at https://doi.org/10.1/x");
        assert_eq!(
            sources,
            vec![Source::linked("https://doi.org/10.1/x"), Source::arxiv_repository()]
        );
    }

    #[test]
    fn test_hint_fires_once() {
        let sources = extract("paper paper research study arxiv research");
        let hints = sources
            .iter()
            .filter(|s| s.url == "https://arxiv.org")
            .count();
        assert_eq!(hints, 1);
    }

    #[test]
    fn test_encyclopedia_hint() {
        let sources = extract("According to Wikipedia, Rust is fast.");
        assert_eq!(sources, vec![Source::wikipedia_home()]);

        let sources = extract("See https://en.wikipedia.org/wiki/Rust on the wiki");
        assert_eq!(sources, vec![Source::linked("https://en.wikipedia.org/wiki/Rust")]);
    }

    #[test]
    fn test_no_keywords_no_links() {
        assert!(extract("Rust is a systems programming language.").is_empty());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "wiki https://b.org https://arxiv.org/x https://b.org research";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_source_serializes_kind_as_type() {
        let json = serde_json::to_value(Source::linked("https://doi.org/1")).unwrap();
        assert_eq!(json["type"], "research");
        assert_eq!(json["title"], "Research Paper");
    }

    #[test]
    fn test_answer_result_from_text() {
        let answer = AnswerResult::from_text("See https://arxiv.org/abs/1234");
        assert_eq!(answer.text, "See https://arxiv.org/abs/1234");
        assert_eq!(answer.sources.len(), 1);
    }
}
