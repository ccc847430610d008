use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Default completion service endpoint (OpenAI-compatible)
pub const DEFAULT_SYNTH_BASE_URL: &str = "https://api.groq.com/openai";
/// Default model identifier
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
/// Default arXiv export API endpoint
pub const DEFAULT_ARXIV_BASE_URL: &str = "https://export.arxiv.org";
/// Default Wikipedia endpoint
pub const DEFAULT_WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";
/// Default DuckDuckGo endpoint
pub const DEFAULT_WEB_SEARCH_BASE_URL: &str = "https://api.duckduckgo.com";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub synth: SynthConfig,
    pub request: RequestConfig,
    pub agent: AgentConfig,
    pub sources: SourcesConfig,
    pub logging: LoggingConfig,
}

/// Completion service configuration
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub streaming: bool,
}

/// HTTP request configuration for the completion service
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Reasoning loop configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub tool_timeout_ms: u64,
    pub synth_timeout_ms: u64,
}

/// Caps and endpoints for a document-returning adapter
#[derive(Debug, Clone)]
pub struct DocumentSourceConfig {
    pub base_url: String,
    pub top_k: usize,
    pub doc_chars: usize,
}

/// Web search adapter configuration
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    pub base_url: String,
    pub max_chars: usize,
}

/// Knowledge-source adapter configuration
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub arxiv: DocumentSourceConfig,
    pub wikipedia: DocumentSourceConfig,
    pub web_search: WebSearchConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_key = env::var("GROQ_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config {
                message: "GROQ_API_KEY is required".to_string(),
            })?;

        let temperature: f64 = parse_var("TEMPERATURE", 0.1)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Config {
                message: format!("TEMPERATURE must be between 0.0 and 2.0, got {}", temperature),
            });
        }

        let synth = SynthConfig {
            api_key,
            base_url: env::var("SYNTH_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SYNTH_BASE_URL.to_string()),
            model: env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature,
            streaming: parse_bool_var("STREAMING", true)?,
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS", 30000)?,
            max_retries: parse_var("MAX_RETRIES", 2)?,
            retry_delay_ms: parse_var("RETRY_DELAY_MS", 500)?,
        };

        let agent = AgentConfig {
            max_steps: parse_var("MAX_STEPS", 5)?,
            tool_timeout_ms: parse_var("TOOL_TIMEOUT_MS", 15000)?,
            synth_timeout_ms: parse_var("SYNTH_TIMEOUT_MS", 90000)?,
        };
        if agent.max_steps == 0 {
            return Err(AppError::Config {
                message: "MAX_STEPS must be at least 1".to_string(),
            });
        }

        let sources = SourcesConfig {
            arxiv: DocumentSourceConfig {
                base_url: env::var("ARXIV_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_ARXIV_BASE_URL.to_string()),
                top_k: parse_var("ARXIV_TOP_K", 3)?,
                doc_chars: parse_var("ARXIV_DOC_CHARS", 500)?,
            },
            wikipedia: DocumentSourceConfig {
                base_url: env::var("WIKIPEDIA_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_WIKIPEDIA_BASE_URL.to_string()),
                top_k: parse_var("WIKIPEDIA_TOP_K", 3)?,
                doc_chars: parse_var("WIKIPEDIA_DOC_CHARS", 500)?,
            },
            web_search: WebSearchConfig {
                base_url: env::var("WEB_SEARCH_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_WEB_SEARCH_BASE_URL.to_string()),
                max_chars: parse_var("WEB_SEARCH_MAX_CHARS", 1500)?,
            },
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            synth,
            request,
            agent,
            sources,
            logging,
        })
    }
}

/// Read an optional variable, rejecting values that do not parse.
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| AppError::Config {
            message: format!("{} has an invalid value: '{}'", name, raw),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool_var(name: &str, default: bool) -> Result<bool, AppError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config {
                message: format!("{} must be a boolean, got '{}'", name, raw),
            }),
        },
        Err(_) => Ok(default),
    }
}

impl SynthConfig {
    /// Configuration for the default endpoint and model with the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_SYNTH_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            streaming: true,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            tool_timeout_ms: 15000,
            synth_timeout_ms: 90000,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            arxiv: DocumentSourceConfig {
                base_url: DEFAULT_ARXIV_BASE_URL.to_string(),
                top_k: 3,
                doc_chars: 500,
            },
            wikipedia: DocumentSourceConfig {
                base_url: DEFAULT_WIKIPEDIA_BASE_URL.to_string(),
                top_k: 3,
                doc_chars: 500,
            },
            web_search: WebSearchConfig {
                base_url: DEFAULT_WEB_SEARCH_BASE_URL.to_string(),
                max_chars: 1500,
            },
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
