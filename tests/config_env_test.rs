//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy, so every test sets the variables it depends on explicitly.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use research_agent::config::{Config, LogFormat};
use research_agent::error::AppError;
use serial_test::serial;
use std::env;

const OVERRIDES: &[&str] = &[
    "SYNTH_BASE_URL",
    "MODEL_NAME",
    "TEMPERATURE",
    "STREAMING",
    "MAX_STEPS",
    "TOOL_TIMEOUT_MS",
    "ARXIV_TOP_K",
    "WIKIPEDIA_DOC_CHARS",
    "WEB_SEARCH_MAX_CHARS",
    "LOG_FORMAT",
];

fn reset_env() {
    env::set_var("GROQ_API_KEY", "test-key");
    for name in OVERRIDES {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_config_from_env_defaults() {
    reset_env();

    let config = Config::from_env().unwrap();
    assert_eq!(config.synth.api_key, "test-key");
    assert_eq!(config.synth.base_url, "https://api.groq.com/openai");
    assert_eq!(config.synth.model, "llama-3.1-8b-instant");
    assert_eq!(config.synth.temperature, 0.1);
    assert!(config.synth.streaming);
    assert_eq!(config.agent.max_steps, 5);
    assert_eq!(config.sources.arxiv.top_k, 3);
    assert_eq!(config.sources.wikipedia.doc_chars, 500);
}

#[test]
#[serial]
fn test_config_from_env_missing_api_key() {
    reset_env();
    env::set_var("GROQ_API_KEY", "  ");

    let result = Config::from_env();
    assert!(matches!(result, Err(AppError::Config { .. })));

    reset_env();
}

#[test]
#[serial]
fn test_config_from_env_overrides() {
    reset_env();
    env::set_var("SYNTH_BASE_URL", "http://localhost:9999");
    env::set_var("MODEL_NAME", "llama-3.3-70b-versatile");
    env::set_var("STREAMING", "false");
    env::set_var("MAX_STEPS", "8");
    env::set_var("TOOL_TIMEOUT_MS", "2500");
    env::set_var("ARXIV_TOP_K", "5");
    env::set_var("WIKIPEDIA_DOC_CHARS", "800");
    env::set_var("WEB_SEARCH_MAX_CHARS", "2000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.synth.base_url, "http://localhost:9999");
    assert_eq!(config.synth.model, "llama-3.3-70b-versatile");
    assert!(!config.synth.streaming);
    assert_eq!(config.agent.max_steps, 8);
    assert_eq!(config.agent.tool_timeout_ms, 2500);
    assert_eq!(config.sources.arxiv.top_k, 5);
    assert_eq!(config.sources.wikipedia.doc_chars, 800);
    assert_eq!(config.sources.web_search.max_chars, 2000);

    reset_env();
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    reset_env();
    env::set_var("LOG_FORMAT", "JSON");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    reset_env();
}

#[test]
#[serial]
fn test_config_from_env_rejects_malformed_number() {
    reset_env();
    env::set_var("MAX_STEPS", "five");

    match Config::from_env() {
        Err(AppError::Config { message }) => assert!(message.contains("MAX_STEPS")),
        other => panic!("expected Config error, got {:?}", other.map(|_| ())),
    }

    reset_env();
}

#[test]
#[serial]
fn test_config_from_env_rejects_zero_steps() {
    reset_env();
    env::set_var("MAX_STEPS", "0");

    assert!(matches!(Config::from_env(), Err(AppError::Config { .. })));

    reset_env();
}

#[test]
#[serial]
fn test_config_from_env_rejects_out_of_range_temperature() {
    reset_env();
    env::set_var("TEMPERATURE", "3.5");

    assert!(matches!(Config::from_env(), Err(AppError::Config { .. })));

    reset_env();
}

#[test]
#[serial]
fn test_config_from_env_rejects_bad_boolean() {
    reset_env();
    env::set_var("STREAMING", "maybe");

    assert!(matches!(Config::from_env(), Err(AppError::Config { .. })));

    reset_env();
}
