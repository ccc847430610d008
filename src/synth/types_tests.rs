//! Unit tests for completion service types.
//!
//! Covers message builders, wire serialization of chat requests and
//! deserialization of both full and streamed responses.

use super::*;

// Message tests
#[test]
fn test_message_system() {
    let msg = Message::system("You are a helpful assistant");
    assert_eq!(msg.role, MessageRole::System);
    assert_eq!(msg.content, "You are a helpful assistant");
}

#[test]
fn test_message_user_and_assistant() {
    assert_eq!(Message::user("Hello").role, MessageRole::User);
    assert_eq!(Message::assistant("Hi there!").role, MessageRole::Assistant);
}

#[test]
fn test_message_serialize_lowercase_role() {
    let json = serde_json::to_value(Message::system("Test")).unwrap();
    assert_eq!(json["role"], "system");
    assert_eq!(json["content"], "Test");
}

// CompletionRequest tests
#[test]
fn test_completion_request_with_stop() {
    let req = CompletionRequest::new(vec![Message::user("q")]).with_stop("\nObservation:");
    assert_eq!(req.messages.len(), 1);
    assert_eq!(req.stop, vec!["\nObservation:".to_string()]);
}

// ChatRequest tests
#[test]
fn test_chat_request_serialize() {
    let req = ChatRequest::new(
        "llama-3.1-8b-instant",
        0.1,
        CompletionRequest::new(vec![Message::user("Test")]).with_stop("STOP"),
    );
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["model"], "llama-3.1-8b-instant");
    assert_eq!(json["temperature"], 0.1);
    assert_eq!(json["stream"], false);
    assert_eq!(json["stop"][0], "STOP");
    assert_eq!(json["messages"][0]["role"], "user");
}

#[test]
fn test_chat_request_omits_empty_stop() {
    let req = ChatRequest::new("m", 0.1, CompletionRequest::new(vec![])).with_stream(true);
    let json = serde_json::to_value(&req).unwrap();
    assert!(json.get("stop").is_none());
    assert_eq!(json["stream"], true);
}

// ChatResponse tests
#[test]
fn test_chat_response_into_text() {
    let json = r#"{
        "model": "llama-3.1-8b-instant",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Final Answer: 42"}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    }"#;
    let resp: ChatResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.usage.as_ref().and_then(|u| u.total_tokens), Some(15));
    assert_eq!(resp.into_text(), Some("Final Answer: 42".to_string()));
}

#[test]
fn test_chat_response_without_choices() {
    let resp: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
    assert!(resp.into_text().is_none());
}

// Streaming tests
#[test]
fn test_stream_chunk_delta_text() {
    let json = r#"{"object": "chat.completion.chunk", "choices": [{"index": 0, "delta": {"content": "Hel"}}]}"#;
    let chunk: ChatStreamChunk = serde_json::from_str(json).unwrap();
    assert_eq!(chunk.delta_text(), Some("Hel".to_string()));
}

#[test]
fn test_stream_chunk_role_only_delta_is_skipped() {
    let json = r#"{"choices": [{"index": 0, "delta": {"role": "assistant"}}]}"#;
    let chunk: ChatStreamChunk = serde_json::from_str(json).unwrap();
    assert!(chunk.delta_text().is_none());
}

#[test]
fn test_stream_chunk_finish_without_delta() {
    let json = r#"{"choices": [{"index": 0, "finish_reason": "stop"}]}"#;
    let chunk: ChatStreamChunk = serde_json::from_str(json).unwrap();
    assert!(chunk.delta_text().is_none());
}
