use serde_json::Value;

use crate::core::error::ChatError;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Both counts are required; `total_tokens` is kept only when it reads cleanly.
    fn from_value(usage: &Value) -> Option<Self> {
        Some(Self {
            prompt_tokens: token_count(usage.get("prompt_tokens")?)?,
            completion_tokens: token_count(usage.get("completion_tokens")?)?,
            total_tokens: usage.get("total_tokens").and_then(token_count),
        })
    }
}

/// Some providers serialize counts as floats (`12.0`).
fn token_count(value: &Value) -> Option<u64> {
    if let Some(count) = value.as_u64() {
        return Some(count);
    }
    let count = value.as_f64()?;
    (count.is_finite() && count >= 0.0 && count.fract() == 0.0 && count <= u64::MAX as f64)
        .then_some(count as u64)
}

/// Events produced while streaming a completion, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental content. May be empty.
    Delta(String),
    Usage(Usage),
    /// The model that actually served the request.
    ModelId(String),
    GenerationId(String),
    /// Non-empty completion reason such as `stop` or `length`.
    FinishReason(String),
    /// Error reported inline by the server. Does not end the stream by itself.
    Error(ChatError),
    Done,
}

/// Translate one SSE `data:` payload into events.
///
/// Never fails: payloads that are not JSON objects (keepalives, partial
/// frames) produce no events, and each field is read independently so a
/// malformed field drops only its own event. Events from a single payload
/// always come out as generation id, finish reason, delta, usage, model id,
/// then any error.
pub fn parse_sse_payload(payload: &str) -> Vec<StreamEvent> {
    if payload == DONE_SENTINEL {
        return vec![StreamEvent::Done];
    }

    let Ok(Value::Object(chunk)) = serde_json::from_str::<Value>(payload) else {
        return Vec::new();
    };

    let mut events = Vec::new();

    if let Some(id) = chunk.get("id").and_then(Value::as_str) {
        events.push(StreamEvent::GenerationId(id.to_string()));
    }

    let choice = chunk
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first());
    if let Some(choice) = choice {
        if let Some(reason) = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .filter(|reason| !reason.is_empty())
        {
            events.push(StreamEvent::FinishReason(reason.to_string()));
        }

        let content = content_of(choice, "delta").or_else(|| content_of(choice, "message"));
        if let Some(content) = content {
            events.push(StreamEvent::Delta(content.to_string()));
        }
    }

    if let Some(usage) = chunk.get("usage").and_then(Usage::from_value) {
        events.push(StreamEvent::Usage(usage));
    }

    if let Some(model) = chunk.get("model").and_then(Value::as_str) {
        events.push(StreamEvent::ModelId(model.to_string()));
    }

    if let Some(message) = chunk.get("error").and_then(inline_error_message) {
        events.push(StreamEvent::Error(ChatError::Streaming(message)));
    }

    events
}

fn content_of<'a>(choice: &'a Value, key: &str) -> Option<&'a str> {
    choice.get(key)?.get("content")?.as_str()
}

fn inline_error_message(error: &Value) -> Option<String> {
    let message = match error {
        Value::String(text) => text.as_str(),
        other => other.get("message")?.as_str()?,
    };
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::Delta(text.to_string())
    }

    #[test]
    fn done_sentinel_yields_done_only() {
        assert_eq!(parse_sse_payload("[DONE]"), vec![StreamEvent::Done]);
    }

    #[test]
    fn invalid_json_yields_nothing() {
        for payload in [
            "",
            " ",
            "{",
            r#"{"bad"#,
            "not json",
            "[DONE",
            "42",
            "null",
            r#"{"choices":"nope"}"#,
        ] {
            assert!(parse_sse_payload(payload).is_empty(), "{payload:?}");
        }
    }

    #[test]
    fn delta_then_model() {
        assert_eq!(
            parse_sse_payload(r#"{"choices":[{"delta":{"content":"Hel"}}],"model":"m"}"#),
            vec![delta("Hel"), StreamEvent::ModelId("m".to_string())]
        );
    }

    #[test]
    fn empty_delta_is_emitted_after_finish_reason() {
        assert_eq!(
            parse_sse_payload(r#"{"choices":[{"delta":{"content":""},"finish_reason":"length"}]}"#),
            vec![StreamEvent::FinishReason("length".to_string()), delta("")]
        );
    }

    #[test]
    fn empty_finish_reason_is_suppressed() {
        assert_eq!(
            parse_sse_payload(r#"{"choices":[{"delta":{"content":"x"},"finish_reason":""}]}"#),
            vec![delta("x")]
        );
        assert_eq!(
            parse_sse_payload(r#"{"choices":[{"delta":{"content":"x"},"finish_reason":null}]}"#),
            vec![delta("x")]
        );
    }

    #[test]
    fn full_message_content_is_a_delta_fallback() {
        assert_eq!(
            parse_sse_payload(r#"{"choices":[{"message":{"role":"assistant","content":"whole"}}]}"#),
            vec![delta("whole")]
        );
        assert_eq!(
            parse_sse_payload(
                r#"{"choices":[{"delta":{"content":"d"},"message":{"content":"m"}}]}"#
            ),
            vec![delta("d")]
        );
        assert_eq!(
            parse_sse_payload(
                r#"{"choices":[{"delta":{"role":"assistant"},"message":{"content":"m"}}]}"#
            ),
            vec![delta("m")]
        );
    }

    #[test]
    fn only_first_choice_is_read() {
        assert_eq!(
            parse_sse_payload(
                r#"{"choices":[{"delta":{"content":"a"}},{"delta":{"content":"b"}}]}"#
            ),
            vec![delta("a")]
        );
    }

    #[test]
    fn all_parts_in_fixed_order() {
        let payload = r#"{
            "model": "openai/gpt-4o",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
            "choices": [{"delta": {"content": "!"}, "finish_reason": "stop"}],
            "id": "gen-123"
        }"#;
        assert_eq!(
            parse_sse_payload(payload),
            vec![
                StreamEvent::GenerationId("gen-123".to_string()),
                StreamEvent::FinishReason("stop".to_string()),
                delta("!"),
                StreamEvent::Usage(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: Some(15),
                }),
                StreamEvent::ModelId("openai/gpt-4o".to_string()),
            ]
        );
    }

    #[test]
    fn usage_requires_prompt_and_completion_counts() {
        assert_eq!(
            parse_sse_payload(r#"{"usage":{"prompt_tokens":4,"completion_tokens":6}}"#),
            vec![StreamEvent::Usage(Usage {
                prompt_tokens: 4,
                completion_tokens: 6,
                total_tokens: None,
            })]
        );
        assert!(parse_sse_payload(r#"{"usage":{"prompt_tokens":4}}"#).is_empty());
        assert!(parse_sse_payload(r#"{"usage":null}"#).is_empty());
    }

    #[test]
    fn float_token_counts_are_accepted() {
        assert_eq!(
            parse_sse_payload(
                r#"{"choices":[{"delta":{"content":"hi"}}],"usage":{"prompt_tokens":4.0,"completion_tokens":6.0,"total_tokens":10.0}}"#
            ),
            vec![
                delta("hi"),
                StreamEvent::Usage(Usage {
                    prompt_tokens: 4,
                    completion_tokens: 6,
                    total_tokens: Some(10),
                }),
            ]
        );
        assert!(parse_sse_payload(r#"{"usage":{"prompt_tokens":4.5,"completion_tokens":6}}"#).is_empty());
        assert!(parse_sse_payload(r#"{"usage":{"prompt_tokens":-4,"completion_tokens":6}}"#).is_empty());
    }

    #[test]
    fn malformed_field_drops_only_its_own_event() {
        assert_eq!(
            parse_sse_payload(r#"{"id":12345,"choices":[{"delta":{"content":"Hel"}}],"model":"m"}"#),
            vec![delta("Hel"), StreamEvent::ModelId("m".to_string())]
        );

        assert_eq!(
            parse_sse_payload(
                r#"{"choices":null,"usage":{"prompt_tokens":4,"completion_tokens":6},"model":"m"}"#
            ),
            vec![
                StreamEvent::Usage(Usage {
                    prompt_tokens: 4,
                    completion_tokens: 6,
                    total_tokens: None,
                }),
                StreamEvent::ModelId("m".to_string()),
            ]
        );

        assert_eq!(
            parse_sse_payload(
                r#"{"id":"g","choices":[{"delta":{"content":"x"},"finish_reason":7}],"usage":"lots","model":["m"]}"#
            ),
            vec![StreamEvent::GenerationId("g".to_string()), delta("x")]
        );

        assert_eq!(
            parse_sse_payload(
                r#"{"choices":[{"delta":"oops","message":{"content":"whole"}}],"usage":{"prompt_tokens":1,"completion_tokens":2,"total_tokens":"3"}}"#
            ),
            vec![
                delta("whole"),
                StreamEvent::Usage(Usage {
                    prompt_tokens: 1,
                    completion_tokens: 2,
                    total_tokens: None,
                }),
            ]
        );
    }

    #[test]
    fn blank_error_message_is_noise() {
        assert!(parse_sse_payload(r#"{"error":{"message":"   "}}"#).is_empty());
        assert!(parse_sse_payload(r#"{"error":{"code":500}}"#).is_empty());
    }

    #[test]
    fn inline_error_is_emitted() {
        assert_eq!(
            parse_sse_payload(r#"{"error":{"message":"Model is overloaded"}}"#),
            vec![StreamEvent::Error(ChatError::Streaming(
                "Model is overloaded".to_string()
            ))]
        );
    }

    #[test]
    fn deltas_reconstruct_the_message() {
        let payloads = [
            r#"{"id":"g","choices":[{"delta":{"role":"assistant","content":""}}]}"#,
            r#"{"id":"g","choices":[{"delta":{"content":"The "}}]}"#,
            ": keepalive",
            r#"{"id":"g","choices":[{"delta":{"content":"quick "}}]}"#,
            r#"{"id":"g","choices":[{"delta":{"content":"brown fox"}}]}"#,
            r#"{"id":"g","choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ];

        let text: String = payloads
            .iter()
            .flat_map(|payload| parse_sse_payload(payload))
            .filter_map(|event| match event {
                StreamEvent::Delta(text) => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(text, "The quick brown fox");
    }
}
