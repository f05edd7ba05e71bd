use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::types::LlmClient;
use super::AiError;

/// Finish reasons that mean the provider withheld the answer.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Google Generative Language (Gemini) REST client.
pub struct GeminiClient {
    base_url: String,
    api_key: Zeroizing<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, AiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AiError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: Zeroizing::new(api_key.to_string()),
            client,
            timeout_secs,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, model
        )
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn user_prompt(prompt: &'a str) -> Self {
        Self {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Pull the answer out of a `generateContent` response body.
fn extract_text(body: &str) -> Result<String, AiError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| AiError::ResponseParsing(e.to_string()))?;

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AiError::Blocked(reason));
    }

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or(AiError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return match candidate.finish_reason {
            Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
                Err(AiError::Blocked(reason))
            }
            _ => Err(AiError::EmptyResponse),
        };
    }
    Ok(text)
}

impl LlmClient for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AiError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::user_prompt(prompt))
            .send()
            .map_err(|e| {
                // Never let the key-bearing URL reach logs
                if e.is_connect() {
                    AiError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    AiError::Timeout(self.timeout_secs)
                } else {
                    AiError::HttpClient(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AiError::ResponseParsing(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        extract_text(&body)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(GenerateContentRequest::user_prompt("hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("https://example.test/", "k", 5).unwrap();
        assert_eq!(
            client.endpoint("gemini-1.5-flash"),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn extracts_candidate_text() {
        let body = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Part one. "}, {"text": "Part two."}]}, "finishReason": "STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Part one. Part two.");
    }

    #[test]
    fn prompt_block_is_blocked() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(matches!(extract_text(body), Err(AiError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn safety_finish_without_text_is_blocked() {
        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert!(matches!(extract_text(body), Err(AiError::Blocked(_))));
    }

    #[test]
    fn no_candidates_is_empty() {
        assert!(matches!(extract_text("{}"), Err(AiError::EmptyResponse)));
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}, "finishReason": "STOP"}]}"#;
        assert!(matches!(extract_text(body), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(
            extract_text("not json"),
            Err(AiError::ResponseParsing(_))
        ));
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn unreachable_host_is_connection_error() {
        let client = GeminiClient::new("http://127.0.0.1:1", "secret-key", 2).unwrap();
        let err = client.generate("gemini-1.5-flash", "hi").unwrap_err();
        assert!(matches!(err, AiError::Connection(_)));
        assert!(!err.to_string().contains("secret-key"));
    }

    // ── Against a local HTTP server ─────────────────────────

    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::ai::ModelFallback;
    use crate::test_http::StubServer;

    fn answer(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]})
    }

    #[tokio::test]
    async fn posts_prompt_with_key_in_query() {
        let stub = StubServer::start(vec![(StatusCode::OK, answer("Committee view"))]).await;
        let base = stub.base_url.clone();
        let text = tokio::task::spawn_blocking(move || {
            let client = GeminiClient::new(&base, "secret-key", 5).unwrap();
            client.generate("gemini-1.5-flash", "Analyze HC-1")
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(text, "Committee view");

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].path,
            "/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            requests[0].query_pairs(),
            vec![("key".to_string(), "secret-key".to_string())]
        );
        assert_eq!(
            requests[0].json()["contents"][0]["parts"][0]["text"],
            "Analyze HC-1"
        );
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let stub = StubServer::start(vec![(
            StatusCode::NOT_FOUND,
            json!({"error": {"code": 404, "message": "models/old-model is not found"}}),
        )])
        .await;
        let base = stub.base_url.clone();
        let err = tokio::task::spawn_blocking(move || {
            let client = GeminiClient::new(&base, "secret-key", 5).unwrap();
            client.generate("old-model", "hi")
        })
        .await
        .unwrap()
        .unwrap_err();
        match err {
            AiError::Api { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("is not found"));
                assert!(!body.contains("secret-key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_moves_past_failing_model() {
        let stub = StubServer::start(vec![
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"error": {"message": "overloaded"}}),
            ),
            (StatusCode::OK, answer("Second model answer")),
        ])
        .await;
        let base = stub.base_url.clone();
        let response = tokio::task::spawn_blocking(move || {
            let client = GeminiClient::new(&base, "secret-key", 5).unwrap();
            let fallback = ModelFallback::new(
                Arc::new(client),
                vec!["first-model".into(), "second-model".into()],
            );
            fallback.generate("hi")
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(response.text, "Second model answer");
        assert_eq!(response.model, "second-model");

        let paths: Vec<String> = stub.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/v1beta/models/first-model:generateContent",
                "/v1beta/models/second-model:generateContent",
            ]
        );
    }
}
