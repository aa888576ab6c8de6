//! Wire-level tests for the OpenAI and Gemini clients against a mock server.

use rfp_analyzer::{
    AnalysisConfig, CompletionOptions, GeminiProvider, InferenceProvider, OpenAiProvider,
    Profile, RfpError,
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn openai_options() -> CompletionOptions {
    CompletionOptions {
        model: "gpt-4o-mini".into(),
        max_output_tokens: Some(500),
    }
}

fn gemini_options() -> CompletionOptions {
    CompletionOptions {
        model: "gemini-1.5-flash".into(),
        max_output_tokens: None,
    }
}

// ── OpenAI ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_request_shape_and_verbatim_reply() {
    let server = MockServer::start().await;
    let reply = "### 1. Summary\n* Scope: roads\n\n### 2. Red Flags\n* None\n";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 500,
            "messages": [{ "role": "user", "content": "PROMPT" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 30 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(format!("{}/v1", server.uri()), "sk-test");
    let completion = provider.complete("PROMPT", &openai_options()).await.unwrap();

    assert_eq!(completion.text, reply);
    assert_eq!(completion.prompt_tokens, Some(120));
    assert_eq!(completion.completion_tokens, Some(30));
}

#[tokio::test]
async fn openai_unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "Incorrect API key" } })),
        )
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(format!("{}/v1", server.uri()), "sk-bad");
    let err = provider
        .complete("PROMPT", &openai_options())
        .await
        .unwrap_err();

    match err {
        RfpError::AuthError { provider, detail } => {
            assert_eq!(provider, "openai");
            assert!(detail.contains("Incorrect API key"));
        }
        other => panic!("expected AuthError, got {other:?}"),
    }
}

#[tokio::test]
async fn openai_rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "20"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(format!("{}/v1", server.uri()), "sk-test");
    let err = provider
        .complete("PROMPT", &openai_options())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            RfpError::RateLimitExceeded {
                retry_after_secs: Some(20),
                ..
            }
        ),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn openai_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(format!("{}/v1", server.uri()), "sk-test");
    let err = provider
        .complete("PROMPT", &openai_options())
        .await
        .unwrap_err();

    assert!(
        matches!(err, RfpError::LlmApiError { status: 503, ref message, .. } if message == "overloaded"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn openai_empty_choices_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(format!("{}/v1", server.uri()), "sk-test");
    let err = provider
        .complete("PROMPT", &openai_options())
        .await
        .unwrap_err();

    assert!(matches!(err, RfpError::MalformedResponse { .. }));
}

// ── Gemini ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gemini_request_shape_and_joined_parts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "g-test"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "PROMPT" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "## Summary\n" },
                    { "text": "Score: 8/10" }
                ]}
            }],
            "usageMetadata": { "promptTokenCount": 90, "candidatesTokenCount": 12 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(format!("{}/v1beta", server.uri()), "g-test");
    let completion = provider.complete("PROMPT", &gemini_options()).await.unwrap();

    assert_eq!(completion.text, "## Summary\nScore: 8/10");
    assert_eq!(completion.prompt_tokens, Some(90));
    assert_eq!(completion.completion_tokens, Some(12));
}

#[tokio::test]
async fn gemini_forbidden_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(format!("{}/v1beta", server.uri()), "g-bad");
    let err = provider
        .complete("PROMPT", &gemini_options())
        .await
        .unwrap_err();

    assert!(matches!(err, RfpError::AuthError { ref provider, .. } if provider == "gemini"));
}

#[tokio::test]
async fn gemini_without_candidates_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(format!("{}/v1beta", server.uri()), "g-test");
    let err = provider
        .complete("PROMPT", &gemini_options())
        .await
        .unwrap_err();

    assert!(matches!(err, RfpError::MalformedResponse { .. }));
}

// ── Config wiring ────────────────────────────────────────────────────────────

#[tokio::test]
async fn config_base_url_and_credential_reach_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gateway/chat/completions"))
        .and(header("authorization", "Bearer from-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "routed" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = AnalysisConfig::builder()
        .profile(Profile::openai())
        .credential("from-config")
        .base_url(format!("{}/gateway/", server.uri()))
        .api_timeout_secs(5)
        .build()
        .unwrap();

    let provider = rfp_analyzer::pipeline::llm::provider_from_config(&config).unwrap();
    let completion = provider.complete("hi", &openai_options()).await.unwrap();

    assert_eq!(completion.text, "routed");
    assert_eq!(completion.prompt_tokens, None);
}
