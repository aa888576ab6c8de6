//! Remote inference: send one prompt, get one completion.
//!
//! [`InferenceProvider`] is the seam between the pipeline and a vendor. Two
//! HTTP implementations ship here, [`OpenAiProvider`] (chat completions) and
//! [`GeminiProvider`] (`generateContent`). Each call is a single request:
//! no retry and no streaming. Non-success statuses are classified into
//! [`RfpError`] variants so the HTTP layer can answer with a sensible code.
//!
//! All prompt wording lives in [`crate::prompts`]; this module only moves
//! bytes.

use crate::config::{AnalysisConfig, Vendor};
use crate::error::RfpError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-call knobs taken from the active profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOptions {
    pub model: String,
    pub max_output_tokens: Option<u32>,
}

/// A completed model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Response text, untouched.
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Anything that can turn a prompt into a completion.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    /// Send `prompt` as a single user message.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, RfpError>;
}

/// Build the vendor client for `config.profile`.
///
/// Fails with [`RfpError::MissingCredential`] when the secret store had no
/// key for the vendor; no request is made in that case.
pub fn provider_from_config(
    config: &AnalysisConfig,
) -> Result<Arc<dyn InferenceProvider>, RfpError> {
    let vendor = config.profile.vendor;
    let credential = config
        .credential
        .as_ref()
        .ok_or(RfpError::MissingCredential {
            key: vendor.credential_key(),
        })?;

    let client = build_client(config.api_timeout_secs, vendor)?;
    let base_url = config.effective_base_url().to_string();
    let api_key = credential.expose().to_string();

    Ok(match vendor {
        Vendor::OpenAi => Arc::new(OpenAiProvider::with_client(client, base_url, api_key)),
        Vendor::Gemini => Arc::new(GeminiProvider::with_client(client, base_url, api_key)),
    })
}

fn build_client(timeout_secs: Option<u64>, vendor: Vendor) -> Result<Client, RfpError> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| RfpError::LlmRequestFailed {
        provider: vendor.to_string(),
        source: e,
    })
}

/// Turn a non-success response into the matching error.
async fn classify_failure(provider: &str, response: Response) -> RfpError {
    let status = response.status();
    let retry_after_secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RfpError::AuthError {
            provider: provider.to_string(),
            detail: body,
        },
        StatusCode::TOO_MANY_REQUESTS => RfpError::RateLimitExceeded {
            provider: provider.to_string(),
            retry_after_secs,
        },
        _ => RfpError::LlmApiError {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: body,
        },
    }
}

// ── OpenAI ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

/// OpenAI (or OpenAI-compatible) chat-completions client.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Create a provider with a default HTTP client.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl InferenceProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, RfpError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &options.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_output_tokens,
        };

        debug!("POST {} (model {})", url, options.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RfpError::LlmRequestFailed {
                provider: self.name().to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(classify_failure(self.name(), response).await);
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| RfpError::MalformedResponse {
                    provider: self.name().to_string(),
                    detail: e.to_string(),
                })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RfpError::MalformedResponse {
                provider: self.name().to_string(),
                detail: "response contained no choices".to_string(),
            })?;

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            prompt_tokens: parsed.usage.as_ref().and_then(|u| u.prompt_tokens),
            completion_tokens: parsed.usage.as_ref().and_then(|u| u.completion_tokens),
        })
    }
}

// ── Gemini ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

/// Google Gemini `generateContent` client.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    /// Create a provider with a default HTTP client.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl InferenceProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, RfpError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, options.model);
        let body = GeminiRequest {
            contents: [GeminiContent {
                role: "user",
                parts: [GeminiPart { text: prompt }],
            }],
            generation_config: options
                .max_output_tokens
                .map(|max_output_tokens| GenerationConfig { max_output_tokens }),
        };

        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| RfpError::LlmRequestFailed {
                provider: self.name().to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(classify_failure(self.name(), response).await);
        }

        let parsed: GeminiResponse =
            response
                .json()
                .await
                .map_err(|e| RfpError::MalformedResponse {
                    provider: self.name().to_string(),
                    detail: e.to_string(),
                })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| RfpError::MalformedResponse {
                provider: self.name().to_string(),
                detail: "response contained no candidates".to_string(),
            })?;

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        Ok(Completion {
            text,
            prompt_tokens: parsed
                .usage_metadata
                .as_ref()
                .and_then(|u| u.prompt_token_count),
            completion_tokens: parsed
                .usage_metadata
                .as_ref()
                .and_then(|u| u.candidates_token_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;

    #[test]
    fn missing_credential_fails_before_any_client_is_built() {
        let config = AnalysisConfig::default();
        let err = provider_from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            RfpError::MissingCredential {
                key: "OPENAI_API_KEY"
            }
        ));
    }

    #[test]
    fn provider_matches_profile_vendor() {
        let config = AnalysisConfig::builder()
            .profile(Profile::gemini())
            .credential("g-key")
            .build()
            .unwrap();
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn openai_body_omits_unset_token_bound() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn gemini_body_uses_camel_case() {
        let body = GeminiRequest {
            contents: [GeminiContent {
                role: "user",
                parts: [GeminiPart { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: 500,
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 500);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
