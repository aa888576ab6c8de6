//! Configuration types for RFP analysis.
//!
//! The deployment profile, the vendor credential and endpoint overrides
//! live in one [`AnalysisConfig`] built once at start-up and passed
//! explicitly into [`crate::analyze::analyze`]. The server shares it behind
//! an `Arc`; nothing in the pipeline reads ambient global state.
//!
//! The two deployment variants are [`Profile`]s: a bundle of vendor, model,
//! output-token bound and prompt template, chosen at deployment time.

use crate::error::RfpError;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::llm::InferenceProvider;
use crate::progress::ProgressCallback;
use crate::prompts::{PromptTemplate, RUBRIC_TEMPLATE, VERIFIED_RUBRIC_TEMPLATE};
use crate::secrets::SecretStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default upload cap for the HTTP server: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Remote LLM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    OpenAi,
    Gemini,
}

impl Vendor {
    /// Secret-store key holding this vendor's API key.
    pub fn credential_key(self) -> &'static str {
        match self {
            Vendor::OpenAi => "OPENAI_API_KEY",
            Vendor::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Public API base URL.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Vendor::OpenAi => "https://api.openai.com/v1",
            Vendor::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment variant: who to call, with which model, and what to ask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// Short name used on the command line (`openai`, `gemini`).
    pub name: &'static str,
    pub vendor: Vendor,
    /// Vendor model identifier.
    pub model: String,
    /// Upper bound on generated tokens; `None` leaves it to the vendor.
    pub max_output_tokens: Option<u32>,
    #[serde(skip)]
    pub template: PromptTemplate,
}

impl Profile {
    /// OpenAI `gpt-4o-mini`, 500 output tokens, three-section rubric.
    pub fn openai() -> Self {
        Self {
            name: "openai",
            vendor: Vendor::OpenAi,
            model: "gpt-4o-mini".to_string(),
            max_output_tokens: Some(500),
            template: PromptTemplate::builtin(RUBRIC_TEMPLATE),
        }
    }

    /// Gemini `gemini-1.5-flash`, unbounded output, verified-information rubric.
    pub fn gemini() -> Self {
        Self {
            name: "gemini",
            vendor: Vendor::Gemini,
            model: "gemini-1.5-flash".to_string(),
            max_output_tokens: None,
            template: PromptTemplate::builtin(VERIFIED_RUBRIC_TEMPLATE),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::openai()
    }
}

impl FromStr for Profile {
    type Err = RfpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::openai()),
            "gemini" => Ok(Self::gemini()),
            other => Err(RfpError::InvalidConfig(format!(
                "unknown profile '{other}' (expected 'openai' or 'gemini')"
            ))),
        }
    }
}

/// A vendor API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Configuration for an RFP analysis run.
///
/// Built via [`AnalysisConfig::builder()`].
///
/// # Example
/// ```rust
/// use rfp_analyzer::{AnalysisConfig, Profile, SecretStore};
///
/// let secrets = SecretStore::from_pairs([("GEMINI_API_KEY", "g-123")]);
/// let config = AnalysisConfig::builder()
///     .profile(Profile::gemini())
///     .credential_from(&secrets)
///     .build()
///     .unwrap();
/// assert!(config.credential.is_some());
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Deployment variant. Default: [`Profile::openai`].
    pub profile: Profile,

    /// API key for `profile.vendor`, read once from the secret store.
    /// `None` makes every run fail with [`RfpError::MissingCredential`]
    /// unless a pre-built `provider` is set.
    pub credential: Option<Credential>,

    /// Override of the vendor base URL (gateways, local stubs).
    pub base_url: Option<String>,

    /// Per-request timeout for the inference call. `None` keeps the HTTP
    /// client's default.
    pub api_timeout_secs: Option<u64>,

    /// Password for encrypted PDFs.
    pub password: Option<String>,

    /// Largest upload the HTTP server accepts. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Pre-constructed inference provider. Takes precedence over
    /// `credential` and `base_url`.
    pub provider: Option<Arc<dyn InferenceProvider>>,

    /// Text extractor. `None` uses pdfium.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Stage events (extraction / inference start and end).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            credential: None,
            base_url: None,
            api_timeout_secs: None,
            password: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            provider: None,
            extractor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("profile", &self.profile.name)
            .field("vendor", &self.profile.vendor)
            .field("model", &self.profile.model)
            .field("max_output_tokens", &self.profile.max_output_tokens)
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
            secrets: None,
        }
    }

    /// Base URL the vendor client should call.
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.profile.vendor.default_base_url())
    }
}

/// Builder for [`AnalysisConfig`].
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
    /// Looked up in `build()` against the final profile's vendor.
    secrets: Option<SecretStore>,
}

impl AnalysisConfigBuilder {
    pub fn profile(mut self, profile: Profile) -> Self {
        self.config.profile = profile;
        self
    }

    /// Replace the profile's template. Must contain one `{rfp_text}`.
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.config.profile.template = template;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.profile.model = model.into();
        self
    }

    pub fn max_output_tokens(mut self, n: Option<u32>) -> Self {
        self.config.profile.max_output_tokens = n;
        self
    }

    /// Use `key` as the credential, replacing any earlier
    /// [`Self::credential_from`].
    pub fn credential(mut self, key: impl Into<String>) -> Self {
        self.config.credential = Some(Credential::new(key));
        self.secrets = None;
        self
    }

    /// Take the credential from `secrets`, keyed by the vendor of the profile
    /// in effect at [`Self::build`]. An absent secret leaves it unset.
    pub fn credential_from(mut self, secrets: &SecretStore) -> Self {
        self.config.credential = None;
        self.secrets = Some(secrets.clone());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn InferenceProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<AnalysisConfig, RfpError> {
        if let Some(secrets) = self.secrets.take() {
            self.config.credential = secrets
                .get(self.config.profile.vendor.credential_key())
                .map(Credential::new);
        }

        let c = &self.config;
        if c.profile.model.trim().is_empty() {
            return Err(RfpError::InvalidConfig("model must not be empty".into()));
        }
        if c.profile.max_output_tokens == Some(0) {
            return Err(RfpError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(RfpError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(RfpError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if let Some(ref url) = c.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RfpError::InvalidConfig(format!(
                    "base URL must start with http:// or https://, got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}
