//! # rfp-analyzer
//!
//! Upload a Request for Proposal as a PDF, get back an LLM-written summary,
//! a list of red flags and a qualification score.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input    PDF-only constraint (extension, MIME type, %PDF signature)
//!  ├─ 2. Extract  page text via pdfium, concatenated in page order (spawn_blocking)
//!  ├─ 3. Prompt   literal splice into the profile's template
//!  ├─ 4. Infer    one request to OpenAI or Gemini, no retry
//!  └─ 5. Output   the model's reply, verbatim
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rfp_analyzer::{analyze_file, AnalysisConfig, Profile, SecretStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY from ./.env and the environment, once.
//!     let secrets = SecretStore::load(None)?;
//!     let config = AnalysisConfig::builder()
//!         .profile(Profile::openai())
//!         .credential_from(&secrets)
//!         .build()?;
//!     let output = analyze_file("tender.pdf", &config).await?;
//!     println!("{}", output.analysis);
//!     Ok(())
//! }
//! ```
//!
//! ## Profiles
//!
//! | Profile | Vendor | Model | Max output tokens | Secret |
//! |---------|--------|-------|-------------------|--------|
//! | `openai` (default) | OpenAI | `gpt-4o-mini` | 500 | `OPENAI_API_KEY` |
//! | `gemini` | Google | `gemini-1.5-flash` | vendor default | `GEMINI_API_KEY` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rfp-analyzer` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod secrets;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_sync, analyze_to_file, inspect};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, Credential, Profile, Vendor};
pub use error::RfpError;
pub use output::{AnalysisOutput, AnalysisStats, DocumentMetadata};
pub use pipeline::extract::{ExtractedText, PdfiumExtractor, TextExtractor};
pub use pipeline::input::UploadedDocument;
pub use pipeline::llm::{
    Completion, CompletionOptions, GeminiProvider, InferenceProvider, OpenAiProvider,
};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::PromptTemplate;
pub use secrets::SecretStore;
