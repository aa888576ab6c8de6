//! Analysis entry points.
//!
//! One run is one straight line:
//!
//! ```text
//! provider ─▶ extract ─▶ prompt ─▶ complete ─▶ AnalysisOutput
//! ```
//!
//! The provider is resolved first so that a missing credential stops the run
//! before any PDF parsing or network traffic happens. Every error is fatal for
//! the run; nothing is retried.

use crate::config::AnalysisConfig;
use crate::error::RfpError;
use crate::output::{AnalysisOutput, AnalysisStats, DocumentMetadata};
use crate::pipeline::extract::{self, PdfiumExtractor, TextExtractor};
use crate::pipeline::input::UploadedDocument;
use crate::pipeline::llm::{self, CompletionOptions, InferenceProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Analyse one uploaded PDF.
///
/// # Errors
/// - [`RfpError::MissingCredential`] when no provider can be built (checked
///   before extraction)
/// - extraction errors ([`RfpError::CorruptPdf`], password errors, pdfium
///   binding)
/// - vendor errors ([`RfpError::AuthError`], [`RfpError::RateLimitExceeded`],
///   [`RfpError::LlmApiError`], …)
pub async fn analyze(
    document: UploadedDocument,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, RfpError> {
    run(document, config).await.inspect_err(|e| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_error(&e.to_string());
        }
    })
}

async fn run(
    document: UploadedDocument,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, RfpError> {
    let total_start = Instant::now();
    let source_name = document.name().to_string();
    info!(
        "Starting analysis of '{}' with profile '{}'",
        source_name, config.profile.name
    );

    // ── Step 1: Resolve provider ─────────────────────────────────────────
    let provider = resolve_provider(config)?;

    // ── Step 2: Extract text ─────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(&source_name, document.len());
    }
    let extract_start = Instant::now();
    let extracted =
        extract::extract_text(resolve_extractor(config), document, config.password.clone())
            .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    let page_count = extracted.page_count();
    let extracted_chars = extracted.char_count();
    info!(
        "Extracted {} chars from {} pages in {}ms",
        extracted_chars, page_count, extract_duration_ms
    );
    if extracted.is_blank() {
        warn!(
            "No text found in '{}'; image-only PDFs are not OCR'd",
            source_name
        );
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(page_count, extracted_chars);
    }

    // ── Step 3: Build prompt ─────────────────────────────────────────────
    let prompt = config.profile.template.render(extracted.as_str());
    let prompt_chars = prompt.chars().count();
    debug!("Prompt is {} chars", prompt_chars);

    // ── Step 4: Call the model ───────────────────────────────────────────
    let options = CompletionOptions {
        model: config.profile.model.clone(),
        max_output_tokens: config.profile.max_output_tokens,
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_inference_start(&options.model, prompt_chars);
    }
    let llm_start = Instant::now();
    let completion = provider.complete(&prompt, &options).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;
    let analysis_chars = completion.text.chars().count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_inference_complete(analysis_chars);
    }

    let stats = AnalysisStats {
        page_count,
        extracted_chars,
        prompt_chars,
        analysis_chars,
        prompt_tokens: completion.prompt_tokens,
        completion_tokens: completion.completion_tokens,
        extract_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Analysis complete via {}: {} chars, {}ms total",
        provider.name(),
        analysis_chars,
        stats.total_duration_ms
    );

    Ok(AnalysisOutput {
        analysis: completion.text,
        source_name,
        profile: config.profile.name.to_string(),
        vendor: config.profile.vendor,
        model: options.model,
        stats,
    })
}

/// Read a local PDF and analyse it.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, RfpError> {
    let document = UploadedDocument::from_path(path).await?;
    analyze(document, config).await
}

/// Analyse a local PDF and write the reply to `output_path`.
///
/// Writes a hidden temp file next to `output_path` and renames it into place;
/// the temp file is removed if either step fails.
pub async fn analyze_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, RfpError> {
    let output = analyze_file(path, config).await?;
    let out = output_path.as_ref();
    let write_err = |source| RfpError::OutputWriteFailed {
        path: out.to_path_buf(),
        source,
    };

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = temp_sibling(out);
    let written = match tokio::fs::write(&tmp_path, &output.analysis).await {
        Ok(()) => tokio::fs::rename(&tmp_path, out).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }

    Ok(output)
}

/// Hidden, per-process temp name next to `out`: `.<name>.<pid>.tmp`.
fn temp_sibling(out: &Path) -> PathBuf {
    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "analysis".to_string());
    out.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    document: UploadedDocument,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, RfpError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RfpError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(document, config))
}

/// Read PDF metadata without extracting text or calling a model.
///
/// Does not require a credential.
pub async fn inspect(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, RfpError> {
    let document = UploadedDocument::from_path(path).await?;
    extract::extract_metadata(document, password.map(str::to_string)).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// A pre-built provider wins; otherwise build the vendor client from the
/// credential, failing fast when there is none.
fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn InferenceProvider>, RfpError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    llm::provider_from_config(config)
}

fn resolve_extractor(config: &AnalysisConfig) -> Arc<dyn TextExtractor> {
    config
        .extractor
        .clone()
        .unwrap_or_else(|| Arc::new(PdfiumExtractor))
}
