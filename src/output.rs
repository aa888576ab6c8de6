//! Result types returned by the analysis pipeline.

use crate::config::Vendor;
use serde::{Deserialize, Serialize};

/// Outcome of one analysis run.
///
/// `analysis` is the model's reply exactly as received; everything else is
/// bookkeeping that never feeds back into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Verbatim model response.
    pub analysis: String,
    /// Name of the uploaded file.
    pub source_name: String,
    /// Profile that produced the answer.
    pub profile: String,
    pub vendor: Vendor,
    pub model: String,
    pub stats: AnalysisStats,
}

/// Timing and size statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Pages in the document.
    pub page_count: usize,
    /// Characters of extracted text (0 for image-only PDFs).
    pub extracted_chars: usize,
    /// Characters of the full prompt sent to the model.
    pub prompt_chars: usize,
    /// Characters of the model reply.
    pub analysis_chars: usize,
    /// Prompt tokens, when the vendor reports usage.
    pub prompt_tokens: Option<u32>,
    /// Completion tokens, when the vendor reports usage.
    pub completion_tokens: Option<u32>,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Document-level metadata, available without calling the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
