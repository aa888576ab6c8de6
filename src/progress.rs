//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to learn when
//! each blocking stage starts and ends. The CLI uses it to drive a spinner;
//! a host UI can use it to show its busy indicator.
//!
//! # Example
//!
//! ```rust
//! use rfp_analyzer::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl AnalysisProgressCallback for Log {
//!     fn on_extraction_complete(&self, page_count: usize, chars: usize) {
//!         eprintln!("extracted {chars} chars from {page_count} pages");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline around its two blocking stages.
///
/// All methods default to no-ops. Implementations must be `Send + Sync`: the
/// server shares one config across concurrent requests.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called before text extraction starts.
    ///
    /// # Arguments
    /// * `source_name`: uploaded file name
    /// * `size_bytes` : upload size
    fn on_extraction_start(&self, source_name: &str, size_bytes: usize) {
        let _ = (source_name, size_bytes);
    }

    /// Called after extraction succeeds.
    ///
    /// # Arguments
    /// * `page_count`: pages in the document
    /// * `chars`     : characters of extracted text
    fn on_extraction_complete(&self, page_count: usize, chars: usize) {
        let _ = (page_count, chars);
    }

    /// Called just before the request is sent to the vendor.
    ///
    /// # Arguments
    /// * `model`       : model identifier
    /// * `prompt_chars`: characters in the rendered prompt
    fn on_inference_start(&self, model: &str, prompt_chars: usize) {
        let _ = (model, prompt_chars);
    }

    /// Called when the vendor returns a completion.
    fn on_inference_complete(&self, analysis_chars: usize) {
        let _ = analysis_chars;
    }

    /// Called once when any stage fails; the run ends right after.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
