//! Error types for the rfp-analyzer library.
//!
//! Every failure in the pipeline is fatal for the run that hit it: there is
//! no partial result worth keeping when extraction or the model call fails.
//! All of them are therefore collapsed into one enum, [`RfpError`], grouped
//! by the stage that raises them:
//!
//! * **Input**: the upload violates the PDF-only constraint.
//! * **PDF**: pdfium could not be bound or could not parse the document.
//! * **LLM**: the credential is missing or the vendor call failed.
//!
//! The HTTP layer maps each variant to a status code in
//! [`crate::server::ApiError`]; the CLI wraps them with `anyhow` context.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the rfp-analyzer library.
#[derive(Debug, Error)]
pub enum RfpError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The upload's name or declared content type is not a PDF.
    #[error("'{name}' is not a PDF upload (got {detail}); only .pdf files are accepted")]
    UnsupportedFileType { name: String, detail: String },

    /// The upload carried zero bytes.
    #[error("Uploaded file '{name}' is empty")]
    EmptyUpload { name: String },

    /// The bytes do not start with the `%PDF` signature.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not parse the document.
    #[error("PDF '{name}' could not be read: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was configured.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was configured but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH to the libpdfium file (or its directory), place the\n\
library next to the executable, or install it on the system library path.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The secret store holds no credential for the configured vendor.
    #[error("No API key configured: set {key} in the environment or the secrets file")]
    MissingCredential { key: &'static str },

    /// Vendor rejected the credential (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// Vendor returned HTTP 429.
    #[error("Rate limit or quota exceeded for provider '{provider}'{}",
        .retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Vendor returned any other non-success status.
    #[error("LLM API error from '{provider}' (HTTP {status}): {message}")]
    LlmApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("Request to provider '{provider}' failed: {source}")]
    LlmRequestFailed {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not have the vendor's documented shape.
    #[error("Malformed response from provider '{provider}': {detail}")]
    MalformedResponse { provider: String, detail: String },

    // ── Config / IO errors ────────────────────────────────────────────────
    /// Builder or template validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write the CLI output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RfpError {
    /// True for errors raised by the PDF-only input constraint, i.e. before
    /// extraction was attempted.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            RfpError::UnsupportedFileType { .. }
                | RfpError::EmptyUpload { .. }
                | RfpError::NotAPdf { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_key() {
        let e = RfpError::MissingCredential {
            key: "OPENAI_API_KEY",
        };
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn rate_limit_display_with_retry() {
        let e = RfpError::RateLimitExceeded {
            provider: "openai".into(),
            retry_after_secs: Some(60),
        };
        let msg = e.to_string();
        assert!(msg.contains("openai"), "got: {msg}");
        assert!(msg.contains("retry after 60s"), "got: {msg}");
    }

    #[test]
    fn rate_limit_display_without_retry() {
        let e = RfpError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: None,
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"));
        assert!(!msg.contains("retry after"));
    }

    #[test]
    fn api_error_display() {
        let e = RfpError::LlmApiError {
            provider: "openai".into(),
            status: 500,
            message: "upstream exploded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 500"));
        assert!(msg.contains("upstream exploded"));
    }

    #[test]
    fn input_rejections_are_classified() {
        assert!(RfpError::EmptyUpload { name: "a.pdf".into() }.is_input_rejection());
        assert!(RfpError::NotAPdf {
            name: "a.pdf".into(),
            magic: b"PK\x03\x04".to_vec()
        }
        .is_input_rejection());
        assert!(!RfpError::CorruptPdf {
            name: "a.pdf".into(),
            detail: "xref".into()
        }
        .is_input_rejection());
    }
}
