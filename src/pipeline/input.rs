//! Input validation: turn an upload (or a local file) into an [`UploadedDocument`].
//!
//! The PDF-only constraint is enforced here, before any extraction: the file
//! name must end in `.pdf`, a declared content type must be a PDF (or the
//! generic `application/octet-stream` some browsers send), and the bytes must
//! start with the `%PDF` signature. Anything else is rejected without ever
//! reaching pdfium.

use crate::error::RfpError;
use std::path::Path;
use tracing::debug;

/// PDF file signature.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Raw bytes of one user-supplied PDF, owned by the request that received it.
#[derive(Clone)]
pub struct UploadedDocument {
    name: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedDocument {
    /// Validate an upload by name and content.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, RfpError> {
        Self::with_content_type(name, None, bytes)
    }

    /// Validate an upload, also checking the declared MIME type when present.
    pub fn with_content_type(
        name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, RfpError> {
        let name = name.into();

        if !has_pdf_extension(&name) {
            return Err(RfpError::UnsupportedFileType {
                detail: "a file name without the .pdf extension".to_string(),
                name,
            });
        }

        if let Some(ct) = content_type {
            if !is_pdf_content_type(ct) {
                return Err(RfpError::UnsupportedFileType {
                    detail: format!("content type '{ct}'"),
                    name,
                });
            }
        }

        if bytes.is_empty() {
            return Err(RfpError::EmptyUpload { name });
        }

        if !bytes.starts_with(PDF_MAGIC) {
            let magic = bytes.iter().take(PDF_MAGIC.len()).copied().collect();
            return Err(RfpError::NotAPdf { name, magic });
        }

        debug!("Accepted upload '{}' ({} bytes)", name, bytes.len());
        Ok(Self { name, bytes })
    }

    /// Read and validate a local PDF file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, RfpError> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(RfpError::PermissionDenied {
                    path: path.to_path_buf(),
                });
            }
            Err(_) => {
                return Err(RfpError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::new(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Case-insensitive `.pdf` suffix check.
pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Accept `application/pdf` (with optional parameters) and the generic
/// binary type browsers fall back to.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    matches!(
        essence.as_str(),
        "application/pdf" | "application/x-pdf" | "application/octet-stream"
    )
}
