//! Text extraction: PDF bytes → page text concatenated in page order.
//!
//! ## Threading
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while parsing. [`extract_text`] moves the work onto
//! Tokio's blocking pool so async worker threads never stall on a large PDF.
//!
//! Extraction is plain: each page's plain text is appended as-is,
//! with no separator, cleanup or layout reconstruction. Image-only pages
//! yield empty strings and that is not an error.

use crate::error::RfpError;
use crate::output::DocumentMetadata;
use crate::pipeline::input::UploadedDocument;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Plain text of a document, pages concatenated in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
    page_count: usize,
}

impl ExtractedText {
    /// Concatenate per-page strings in the order given.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        let mut page_count = 0;
        for page in pages {
            text.push_str(page.as_ref());
            page_count += 1;
        }
        Self { text, page_count }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Number of characters (not bytes) of text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True when no page produced any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Blocking PDF-to-text backend.
///
/// Called from `spawn_blocking`, so implementations may block freely.
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        document: &UploadedDocument,
        password: Option<&str>,
    ) -> Result<ExtractedText, RfpError>;
}

/// The pdfium-backed extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumExtractor;

impl TextExtractor for PdfiumExtractor {
    fn extract(
        &self,
        document: &UploadedDocument,
        password: Option<&str>,
    ) -> Result<ExtractedText, RfpError> {
        let pdfium = bind_pdfium()?;
        let pdf = open_document(&pdfium, document, password)?;

        let pages = pdf.pages();
        info!("PDF '{}' loaded: {} pages", document.name(), pages.len());

        let mut page_texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let text = page.text().map_err(|e| RfpError::CorruptPdf {
                name: document.name().to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            let text = text.all();
            debug!("Page {}: {} chars", idx + 1, text.chars().count());
            page_texts.push(text);
        }

        Ok(ExtractedText::from_pages(page_texts))
    }
}

/// Run `extractor` on the blocking pool.
pub async fn extract_text(
    extractor: Arc<dyn TextExtractor>,
    document: UploadedDocument,
    password: Option<String>,
) -> Result<ExtractedText, RfpError> {
    tokio::task::spawn_blocking(move || extractor.extract(&document, password.as_deref()))
        .await
        .map_err(|e| RfpError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Read document metadata without extracting text.
pub async fn extract_metadata(
    document: UploadedDocument,
    password: Option<String>,
) -> Result<DocumentMetadata, RfpError> {
    tokio::task::spawn_blocking(move || extract_metadata_blocking(&document, password.as_deref()))
        .await
        .map_err(|e| RfpError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    document: &UploadedDocument,
    password: Option<&str>,
) -> Result<DocumentMetadata, RfpError> {
    let pdfium = bind_pdfium()?;
    let pdf = open_document(&pdfium, document, password)?;

    let metadata = pdf.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pdf.pages().len() as usize,
        pdf_version: format!("{:?}", pdf.version()),
    })
}

/// Load the document from memory, classifying password failures.
fn open_document<'a>(
    pdfium: &'a Pdfium,
    document: &'a UploadedDocument,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, RfpError> {
    pdfium
        .load_pdf_from_byte_slice(document.bytes(), password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            let name = document.name().to_string();
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    RfpError::WrongPassword { name }
                } else {
                    RfpError::PasswordRequired { name }
                }
            } else {
                RfpError::CorruptPdf {
                    name,
                    detail: err_str,
                }
            }
        })
}

/// Bind pdfium: `PDFIUM_LIB_PATH` (file or directory), then the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, RfpError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            if Path::new(&p).is_file() {
                Pdfium::bind_to_library(p)
            } else {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&p))
            }
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| RfpError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}
