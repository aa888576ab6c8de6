//! Pipeline stages for RFP analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped (another extractor, another vendor) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts::render ──▶ llm
//! (upload)   (pdfium)     (template)        (OpenAI / Gemini)
//! ```
//!
//! 1. [`input`]  : enforce the PDF-only constraint on an upload
//! 2. [`extract`]: page text in page order; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`llm`]    : one request to the vendor; the only stage with network I/O

pub mod extract;
pub mod input;
pub mod llm;
