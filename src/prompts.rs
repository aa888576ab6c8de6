//! Prompt templates for RFP analysis.
//!
//! Every built-in prompt lives here so that changing the wording of an
//! analysis touches exactly one file, and so unit tests can inspect the
//! templates without a network call.
//!
//! A template is plain text with exactly one [`PLACEHOLDER`]. Rendering is a
//! literal splice: the extracted document text is inserted as-is, with no
//! truncation or escaping, and is never re-scanned for placeholders.

use crate::error::RfpError;
use serde::Serialize;
use std::borrow::Cow;

/// The single substitution point every template must contain.
pub const PLACEHOLDER: &str = "{rfp_text}";

/// Three-section rubric used by the OpenAI profile.
pub const RUBRIC_TEMPLATE: &str = r#"You are an expert RFP analyst. Analyze the following RFP text and provide three clear sections:

1️⃣ **Summary (≤150 words)**
2️⃣ **Red Flags or Concerns** — list risks, unrealistic timelines, complex integrations, or penalties.
3️⃣ **Qualification Score (out of 10)** — based on fit, feasibility, and clarity.

Keep the tone professional and concise.

RFP TEXT:
{rfp_text}
"#;

/// Structured rubric used by the Gemini profile.
///
/// The wording asks for verified information only; the model receives no
/// documentation beyond the RFP text itself.
pub const VERIFIED_RUBRIC_TEMPLATE: &str = r#"You are a senior bid manager reviewing a Request for Proposal. Use only verified information: rely on the RFP text below and on official documentation sources, and say "Not stated in the RFP" instead of guessing.

Respond with exactly these sections:

## 1. Executive Summary
At most 150 words: issuer, scope of work, contract type and key dates.

## 2. Mandatory Requirements
A bullet list of every must-have requirement, each with the RFP section it comes from when available.

## 3. Red Flags
Risks such as unrealistic timelines, uncapped liability, penalties, ambiguous scope or complex integrations. Rate each as High, Medium or Low.

## 4. Qualification Score
A score out of 10 for each of Fit, Feasibility and Clarity, then an overall score with a one-sentence justification.

## 5. Recommendation
Bid or No-Bid, and the open questions to send to the issuer.

RFP TEXT:
{rfp_text}
"#;

/// A prompt template with one [`PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    text: Cow<'static, str>,
}

impl PromptTemplate {
    /// Validate and wrap a template string.
    ///
    /// Fails unless `text` contains [`PLACEHOLDER`] exactly once.
    pub fn new(text: impl Into<String>) -> Result<Self, RfpError> {
        let text = text.into();
        match text.matches(PLACEHOLDER).count() {
            1 => Ok(Self {
                text: Cow::Owned(text),
            }),
            0 => Err(RfpError::InvalidConfig(format!(
                "prompt template has no {PLACEHOLDER} placeholder"
            ))),
            n => Err(RfpError::InvalidConfig(format!(
                "prompt template has {n} {PLACEHOLDER} placeholders, expected exactly one"
            ))),
        }
    }

    /// Wrap one of the compiled-in templates above.
    pub(crate) const fn builtin(text: &'static str) -> Self {
        Self {
            text: Cow::Borrowed(text),
        }
    }

    /// The raw template text, placeholder included.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Splice `rfp_text` into the template at the placeholder.
    pub fn render(&self, rfp_text: &str) -> String {
        match self.text.split_once(PLACEHOLDER) {
            Some((before, after)) => {
                let mut prompt = String::with_capacity(before.len() + rfp_text.len() + after.len());
                prompt.push_str(before);
                prompt.push_str(rfp_text);
                prompt.push_str(after);
                prompt
            }
            // Unreachable for validated templates.
            None => format!("{}{}", self.text, rfp_text),
        }
    }

    /// Byte offset in the rendered prompt at which the document text starts.
    pub fn insertion_offset(&self) -> usize {
        self.text.find(PLACEHOLDER).unwrap_or(self.text.len())
    }
}
