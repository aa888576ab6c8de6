//! Pipeline tests with stub extraction and inference backends.
//!
//! No pdfium library and no network access are needed: the extractor and the
//! provider are injected through `AnalysisConfig`.

use async_trait::async_trait;
use rfp_analyzer::{
    analyze, analyze_to_file, AnalysisConfig, AnalysisProgressCallback, Completion,
    CompletionOptions, ExtractedText, InferenceProvider, Profile, PromptTemplate, RfpError,
    SecretStore, TextExtractor, UploadedDocument,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const PDF_BYTES: &[u8] = b"%PDF-1.7\n%stub\n";

// ── Stubs ────────────────────────────────────────────────────────────────────

/// Returns fixed page texts and counts calls.
struct StubExtractor {
    pages: Vec<String>,
    calls: AtomicUsize,
}

impl StubExtractor {
    fn new(pages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl TextExtractor for StubExtractor {
    fn extract(
        &self,
        _document: &UploadedDocument,
        _password: Option<&str>,
    ) -> Result<ExtractedText, RfpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExtractedText::from_pages(&self.pages))
    }
}

/// Records every prompt and answers with a canned reply.
struct StubProvider {
    reply: String,
    prompts: Mutex<Vec<(String, CompletionOptions)>>,
}

impl StubProvider {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, CompletionOptions)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, RfpError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        Ok(Completion {
            text: self.reply.clone(),
            prompt_tokens: Some(42),
            completion_tokens: Some(7),
        })
    }
}

/// Fails every call with a vendor quota error.
struct QuotaExceededProvider;

#[async_trait]
impl InferenceProvider for QuotaExceededProvider {
    fn name(&self) -> &str {
        "quota"
    }

    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<Completion, RfpError> {
        Err(RfpError::RateLimitExceeded {
            provider: "quota".into(),
            retry_after_secs: Some(30),
        })
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl AnalysisProgressCallback for EventLog {
    fn on_extraction_start(&self, source_name: &str, _size_bytes: usize) {
        self.0.lock().unwrap().push(format!("extract:{source_name}"));
    }
    fn on_extraction_complete(&self, page_count: usize, _chars: usize) {
        self.0.lock().unwrap().push(format!("extracted:{page_count}"));
    }
    fn on_inference_start(&self, model: &str, _prompt_chars: usize) {
        self.0.lock().unwrap().push(format!("infer:{model}"));
    }
    fn on_inference_complete(&self, _analysis_chars: usize) {
        self.0.lock().unwrap().push("done".to_string());
    }
    fn on_error(&self, _error: &str) {
        self.0.lock().unwrap().push("error".to_string());
    }
}

fn upload() -> UploadedDocument {
    UploadedDocument::new("tender.pdf", PDF_BYTES.to_vec()).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reply_is_returned_verbatim() {
    let reply = "### 1. Summary\n- Build a bridge\n\n### 3. Qualification Score\n**7/10**  \n";
    let provider = StubProvider::new(reply);
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["Scope: bridge.\n"]))
        .provider(provider.clone())
        .build()
        .unwrap();

    let output = analyze(upload(), &config).await.unwrap();

    assert_eq!(output.analysis, reply);
    assert_eq!(output.source_name, "tender.pdf");
    assert_eq!(output.model, "gpt-4o-mini");
    assert_eq!(output.stats.prompt_tokens, Some(42));
    assert_eq!(output.stats.completion_tokens, Some(7));
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn prompt_is_template_with_pages_spliced_in_order() {
    let provider = StubProvider::new("ok");
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["Page A.\n", "Page B.\n", "Page C."]))
        .provider(provider.clone())
        .build()
        .unwrap();

    analyze(upload(), &config).await.unwrap();

    let (prompt, options) = provider.calls().remove(0);
    assert_eq!(
        prompt,
        Profile::openai()
            .template
            .render("Page A.\nPage B.\nPage C.")
    );
    assert!(prompt.contains("Page A.\nPage B.\nPage C."));
    assert_eq!(options.model, "gpt-4o-mini");
    assert_eq!(options.max_output_tokens, Some(500));
}

#[tokio::test]
async fn gemini_profile_sends_unbounded_request_with_its_template() {
    let provider = StubProvider::new("ok");
    let config = AnalysisConfig::builder()
        .profile(Profile::gemini())
        .extractor(StubExtractor::new(&["Deadline: 1 May."]))
        .provider(provider.clone())
        .build()
        .unwrap();

    let output = analyze(upload(), &config).await.unwrap();

    let (prompt, options) = provider.calls().remove(0);
    assert!(prompt.contains("verified information"));
    assert!(prompt.contains("Deadline: 1 May."));
    assert_eq!(options.model, "gemini-1.5-flash");
    assert_eq!(options.max_output_tokens, None);
    assert_eq!(output.profile, "gemini");
}

#[tokio::test]
async fn missing_credential_fails_before_extraction() {
    let extractor = StubExtractor::new(&["never read"]);
    let secrets = SecretStore::from_pairs([("GEMINI_API_KEY", "g-only")]);
    let config = AnalysisConfig::builder()
        .profile(Profile::openai())
        .credential_from(&secrets)
        .extractor(extractor.clone())
        .build()
        .unwrap();

    let err = analyze(upload(), &config).await.unwrap_err();

    assert!(
        matches!(err, RfpError::MissingCredential { key: "OPENAI_API_KEY" }),
        "got: {err:?}"
    );
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_text_is_still_sent() {
    let provider = StubProvider::new("Nothing to analyse.");
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["", ""]))
        .provider(provider.clone())
        .build()
        .unwrap();

    let output = analyze(upload(), &config).await.unwrap();

    let (prompt, _) = provider.calls().remove(0);
    assert_eq!(prompt, Profile::openai().template.render(""));
    assert_eq!(output.stats.page_count, 2);
    assert_eq!(output.stats.extracted_chars, 0);
    assert_eq!(output.analysis, "Nothing to analyse.");
}

#[tokio::test]
async fn placeholder_in_document_text_is_not_expanded() {
    let provider = StubProvider::new("ok");
    let config = AnalysisConfig::builder()
        .template(PromptTemplate::new("<<{rfp_text}>>").unwrap())
        .extractor(StubExtractor::new(&["literal {rfp_text} here"]))
        .provider(provider.clone())
        .build()
        .unwrap();

    analyze(upload(), &config).await.unwrap();

    let (prompt, _) = provider.calls().remove(0);
    assert_eq!(prompt, "<<literal {rfp_text} here>>");
}

#[tokio::test]
async fn vendor_error_is_propagated_and_reported() {
    let events = Arc::new(EventLog::default());
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["text"]))
        .provider(Arc::new(QuotaExceededProvider))
        .progress_callback(events.clone())
        .build()
        .unwrap();

    let err = analyze(upload(), &config).await.unwrap_err();

    assert!(matches!(
        err,
        RfpError::RateLimitExceeded {
            retry_after_secs: Some(30),
            ..
        }
    ));
    assert_eq!(events.0.lock().unwrap().last().map(String::as_str), Some("error"));
}

#[tokio::test]
async fn progress_events_arrive_in_stage_order() {
    let events = Arc::new(EventLog::default());
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["a", "b", "c"]))
        .provider(StubProvider::new("ok"))
        .progress_callback(events.clone())
        .build()
        .unwrap();

    analyze(upload(), &config).await.unwrap();

    assert_eq!(
        *events.0.lock().unwrap(),
        vec![
            "extract:tender.pdf",
            "extracted:3",
            "infer:gpt-4o-mini",
            "done"
        ]
    );
}

#[tokio::test]
async fn analysis_is_written_to_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rfp.pdf");
    let output = dir.path().join("reports/rfp.md");
    std::fs::write(&input, PDF_BYTES).unwrap();

    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["text"]))
        .provider(StubProvider::new("## Report\n"))
        .build()
        .unwrap();

    let result = analyze_to_file(&input, &output, &config).await.unwrap();

    assert_eq!(std::fs::read_to_string(&output).unwrap(), "## Report\n");
    assert_eq!(result.source_name, "rfp.pdf");
}

#[tokio::test]
async fn failed_output_write_leaves_no_temp_file_and_spares_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rfp.pdf");
    std::fs::write(&input, PDF_BYTES).unwrap();
    // A non-empty directory where the report should go makes the rename fail.
    let output = dir.path().join("report.md");
    std::fs::create_dir(&output).unwrap();
    std::fs::write(output.join("keep.txt"), "x").unwrap();
    let sibling = dir.path().join("report.tmp");
    std::fs::write(&sibling, "user data").unwrap();

    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["text"]))
        .provider(StubProvider::new("## Report\n"))
        .build()
        .unwrap();

    let err = analyze_to_file(&input, &output, &config).await.unwrap_err();

    assert!(matches!(err, RfpError::OutputWriteFailed { .. }), "got: {err:?}");
    assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "user data");
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["report.md", "report.tmp", "rfp.pdf"]);
}

#[tokio::test]
async fn missing_input_file_is_reported() {
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&[]))
        .provider(StubProvider::new("ok"))
        .build()
        .unwrap();

    let err = rfp_analyzer::analyze_file("/definitely/not/here.pdf", &config)
        .await
        .unwrap_err();

    assert!(matches!(err, RfpError::FileNotFound { .. }));
}

#[test]
fn sync_wrapper_runs_outside_a_runtime() {
    let config = AnalysisConfig::builder()
        .extractor(StubExtractor::new(&["text"]))
        .provider(StubProvider::new("sync reply"))
        .build()
        .unwrap();

    let output = rfp_analyzer::analyze_sync(upload(), &config).unwrap();

    assert_eq!(output.analysis, "sync reply");
}
