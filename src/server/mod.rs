//! HTTP front end: an upload page and one analysis endpoint.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/` | GET | upload page |
//! | `/analyze` | POST | `multipart/form-data` with a `file` part; replies with the model text |
//! | `/health` | GET | liveness probe |
//!
//! Each upload runs the whole pipeline once. The only shared state is the
//! immutable [`AnalysisConfig`] built at start-up.

use crate::analyze::analyze;
use crate::config::AnalysisConfig;
use crate::error::RfpError;
use crate::pipeline::input::UploadedDocument;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("index.html");

/// Headroom for multipart framing on top of the file-size cap.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Creates the Axum router with all the application routes.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, config: AnalysisConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Listening on http://{} (profile '{}', model {})",
        listener.local_addr()?,
        config.profile.name,
        config.profile.model
    );
    if config.credential.is_none() && config.provider.is_none() {
        warn!(
            "{} is not set; every analysis will fail until it is configured",
            config.profile.vendor.credential_key()
        );
    }

    axum::serve(listener, create_router(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Run the pipeline on the uploaded `file` part and return the model text
/// verbatim as `text/plain`.
async fn analyze_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut document: Option<UploadedDocument> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                info!("Received upload '{}' ({} bytes)", file_name, bytes.len());
                if bytes.len() > state.config.max_upload_bytes {
                    return Err(ApiError::TooLarge {
                        name: file_name,
                        size: bytes.len(),
                        limit: state.config.max_upload_bytes,
                    });
                }
                document = Some(UploadedDocument::with_content_type(
                    file_name,
                    content_type.as_deref(),
                    bytes.to_vec(),
                )?);
            }
            _ => warn!("Ignoring unknown multipart field: {}", name),
        }
    }

    let document = document.ok_or(ApiError::MissingFile)?;
    let output = analyze(document, &state.config).await?;

    let mut response = (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output.analysis,
    )
        .into_response();
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&output.model) {
        headers.insert("x-rfp-model", v);
    }
    headers.insert("x-rfp-pages", HeaderValue::from(output.stats.page_count));
    Ok(response)
}

/// Errors a handler can answer with.
#[derive(Debug)]
pub enum ApiError {
    /// The pipeline failed.
    Analysis(RfpError),
    /// The multipart body could not be read (bad framing, over the size cap).
    Multipart(MultipartError),
    /// No `file` part in the form.
    MissingFile,
    /// The file part exceeds `max_upload_bytes`.
    TooLarge {
        name: String,
        size: usize,
        limit: usize,
    },
}

impl From<RfpError> for ApiError {
    fn from(err: RfpError) -> Self {
        ApiError::Analysis(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &RfpError) -> StatusCode {
    match err {
        RfpError::UnsupportedFileType { .. }
        | RfpError::EmptyUpload { .. }
        | RfpError::NotAPdf { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        RfpError::CorruptPdf { .. }
        | RfpError::PasswordRequired { .. }
        | RfpError::WrongPassword { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RfpError::MissingCredential { .. } | RfpError::PdfiumBindingFailed(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RfpError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        RfpError::AuthError { .. }
        | RfpError::LlmApiError { .. }
        | RfpError::LlmRequestFailed { .. }
        | RfpError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
        RfpError::FileNotFound { .. }
        | RfpError::PermissionDenied { .. }
        | RfpError::InvalidConfig(_)
        | RfpError::OutputWriteFailed { .. }
        | RfpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Analysis(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!("Analysis failed: {}", err);
                } else {
                    warn!("Analysis rejected: {}", err);
                }
                (status, err.to_string())
            }
            ApiError::Multipart(err) => {
                warn!("Bad multipart body: {}", err);
                (err.status(), err.body_text())
            }
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "No file uploaded: send a multipart 'file' part with a PDF.".to_string(),
            ),
            ApiError::TooLarge { name, size, limit } => {
                warn!("Upload '{}' rejected: {} bytes over the {} byte cap", name, size, limit);
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("'{name}' is {size} bytes; uploads are limited to {limit} bytes."),
                )
            }
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_rejections_map_to_415() {
        let err = RfpError::NotAPdf {
            name: "x.pdf".into(),
            magic: b"GIF8".to_vec(),
        };
        assert_eq!(status_for(&err), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn missing_credential_maps_to_503() {
        let err = RfpError::MissingCredential {
            key: "GEMINI_API_KEY",
        };
        assert_eq!(status_for(&err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn vendor_failures_map_to_gateway_codes() {
        let auth = RfpError::AuthError {
            provider: "openai".into(),
            detail: "bad key".into(),
        };
        let quota = RfpError::RateLimitExceeded {
            provider: "openai".into(),
            retry_after_secs: None,
        };
        assert_eq!(status_for(&auth), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&quota), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn upload_page_has_pdf_only_picker() {
        assert!(INDEX_HTML.contains(r#"accept=".pdf,application/pdf""#));
        assert!(INDEX_HTML.contains("fetch(\"analyze\""));
    }
}
