//! CLI binary for rfp-analyzer.
//!
//! A thin shim over the library crate: it loads secrets once, maps flags to
//! an `AnalysisConfig`, then either serves the upload page or analyses a
//! single file from the command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rfp_analyzer::{
    analyze_file, analyze_to_file, inspect, server, AnalysisConfig, AnalysisProgressCallback,
    Profile, ProgressCallback, PromptTemplate, SecretStore,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while each blocking stage runs.
struct SpinnerCallback {
    bar: ProgressBar,
}

impl SpinnerCallback {
    fn new() -> Arc<Self> {
        Self::with_bar(ProgressBar::new_spinner())
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for SpinnerCallback {
    fn on_extraction_start(&self, source_name: &str, _size_bytes: usize) {
        self.bar.enable_steady_tick(Duration::from_millis(80));
        self.bar
            .set_message(format!("📚 Extracting text from {source_name}…"));
    }

    fn on_extraction_complete(&self, page_count: usize, chars: usize) {
        self.bar.println(format!(
            "{} Text extracted successfully  {}",
            green("✅"),
            dim(&format!("{page_count} pages, {chars} chars"))
        ));
    }

    fn on_inference_start(&self, model: &str, _prompt_chars: usize) {
        self.bar
            .set_message(format!("🤖 Analyzing with AI ({model})…"));
    }

    fn on_inference_complete(&self, _analysis_chars: usize) {
        self.bar.finish_and_clear();
    }

    // main reports the error itself.
    fn on_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

/// Analyse RFP PDFs with an LLM: summary, red flags and a qualification score.
#[derive(Parser, Debug)]
#[command(
    name = "rfp-analyzer",
    version,
    about = "Analyse RFP PDFs with an LLM: summary, red flags and a qualification score",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Deployment profile: openai (gpt-4o-mini, 500 tokens) or gemini.
    #[arg(long, global = true, env = "RFP_PROFILE", default_value = "openai")]
    profile: String,

    /// Override the vendor API base URL (OpenAI-compatible gateways).
    #[arg(long, global = true, env = "RFP_BASE_URL")]
    base_url: Option<String>,

    /// Text file replacing the profile's prompt; must contain {rfp_text} once.
    #[arg(long, global = true, env = "RFP_TEMPLATE")]
    template: Option<PathBuf>,

    /// Dotenv-format secrets file. Default: ./.env when present.
    #[arg(long, global = true, env = "RFP_SECRETS_FILE")]
    secrets_file: Option<PathBuf>,

    /// Timeout for the LLM call in seconds. Default: HTTP client default.
    #[arg(long, global = true, env = "RFP_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "RFP_PDF_PASSWORD")]
    password: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RFP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "RFP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload page and the /analyze endpoint.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "RFP_ADDR", default_value = "127.0.0.1:8501")]
        addr: SocketAddr,

        /// Largest accepted upload in MiB.
        #[arg(long, env = "RFP_MAX_UPLOAD_MB", default_value_t = 50)]
        max_upload_mb: usize,
    },

    /// Analyse one PDF and print the model's reply.
    Analyze {
        /// Local PDF file path.
        input: PathBuf,

        /// Write the analysis to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full result (analysis + stats) as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print PDF metadata only; needs no API key.
    Inspect {
        /// Local PDF file path.
        input: PathBuf,

        /// Print metadata as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback for one-shot analysis, so library
    // INFO logs are muted there unless -v is given.
    let spinner_mode = matches!(cli.command, Command::Analyze { json: false, .. }) && !g.quiet;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || spinner_mode {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Inspect { input, json } => {
            let meta = inspect(input, g.password.as_deref())
                .await
                .context("Failed to inspect PDF")?;
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
                );
            } else {
                println!("File:         {}", input.display());
                if let Some(ref t) = meta.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = meta.author {
                    println!("Author:       {}", a);
                }
                if let Some(ref s) = meta.subject {
                    println!("Subject:      {}", s);
                }
                println!("Pages:        {}", meta.page_count);
                println!("PDF Version:  {}", meta.pdf_version);
                if let Some(ref p) = meta.producer {
                    println!("Producer:     {}", p);
                }
            }
        }

        Command::Serve {
            addr,
            max_upload_mb,
        } => {
            let config = build_config(g, None, Some(upload_cap_bytes(*max_upload_mb)?)).await?;
            server::serve(*addr, config)
                .await
                .context("HTTP server failed")?;
        }

        Command::Analyze {
            input,
            output,
            json,
        } => {
            let progress: Option<ProgressCallback> = if spinner_mode {
                Some(SpinnerCallback::new() as Arc<dyn AnalysisProgressCallback>)
            } else {
                None
            };
            let config = build_config(g, progress, None).await?;

            let result = match output {
                Some(path) => analyze_to_file(input, path, &config).await,
                None => analyze_file(input, &config).await,
            }
            .context("Analysis failed")?;

            if *json {
                let body =
                    serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
                println!("{body}");
            } else if let Some(path) = output {
                if !g.quiet {
                    eprintln!(
                        "{}  analysis written to {}",
                        green("✔"),
                        bold(&path.display().to_string())
                    );
                }
            } else {
                if !g.quiet {
                    eprintln!("{}", bold("🧠 AI Analysis"));
                }
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(result.analysis.as_bytes())
                    .context("Failed to write to stdout")?;
                if !result.analysis.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }

            if !g.quiet && !*json {
                eprintln!(
                    "   {} pages  /  {} ms  /  {} tokens in  /  {} tokens out",
                    dim(&result.stats.page_count.to_string()),
                    result.stats.total_duration_ms,
                    dim(&format_tokens(result.stats.prompt_tokens)),
                    dim(&format_tokens(result.stats.completion_tokens)),
                );
            }
        }
    }

    Ok(())
}

/// Load secrets once and map global flags to `AnalysisConfig`.
async fn build_config(
    g: &GlobalArgs,
    progress: Option<ProgressCallback>,
    max_upload_bytes: Option<usize>,
) -> Result<AnalysisConfig> {
    let profile: Profile = g.profile.parse().context("Invalid --profile")?;
    let secrets =
        SecretStore::load(g.secrets_file.as_deref()).context("Failed to load secrets")?;

    let mut builder = AnalysisConfig::builder()
        .profile(profile)
        .credential_from(&secrets);

    if let Some(ref path) = g.template {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.template(PromptTemplate::new(text).context("Invalid prompt template")?);
    }
    if let Some(ref url) = g.base_url {
        builder = builder.base_url(url);
    }
    if let Some(secs) = g.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref pwd) = g.password {
        builder = builder.password(pwd);
    }
    if let Some(n) = max_upload_bytes {
        builder = builder.max_upload_bytes(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn upload_cap_bytes(max_upload_mb: usize) -> Result<usize> {
    max_upload_mb
        .checked_mul(1024 * 1024)
        .with_context(|| format!("--max-upload-mb {max_upload_mb} is too large"))
}

fn format_tokens(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string())
}
