//! CLI binary for resume-ats.
//!
//! A thin shim over the library crate: the three action flags play the role
//! of the three buttons, `--resume` is the upload, and the result is printed
//! verbatim.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume_ats::{
    load_document, AnalysisProgressCallback, AtsError, DocumentBytes, InferenceConfig,
    InstructionTemplate, ProgressCallback, RenderConfig, ResumeAnalyzer, TemplateSelector,
    Triggers,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the pipeline stages.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_start: Mutex<Instant>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_start: Mutex::new(Instant::now()),
        })
    }

    fn restart_clock(&self) {
        if let Ok(mut t) = self.stage_start.lock() {
            *t = Instant::now();
        }
    }

    fn stage_secs(&self) -> f64 {
        self.stage_start
            .lock()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_render_start(&self, page_index: usize) {
        self.restart_clock();
        self.bar.set_prefix("Rendering");
        self.bar.set_message(format!("resume page {}", page_index + 1));
    }

    fn on_render_complete(&self, encoded_len: usize) {
        self.bar.println(format!(
            "  {} Page rendered  {}  {}",
            green("✓"),
            dim(&format!("{:>7} bytes", encoded_len)),
            dim(&format!("{:.1}s", self.stage_secs())),
        ));
    }

    fn on_inference_start(&self, template: InstructionTemplate, model: &str) {
        self.restart_clock();
        self.bar.set_prefix("Analysing");
        self.bar.set_message(format!("\"{template}\" with {model}"));
    }

    fn on_inference_complete(&self, response_len: usize) {
        self.bar.println(format!(
            "  {} Response received  {}  {}",
            green("✓"),
            dim(&format!("{:>5} chars", response_len)),
            dim(&format!("{:.1}s", self.stage_secs())),
        ));
        self.bar.finish_and_clear();
    }

    fn on_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # What does a recruiter see in this resume?
  resume-ats --summary --resume cv.pdf -j "Senior backend engineer, Go and distributed systems"

  # ATS-style percentage match, job description from a file
  resume-ats --percentage-match --resume cv.pdf --job-file job.txt

  # Skill advice, resume from a URL, JSON output
  resume-ats --improve-skills --resume https://example.com/cv.pdf --job-file job.txt --json

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Gemini API key (also read from a .env file)
  RESUME_ATS_MODEL        Override model ID (default: gemini-1.5-flash)
  RESUME_ATS_API_BASE     Override the Gemini REST base URL
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

/// Analyse a PDF resume against a job description with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "resume-ats",
    version,
    about = "Analyse a PDF resume against a job description with a multimodal LLM",
    long_about = "Render the first page of a PDF resume, send it to Google Gemini together with \
a job description and one of three instructions (summary, percentage match, skill advice), \
and print the answer.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Job description text.
    #[arg(short = 'j', long, conflicts_with = "job_file")]
    job_description: Option<String>,

    /// Read the job description from this file.
    #[arg(long)]
    job_file: Option<PathBuf>,

    /// Resume PDF: local file path or HTTP/HTTPS URL.
    #[arg(short, long, env = "RESUME_ATS_RESUME")]
    resume: Option<String>,

    /// Action: "Tell me about the resume".
    #[arg(long)]
    summary: bool,

    /// Action: "Percentage match".
    #[arg(long)]
    percentage_match: bool,

    /// Action: "How can I improve my Skills?".
    #[arg(long)]
    improve_skills: bool,

    /// Gemini model ID.
    #[arg(long, env = "RESUME_ATS_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, env = "RESUME_ATS_API_BASE")]
    api_base: Option<String>,

    /// Model call timeout in seconds.
    #[arg(long, env = "RESUME_ATS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Download timeout for URL resumes in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Page to render (1-indexed).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,

    /// Render scale relative to 72 DPI.
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// PDF user password for encrypted resumes.
    #[arg(long)]
    password: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Output the response as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the response and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load a `.env` file before clap reads env-backed flags.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    // ── Inputs ───────────────────────────────────────────────────────────
    let job_description = read_job_description(&cli).await?;

    let document = match cli.resume.as_deref() {
        Some(input) => Some(
            load_document(input, cli.download_timeout)
                .await
                .context("Failed to read resume")?,
        ),
        None => None,
    };
    if document.is_some() && !cli.quiet {
        eprintln!("{} PDF loaded successfully", cyan("◆"));
    }

    // ── Select the action before any credential is needed ────────────────
    let mut selector = TemplateSelector::new();
    let template = match select_action(&cli, document.as_ref(), &mut selector) {
        Ok(Some(template)) => template,
        Ok(None) => {
            eprintln!(
                "{} Choose exactly one of --summary, --percentage-match, --improve-skills",
                cyan("⚠")
            );
            std::process::exit(2);
        }
        Err(AtsError::MissingDocument) => {
            eprintln!("{} Please upload the resume (--resume <PATH|URL>)", red("✘"));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    };

    // ── Build config (once) ──────────────────────────────────────────────
    let inference = build_inference_config(&cli)?;
    let render = build_render_config(&cli)?;

    let mut analyzer = ResumeAnalyzer::gemini(inference, render).context("Invalid configuration")?;
    if show_progress {
        analyzer = analyzer.with_progress(CliProgressCallback::new() as ProgressCallback);
    }

    // ── Run the cycle ────────────────────────────────────────────────────
    let outcome = analyzer
        .analyze(document, &job_description, template)
        .await;
    selector.finish();

    match outcome {
        Ok(response) => {
            if cli.json {
                let json =
                    serde_json::to_string_pretty(&response).context("Failed to serialise output")?;
                println!("{json}");
            } else {
                if !cli.quiet {
                    eprintln!("{}", bold("The Response is"));
                }
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(response.text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !response.text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
                if !cli.quiet {
                    eprintln!(
                        "   {} tokens in  /  {} tokens out  ·  {}ms",
                        dim(&fmt_tokens(response.prompt_tokens)),
                        dim(&fmt_tokens(response.output_tokens)),
                        response.duration_ms,
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    }
}

fn triggers(cli: &Cli) -> Triggers {
    Triggers {
        summary: cli.summary,
        percentage_match: cli.percentage_match,
        skill_improvement: cli.improve_skills,
    }
}

/// Start a cycle from the action flags. Needs no configuration.
fn select_action(
    cli: &Cli,
    document: Option<&DocumentBytes>,
    selector: &mut TemplateSelector,
) -> Result<Option<InstructionTemplate>, AtsError> {
    let available = document.is_some_and(|d| !d.is_empty());
    selector.begin(triggers(cli), available)
}

fn build_inference_config(cli: &Cli) -> Result<InferenceConfig> {
    let mut builder = InferenceConfig::builder().api_timeout_secs(cli.api_timeout);
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.base_url(base.clone());
    }
    builder.build().context("Invalid inference configuration")
}

fn build_render_config(cli: &Cli) -> Result<RenderConfig> {
    let mut builder = RenderConfig::builder()
        .page_index(cli.page as usize - 1)
        .scale(cli.scale);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    builder.build().context("Invalid render configuration")
}

async fn read_job_description(cli: &Cli) -> Result<String> {
    match (&cli.job_description, &cli.job_file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path)),
        (None, None) => Ok(String::new()),
    }
}

fn fmt_tokens(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string())
}
