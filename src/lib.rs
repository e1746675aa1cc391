//! # resume-ats
//!
//! Score a PDF resume against a job description with a multimodal LLM.
//!
//! ## Why an image?
//!
//! Resumes are designed to be looked at: two-column layouts, skill bars,
//! icons and tables come out of text extractors scrambled. Rendering the
//! first page and letting a vision model read it keeps the layout intact and
//! needs no OCR step.
//!
//! ## Pipeline Overview
//!
//! ```text
//! trigger ──▶ template      (one of three actions, guarded on a document)
//!               │
//! PDF bytes ──▶ 1. Render   rasterise page 1 via pdfium (spawn_blocking)
//!               2. Encode   RGB → JPEG → base64 EncodedImagePart
//!               3. Infer    [job description, image, instruction] → Gemini
//!               └─▶ text, displayed verbatim
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_ats::{DocumentBytes, InferenceConfig, InstructionTemplate, RenderConfig, ResumeAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GOOGLE_API_KEY once; the analyzer owns the resulting config.
//!     let analyzer = ResumeAnalyzer::gemini(InferenceConfig::from_env()?, RenderConfig::default())?;
//!     let resume = DocumentBytes::from_vec(std::fs::read("resume.pdf")?);
//!     let response = analyzer
//!         .analyze(Some(resume), "Senior backend engineer, Go and distributed systems",
//!                  InstructionTemplate::PercentageMatch)
//!         .await?;
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume-ats` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-ats = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! Rendering needs the pdfium shared library at runtime. It is looked up at
//! [`RenderConfig::pdfium_library`] if set, then in the working directory,
//! then on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod gemini;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod templates;
pub mod trigger;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_sync, ResumeAnalyzer};
pub use config::{InferenceConfig, InferenceConfigBuilder, RenderConfig, RenderConfigBuilder};
pub use error::{AtsError, InferenceError};
pub use gemini::GeminiClient;
pub use pipeline::encode::EncodedImagePart;
pub use pipeline::inference::{run_inference, InferenceRequest, InferenceResponse};
pub use pipeline::input::{load_document, DocumentBytes};
pub use pipeline::render::{rasterize_first_page, rasterize_first_page_blocking};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{ContentPart, GenerativeModel, Generation};
pub use templates::InstructionTemplate;
pub use trigger::{CycleState, TemplateSelector, Triggers};
