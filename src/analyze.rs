//! Pipeline entry points: PDF + job description + template → analysis.
//!
//! [`ResumeAnalyzer`] owns everything a request needs that outlives the
//! request: the model handle (with its credential baked in) and the render
//! settings. Each call to [`ResumeAnalyzer::analyze`] then runs
//! rasterise → encode → infer to completion and keeps nothing afterwards.

use crate::config::{InferenceConfig, RenderConfig};
use crate::error::AtsError;
use crate::gemini::GeminiClient;
use crate::pipeline::inference::{run_inference, InferenceResponse};
use crate::pipeline::input::DocumentBytes;
use crate::pipeline::render;
use crate::progress::ProgressCallback;
use crate::provider::GenerativeModel;
use crate::templates::InstructionTemplate;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The configured pipeline.
///
/// # Example
/// ```rust,no_run
/// use resume_ats::{DocumentBytes, InferenceConfig, InstructionTemplate, RenderConfig, ResumeAnalyzer};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let analyzer = ResumeAnalyzer::gemini(InferenceConfig::from_env()?, RenderConfig::default())?;
/// let resume = DocumentBytes::from_vec(std::fs::read("resume.pdf")?);
/// let response = analyzer
///     .analyze(Some(resume), "Senior backend engineer", InstructionTemplate::PercentageMatch)
///     .await?;
/// println!("{}", response.text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResumeAnalyzer {
    model: Arc<dyn GenerativeModel>,
    render: RenderConfig,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for ResumeAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeAnalyzer")
            .field("model", &self.model.model_id())
            .field("render", &self.render)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn AnalysisProgressCallback>"))
            .finish()
    }
}

impl ResumeAnalyzer {
    /// Analyzer backed by Gemini.
    pub fn gemini(inference: InferenceConfig, render: RenderConfig) -> Result<Self, AtsError> {
        let client = GeminiClient::new(inference)?;
        Ok(Self::with_model(Arc::new(client), render))
    }

    /// Analyzer backed by any [`GenerativeModel`].
    pub fn with_model(model: Arc<dyn GenerativeModel>, render: RenderConfig) -> Self {
        Self {
            model,
            render,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn model(&self) -> &Arc<dyn GenerativeModel> {
        &self.model
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    /// Run the full pipeline once.
    ///
    /// # Errors
    /// - [`AtsError::MissingDocument`]: `document` is `None` or empty; nothing
    ///   is rendered and the model is not called
    /// - [`AtsError::DocumentProcessing`]: the PDF could not be rasterised;
    ///   the model is not called
    /// - [`AtsError::InferenceService`]: the model call failed
    pub async fn analyze(
        &self,
        document: Option<DocumentBytes>,
        job_description: &str,
        template: InstructionTemplate,
    ) -> Result<InferenceResponse, AtsError> {
        let result = self.analyze_inner(document, job_description, template).await;
        if let (Err(e), Some(cb)) = (&result, &self.progress) {
            cb.on_error(&e.to_string());
        }
        result
    }

    async fn analyze_inner(
        &self,
        document: Option<DocumentBytes>,
        job_description: &str,
        template: InstructionTemplate,
    ) -> Result<InferenceResponse, AtsError> {
        let total_start = Instant::now();

        // ── Step 1: Rasterise + encode ───────────────────────────────────────
        if let Some(ref cb) = self.progress {
            cb.on_render_start(self.render.page_index);
        }
        let render_start = Instant::now();
        let image_parts = render::rasterize_first_page(document, &self.render).await?;
        info!(
            "Rendered resume page {} in {}ms",
            self.render.page_index + 1,
            render_start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.progress {
            let encoded_len = image_parts.iter().map(|p| p.data.len()).sum();
            cb.on_render_complete(encoded_len);
        }

        // ── Step 2: Inference ────────────────────────────────────────────────
        if let Some(ref cb) = self.progress {
            cb.on_inference_start(template, self.model.model_id());
        }
        let response =
            run_inference(self.model.as_ref(), job_description, &image_parts, template).await?;
        if let Some(ref cb) = self.progress {
            cb.on_inference_complete(response.text.len());
        }

        info!(
            "Analysis complete: {} chars in {}ms total",
            response.text.len(),
            total_start.elapsed().as_millis()
        );

        Ok(response)
    }

    /// Synchronous wrapper around [`ResumeAnalyzer::analyze`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from inside
    /// an async context.
    pub fn analyze_sync(
        &self,
        document: Option<DocumentBytes>,
        job_description: &str,
        template: InstructionTemplate,
    ) -> Result<InferenceResponse, AtsError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| AtsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.analyze(document, job_description, template))
    }
}

/// One-shot analysis with a Gemini-backed analyzer.
///
/// Builds the client from `inference`, runs the pipeline and drops the client.
/// Long-lived processes should keep a [`ResumeAnalyzer`] instead.
pub async fn analyze(
    document: Option<DocumentBytes>,
    job_description: &str,
    template: InstructionTemplate,
    inference: &InferenceConfig,
    render: &RenderConfig,
) -> Result<InferenceResponse, AtsError> {
    ResumeAnalyzer::gemini(inference.clone(), render.clone())?
        .analyze(document, job_description, template)
        .await
}

/// Synchronous wrapper around [`analyze`].
pub fn analyze_sync(
    document: Option<DocumentBytes>,
    job_description: &str,
    template: InstructionTemplate,
    inference: &InferenceConfig,
    render: &RenderConfig,
) -> Result<InferenceResponse, AtsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AtsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(document, job_description, template, inference, render))
}
