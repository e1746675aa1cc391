//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::analyze::ResumeAnalyzer::with_progress`] to be told when the
//! resume is rendered and when the model call starts and finishes. The CLI
//! uses it to drive a spinner; a GUI or HTTP adapter can forward the events
//! wherever it likes without the library knowing.
//!
//! # Example
//!
//! ```rust
//! use resume_ats::{AnalysisProgressCallback, InstructionTemplate};
//! use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
//!
//! struct Flag(AtomicBool);
//!
//! impl AnalysisProgressCallback for Flag {
//!     fn on_inference_start(&self, _template: InstructionTemplate, _model: &str) {
//!         self.0.store(true, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb: Arc<dyn AnalysisProgressCallback> = Arc::new(Flag(AtomicBool::new(false)));
//! cb.on_inference_start(InstructionTemplate::PercentageMatch, "gemini-1.5-flash");
//! ```

use crate::templates::InstructionTemplate;
use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called before the PDF is opened.
    fn on_render_start(&self, page_index: usize) {
        let _ = page_index;
    }

    /// Called once the page is rendered and encoded.
    ///
    /// # Arguments
    /// * `encoded_len`: length of the base64 payload in bytes
    fn on_render_complete(&self, encoded_len: usize) {
        let _ = encoded_len;
    }

    /// Called just before the model request is sent.
    fn on_inference_start(&self, template: InstructionTemplate, model: &str) {
        let _ = (template, model);
    }

    /// Called when the model answered.
    ///
    /// # Arguments
    /// * `response_len`: byte length of the generated text
    fn on_inference_complete(&self, response_len: usize) {
        let _ = response_len;
    }

    /// Called when any stage fails. The error is still returned to the caller.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
