//! Error types for the resume-ats library.
//!
//! Two types reflect the two places a request can fail:
//!
//! * [`AtsError`]: everything the pipeline can return to its caller: no
//!   document, a document that cannot be rasterised, a bad configuration, or
//!   a failed inference call. None of these are fatal to the host process;
//!   the presentation layer shows the message and waits for the next trigger.
//!
//! * [`InferenceError`]: the detailed cause of a failed call to the
//!   generative service. It is wrapped by [`AtsError::InferenceService`] and
//!   never retried inside the library.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the resume-ats library.
#[derive(Debug, Error)]
pub enum AtsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A trigger fired (or the rasteriser was called) without a document.
    #[error("Please upload the resume (no PDF file was provided)")]
    MissingDocument,

    /// The document path or URL could not be read.
    #[error("Failed to load document '{source_name}': {reason}")]
    DocumentLoad { source_name: String, reason: String },

    /// Local file does not exist.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// The PDF could not be opened, has no usable page, or failed to render
    /// or encode.
    #[error("Error processing the PDF file: {detail}")]
    DocumentProcessing { detail: String },

    // ── Inference errors ──────────────────────────────────────────────────
    /// The request handed to the orchestrator does not have the expected shape.
    #[error("Invalid inference request: {0}")]
    InvalidRequest(String),

    /// The generative service call failed.
    #[error("Inference service error: {0}")]
    InferenceService(#[from] InferenceError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key was supplied.
    #[error("API key is not configured.\nSet {var} (or put it in a .env file) and try again.")]
    MissingApiKey { var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AtsError {
    /// Shorthand for [`AtsError::DocumentProcessing`].
    pub(crate) fn processing(detail: impl Into<String>) -> Self {
        AtsError::DocumentProcessing {
            detail: detail.into(),
        }
    }

    /// True when the failure happened before any network call was made.
    pub fn is_pre_inference(&self) -> bool {
        !matches!(self, AtsError::InferenceService(_))
    }
}

/// Why a call to the generative service failed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum InferenceError {
    /// Connection, TLS or body transfer failure.
    #[error("network error: {detail}")]
    Transport { detail: String },

    /// The call did not finish within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// HTTP 401/403: the API key was rejected.
    #[error("authentication failed (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    /// Any other non-success HTTP status.
    #[error("API returned HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The response body did not contain a usable text candidate.
    #[error("malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// The service refused to answer (safety block).
    #[error("response blocked by the service: {reason}")]
    Blocked { reason: String },
}
