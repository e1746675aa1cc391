//! The seam between the orchestrator and a concrete generative service.
//!
//! [`GenerativeModel`] receives an ordered slice of [`ContentPart`]s and
//! returns the service's text. The orchestrator only ever talks to this
//! trait, so tests substitute a recording mock and the CLI plugs in
//! [`crate::gemini::GeminiClient`].

use crate::error::InferenceError;
use crate::pipeline::encode::EncodedImagePart;
use async_trait::async_trait;

/// One item of a multi-part prompt. Order is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPart<'a> {
    /// Free text.
    Text(&'a str),
    /// Inline base64 image with its MIME type.
    InlineImage(&'a EncodedImagePart),
}

impl ContentPart<'_> {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(t) => Some(t),
            ContentPart::InlineImage(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::InlineImage(_))
    }
}

/// Text returned by a model, with whatever usage counters the service reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub prompt_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A multimodal text-generation backend.
///
/// Implementations must be `Send + Sync` so one instance can be shared behind
/// an `Arc` by every request of a long-lived process.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Fixed model identifier, for logs and reports.
    fn model_id(&self) -> &str;

    /// Submit `parts` as a single user turn and return the generated text.
    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<Generation, InferenceError>;
}
