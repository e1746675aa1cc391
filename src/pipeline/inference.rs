//! Inference stage: assemble the three-part prompt and call the model.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::templates`], wire format in [`crate::gemini`]; here we only fix
//! the order of the parts and turn the model's answer into an
//! [`InferenceResponse`].
//!
//! ## Part Layout
//!
//! The single user turn contains, in order:
//! 1. the job description, verbatim (empty text is sent as-is)
//! 2. the rasterised resume page as an inline JPEG
//! 3. the instruction template
//!
//! The call is made exactly once. Failures propagate as
//! [`AtsError::InferenceService`]; nothing is retried or cached.

use crate::error::AtsError;
use crate::pipeline::encode::EncodedImagePart;
use crate::provider::{ContentPart, GenerativeModel};
use crate::templates::InstructionTemplate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// One request to the generative service, built fresh per invocation.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    job_description: &'a str,
    image_part: &'a EncodedImagePart,
    instruction: InstructionTemplate,
}

impl<'a> InferenceRequest<'a> {
    /// Validate the rasteriser output and bind the request.
    ///
    /// `image_parts` must hold exactly one element.
    pub fn new(
        job_description: &'a str,
        image_parts: &'a [EncodedImagePart],
        instruction: InstructionTemplate,
    ) -> Result<Self, AtsError> {
        let image_part = match image_parts {
            [single] => single,
            [] => {
                return Err(AtsError::InvalidRequest(
                    "no image part was provided".into(),
                ))
            }
            many => {
                return Err(AtsError::InvalidRequest(format!(
                    "expected exactly one image part, got {}",
                    many.len()
                )))
            }
        };

        Ok(Self {
            job_description,
            image_part,
            instruction,
        })
    }

    pub fn instruction(&self) -> InstructionTemplate {
        self.instruction
    }

    /// Content parts in submission order.
    pub fn parts(&self) -> [ContentPart<'a>; 3] {
        [
            ContentPart::Text(self.job_description),
            ContentPart::InlineImage(self.image_part),
            ContentPart::Text(self.instruction.text()),
        ]
    }
}

/// The service's answer, displayed verbatim by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Generated text, unparsed.
    pub text: String,
    /// Template that produced it.
    pub template: InstructionTemplate,
    /// Model that answered.
    pub model: String,
    /// Input tokens, when the service reports them.
    pub prompt_tokens: Option<u32>,
    /// Output tokens, when the service reports them.
    pub output_tokens: Option<u32>,
    /// Wall-clock time of the service call.
    pub duration_ms: u64,
}

/// Submit `[job_description, image_parts[0], instruction]` to `model`.
pub async fn run_inference(
    model: &dyn GenerativeModel,
    job_description: &str,
    image_parts: &[EncodedImagePart],
    instruction: InstructionTemplate,
) -> Result<InferenceResponse, AtsError> {
    let request = InferenceRequest::new(job_description, image_parts, instruction)?;
    let parts = request.parts();

    info!(
        "Requesting \"{}\" from {} ({} chars of job description)",
        instruction,
        model.model_id(),
        job_description.len()
    );

    let start = Instant::now();
    let generation = model.generate(&parts).await.map_err(|e| {
        warn!("Inference failed: {}", e);
        AtsError::InferenceService(e)
    })?;
    let duration = start.elapsed();

    debug!(
        "{:?} input tokens, {:?} output tokens, {:?}",
        generation.prompt_tokens, generation.output_tokens, duration
    );

    Ok(InferenceResponse {
        text: generation.text,
        template: instruction,
        model: model.model_id().to_string(),
        prompt_tokens: generation.prompt_tokens,
        output_tokens: generation.output_tokens,
        duration_ms: duration.as_millis() as u64,
    })
}
