//! Trigger handling: which of the three actions was requested, and may it run?
//!
//! ```text
//!         begin(valid trigger, document)         finish()
//!  Idle ─────────────────────────────────▶ Requested(t) ─────────▶ Idle
//!   │ ▲
//!   │ │ no trigger / several triggers → Ok(None)
//!   │ │ trigger without document      → Err(MissingDocument)
//!   └─┘
//! ```
//!
//! The machine knows nothing about buttons or event loops. A presentation
//! layer fills in a [`Triggers`] value per interaction and hands it to
//! [`TemplateSelector::run`] together with whatever document it currently
//! holds.

use crate::analyze::ResumeAnalyzer;
use crate::error::AtsError;
use crate::pipeline::inference::InferenceResponse;
use crate::pipeline::input::DocumentBytes;
use crate::templates::InstructionTemplate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The three user actions, one flag each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    /// "Tell me about the resume"
    pub summary: bool,
    /// "Percentage match"
    pub percentage_match: bool,
    /// "How can I improve my Skills?"
    pub skill_improvement: bool,
}

impl Triggers {
    /// Exactly one active trigger for `template`.
    pub fn only(template: InstructionTemplate) -> Self {
        let mut t = Self::default();
        match template {
            InstructionTemplate::ResumeSummary => t.summary = true,
            InstructionTemplate::PercentageMatch => t.percentage_match = true,
            InstructionTemplate::SkillImprovement => t.skill_improvement = true,
        }
        t
    }

    /// The template for the single active trigger.
    ///
    /// `None` when no trigger or more than one is active.
    pub fn selected(&self) -> Option<InstructionTemplate> {
        match (self.summary, self.percentage_match, self.skill_improvement) {
            (true, false, false) => Some(InstructionTemplate::ResumeSummary),
            (false, true, false) => Some(InstructionTemplate::PercentageMatch),
            (false, false, true) => Some(InstructionTemplate::SkillImprovement),
            _ => None,
        }
    }
}

/// Where the current request cycle stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    #[default]
    Idle,
    Requested(InstructionTemplate),
}

/// Per-interaction state machine guarding the pipeline.
#[derive(Debug, Default)]
pub struct TemplateSelector {
    state: CycleState,
}

impl TemplateSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Try to start a cycle.
    ///
    /// * `Ok(None)`: no valid trigger; stays `Idle`.
    /// * `Err(MissingDocument)`: valid trigger but nothing uploaded; stays `Idle`.
    /// * `Ok(Some(t))`: moves to `Requested(t)`.
    pub fn begin(
        &mut self,
        triggers: Triggers,
        document_available: bool,
    ) -> Result<Option<InstructionTemplate>, AtsError> {
        let Some(template) = triggers.selected() else {
            debug!("No single trigger active ({:?}); staying idle", triggers);
            self.state = CycleState::Idle;
            return Ok(None);
        };

        if !document_available {
            self.state = CycleState::Idle;
            return Err(AtsError::MissingDocument);
        }

        self.state = CycleState::Requested(template);
        Ok(Some(template))
    }

    /// End the cycle after a response or an error.
    pub fn finish(&mut self) {
        self.state = CycleState::Idle;
    }

    /// Drive one complete cycle: select, run the pipeline, return to `Idle`.
    ///
    /// Returns `Ok(None)` when no valid trigger was active.
    pub async fn run(
        &mut self,
        analyzer: &ResumeAnalyzer,
        triggers: Triggers,
        document: Option<DocumentBytes>,
        job_description: &str,
    ) -> Result<Option<InferenceResponse>, AtsError> {
        let available = document.as_ref().is_some_and(|d| !d.is_empty());
        let Some(template) = self.begin(triggers, available)? else {
            return Ok(None);
        };

        let result = analyzer.analyze(document, job_description, template).await;
        self.finish();
        result.map(Some)
    }
}
