//! Instruction templates sent alongside the resume image.
//!
//! Each user action maps to exactly one fixed directive. Keeping the text
//! here, rather than next to the request builder, lets tests inspect the
//! prompts directly and keeps prompt edits out of the orchestration code.

use serde::{Deserialize, Serialize};
use std::fmt;

// Interior lines end with a space before the newline; the last line does not.

/// Directive for the "Tell me about the resume" action.
pub const RESUME_SUMMARY_PROMPT: &str = concat!(
    "\n",
    "You are an experienced Technical Human Resource Manager specializing in talent acquisition and resume evaluation. \n",
    "Review the uploaded resume and provide an insightful analysis, including the applicant's key strengths, areas for improvement, and relevance to the provided job description. \n",
    "Please format your response as a professional summary.\n",
);

/// Directive for the "Percentage match" action.
pub const PERCENTAGE_MATCH_PROMPT: &str = concat!(
    "\n",
    "You are a skilled Applicant Tracking System (ATS) scanner with expertise in evaluating resumes against job descriptions. \n",
    "Analyze the uploaded resume in comparison to the provided job description and give a detailed report on the percentage match. \n",
    "Provide insights on how well the resume aligns with the job requirements and suggest any missing or misaligned qualifications.\n",
);

/// Directive for the "How can I improve my Skills?" action.
pub const SKILL_IMPROVEMENT_PROMPT: &str = concat!(
    "\n",
    "You are an experienced Technical Human Resource Manager specializing in talent acquisition and resume evaluation. \n",
    "Review the uploaded resume and suggest the user how they can improve their skills relevance to the provided job description. \n",
    "Please format your response as a professional summary.\n",
);

/// One of the three predefined instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionTemplate {
    /// Professional summary of strengths, weaknesses and fit.
    ResumeSummary,
    /// ATS-style percentage match with missing qualifications.
    PercentageMatch,
    /// Advice on which skills to improve for the role.
    SkillImprovement,
}

impl InstructionTemplate {
    /// All templates, in trigger order.
    pub const ALL: [InstructionTemplate; 3] = [
        InstructionTemplate::ResumeSummary,
        InstructionTemplate::PercentageMatch,
        InstructionTemplate::SkillImprovement,
    ];

    /// The directive text sent to the model.
    pub fn text(self) -> &'static str {
        match self {
            InstructionTemplate::ResumeSummary => RESUME_SUMMARY_PROMPT,
            InstructionTemplate::PercentageMatch => PERCENTAGE_MATCH_PROMPT,
            InstructionTemplate::SkillImprovement => SKILL_IMPROVEMENT_PROMPT,
        }
    }

    /// Button label shown by the presentation layer.
    pub fn label(self) -> &'static str {
        match self {
            InstructionTemplate::ResumeSummary => "Tell me about the resume",
            InstructionTemplate::PercentageMatch => "Percentage match",
            InstructionTemplate::SkillImprovement => "How can I improve my Skills?",
        }
    }
}

impl fmt::Display for InstructionTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
