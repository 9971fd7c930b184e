//! Analysis pipeline: validate → convert page 1 → ask the model → render.
//!
//! Three actions share one request shape. Evaluation and percentage match take
//! the narrative path (text returned verbatim); keyword extraction parses JSON.

pub mod handlers;
pub mod keywords;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::converter::{DocumentConverter, PageImage};
use crate::errors::AppError;
use crate::gemini::{GenerativeModel, ModelError};
use crate::session::ResumeSlot;

use self::keywords::{parse_skills, SkillsReport};
use self::prompts::{
    EVALUATION_PROMPT, JOB_DESCRIPTION_WARNING, KEYWORDS_PROMPT, PERCENTAGE_MATCH_PROMPT,
    QUOTA_WARNING, RESUME_WARNING, SKILLS_FAILURE,
};

/// One of the three form buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// "Tell Me About the Resume"
    Evaluate,
    /// "Get Keywords"
    Keywords,
    /// "Percentage Match"
    PercentageMatch,
}

impl Action {
    pub fn instruction(self) -> &'static str {
        match self {
            Action::Evaluate => EVALUATION_PROMPT,
            Action::Keywords => KEYWORDS_PROMPT,
            Action::PercentageMatch => PERCENTAGE_MATCH_PROMPT,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Action::Evaluate => "Resume Evaluation",
            Action::Keywords => "Extracted Skills",
            Action::PercentageMatch => "ATS Match Result",
        }
    }
}

/// What the form shows once an action completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Text {
        heading: &'static str,
        body: String,
    },
    Skills {
        heading: &'static str,
        lines: Vec<String>,
    },
    Failure {
        message: &'static str,
    },
}

/// Aborts before any conversion or model call when a field is missing.
/// The job description is checked first.
pub fn validate(job_description: &str, slot: &ResumeSlot) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::MissingInput {
            field: "job_description",
            message: JOB_DESCRIPTION_WARNING,
        });
    }
    if slot.resume().is_none() {
        return Err(AppError::MissingInput {
            field: "resume",
            message: RESUME_WARNING,
        });
    }
    Ok(())
}

/// Narrative path. Quota exhaustion becomes a warning string after `cooldown`;
/// every other model error propagates.
pub async fn narrative_response(
    model: &dyn GenerativeModel,
    instruction: &str,
    image: &PageImage,
    job_description: &str,
    cooldown: Duration,
) -> Result<String, ModelError> {
    match model.generate(instruction, image, job_description).await {
        Ok(text) => Ok(text),
        Err(ModelError::QuotaExhausted(message)) => {
            warn!(
                "Quota exhausted ({message}); answering with warning after {}s",
                cooldown.as_secs()
            );
            tokio::time::sleep(cooldown).await;
            Ok(QUOTA_WARNING.to_string())
        }
        Err(e) => Err(e),
    }
}

/// Keyword path. `Ok(None)` on quota exhaustion or an unparseable answer.
pub async fn keyword_response(
    model: &dyn GenerativeModel,
    instruction: &str,
    image: &PageImage,
    job_description: &str,
) -> Result<Option<SkillsReport>, ModelError> {
    match model.generate(instruction, image, job_description).await {
        Ok(text) => Ok(parse_skills(&text)),
        Err(e) if e.is_quota_exhausted() => {
            warn!("Keyword extraction skipped: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Runs actions against a session's upload.
#[derive(Clone)]
pub struct Analyzer {
    converter: DocumentConverter,
    model: Arc<dyn GenerativeModel>,
    quota_cooldown: Duration,
}

impl Analyzer {
    pub fn new(
        converter: DocumentConverter,
        model: Arc<dyn GenerativeModel>,
        quota_cooldown: Duration,
    ) -> Self {
        Self {
            converter,
            model,
            quota_cooldown,
        }
    }

    pub async fn analyze(
        &self,
        action: Action,
        job_description: &str,
        slot: &mut ResumeSlot,
    ) -> Result<Rendered, AppError> {
        validate(job_description, slot)?;

        let image = self.converter.page_image(slot).await?;
        info!("Running {action:?} analysis");

        let rendered = match action {
            Action::Evaluate | Action::PercentageMatch => {
                let body = narrative_response(
                    self.model.as_ref(),
                    action.instruction(),
                    &image,
                    job_description,
                    self.quota_cooldown,
                )
                .await?;
                Rendered::Text {
                    heading: action.heading(),
                    body,
                }
            }
            Action::Keywords => {
                match keyword_response(
                    self.model.as_ref(),
                    action.instruction(),
                    &image,
                    job_description,
                )
                .await?
                {
                    Some(report) => Rendered::Skills {
                        heading: action.heading(),
                        lines: report.render_lines(),
                    },
                    None => Rendered::Failure {
                        message: SKILLS_FAILURE,
                    },
                }
            }
        };
        Ok(rendered)
    }
}
