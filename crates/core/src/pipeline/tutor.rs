use crate::config::Settings;
use crate::domain::audit::TutorRecord;
use crate::llm::TextJudge;
use crate::storage::TutorHistoryStore;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const QUESTION_PLACEHOLDER: &str = "{user_question}";
pub const APOLOGY: &str = "Sorry, something went wrong while preparing the answer. Please try again shortly.";

const DEFAULT_TEMPLATE: &str = include_str!("../../prompts/tutor.txt");

/// Prompt template with a `{user_question}` slot, loaded once at startup.
#[derive(Debug, Clone)]
pub struct TutorTemplate(String);

impl TutorTemplate {
    pub fn new(template: impl Into<String>) -> anyhow::Result<Self> {
        let template = template.into();
        anyhow::ensure!(
            template.contains(QUESTION_PLACEHOLDER),
            "tutor prompt template has no {QUESTION_PLACEHOLDER} placeholder"
        );
        Ok(Self(template))
    }

    pub fn builtin() -> Self {
        Self(DEFAULT_TEMPLATE.to_string())
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        match settings.tutor_prompt_path.as_deref() {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read tutor prompt template {path}"))?;
                Self::new(text)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn render(&self, question: &str) -> String {
        self.0.replace(QUESTION_PLACEHOLDER, question)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorAnswer {
    pub question: String,
    pub answer: String,
    pub model: String,
    pub success: bool,
    pub answered_at: DateTime<Utc>,
}

pub struct Tutor {
    judge: Arc<dyn TextJudge>,
    history: Arc<dyn TutorHistoryStore>,
    template: TutorTemplate,
}

impl Tutor {
    pub fn new(
        judge: Arc<dyn TextJudge>,
        history: Arc<dyn TutorHistoryStore>,
        template: TutorTemplate,
    ) -> Self {
        Self {
            judge,
            history,
            template,
        }
    }

    pub async fn ask(&self, question: &str, member_id: Option<i64>) -> TutorAnswer {
        let model = self.judge.model().to_string();
        let answer = match self.judge.submit(&self.template.render(question)).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(error = %err, "tutor answer failed");
                return TutorAnswer {
                    question: question.to_string(),
                    answer: APOLOGY.to_string(),
                    model,
                    success: false,
                    answered_at: Utc::now(),
                };
            }
        };

        let record = TutorRecord {
            member_id,
            question: question.to_string(),
            answer: answer.clone(),
            model: model.clone(),
        };
        if let Err(err) = self.history.record_tutor(&record).await {
            tracing::warn!(error = %format!("{err:#}"), "failed to record tutor history");
        }

        TutorAnswer {
            question: question.to_string(),
            answer,
            model,
            success: true,
            answered_at: Utc::now(),
        }
    }
}
