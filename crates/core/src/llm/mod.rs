use crate::config::Settings;
use crate::llm::error::JudgeError;
use std::sync::Arc;

pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

/// A text-completion model used as an external judge: prompt in, raw text out.
#[async_trait::async_trait]
pub trait TextJudge: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    async fn submit(&self, prompt: &str) -> Result<String, JudgeError>;
}

/// Builds the judge named by `provider` (`anthropic` or `openai`).
pub fn judge_from_settings(settings: &Settings, provider: &str) -> anyhow::Result<Arc<dyn TextJudge>> {
    match provider.trim().to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => Ok(Arc::new(anthropic::AnthropicJudge::from_settings(settings)?)),
        "openai" | "gpt" => Ok(Arc::new(openai::OpenAiJudge::from_settings(settings)?)),
        other => anyhow::bail!("unknown LLM provider: {other}"),
    }
}
