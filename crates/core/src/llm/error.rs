use crate::llm::Provider;

#[derive(Debug, Clone, thiserror::Error)]
pub enum JudgeError {
    #[error("LLM transport error (provider={provider:?}): {detail}")]
    Transport { provider: Provider, detail: String },

    #[error("LLM returned an empty response (provider={provider:?})")]
    EmptyResponse { provider: Provider },

    #[error("LLM response envelope malformed (provider={provider:?}): {detail}")]
    MalformedEnvelope {
        provider: Provider,
        detail: String,
        raw_output: Option<String>,
    },
}

impl JudgeError {
    pub fn transport(provider: Provider, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider,
            detail: detail.to_string(),
        }
    }
}
