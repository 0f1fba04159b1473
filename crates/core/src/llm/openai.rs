use crate::config::Settings;
use crate::llm::error::JudgeError;
use crate::llm::{Provider, TextJudge};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Client for the OpenAI Responses API.
#[derive(Debug, Clone)]
pub struct OpenAiJudge {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiJudge {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    /// First `output_text` of the first `message` output item.
    fn output_text(res: &ResponsesResponse) -> Result<String, JudgeError> {
        let text = res
            .output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .find(|c| c.kind == "output_text")
            .and_then(|c| c.text.clone())
            .ok_or_else(|| JudgeError::MalformedEnvelope {
                provider: Provider::OpenAI,
                detail: "no message/output_text block in response".to_string(),
                raw_output: None,
            })?;

        if text.trim().is_empty() {
            return Err(JudgeError::EmptyResponse {
                provider: Provider::OpenAI,
            });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl TextJudge for OpenAiJudge {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn submit(&self, prompt: &str) -> Result<String, JudgeError> {
        let req = ResponsesRequest {
            model: &self.model,
            input: prompt,
        };

        let url = format!("{}/v1/responses", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| JudgeError::transport(Provider::OpenAI, e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| JudgeError::transport(Provider::OpenAI, format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(JudgeError::transport(
                Provider::OpenAI,
                format!("status={status} body={text}"),
            ));
        }

        let parsed = serde_json::from_str::<ResponsesResponse>(&text).map_err(|e| {
            JudgeError::MalformedEnvelope {
                provider: Provider::OpenAI,
                detail: e.to_string(),
                raw_output: Some(text.clone()),
            }
        })?;
        Self::output_text(&parsed)
    }
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn takes_first_output_text_of_message_item() {
        let raw = json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "42"},
                    {"type": "output_text", "text": "ignored"}
                ]}
            ]
        });
        let res: ResponsesResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(OpenAiJudge::output_text(&res).unwrap(), "42");
    }

    #[test]
    fn missing_message_is_malformed_envelope() {
        let res: ResponsesResponse = serde_json::from_value(json!({"output": []})).unwrap();
        assert!(matches!(
            OpenAiJudge::output_text(&res),
            Err(JudgeError::MalformedEnvelope { .. })
        ));
    }
}
