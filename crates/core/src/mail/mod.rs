use crate::config::Settings;
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;

pub mod render;

const DEFAULT_FROM: &str = "noreply@etfpilot.local";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Outbound HTML mail.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// Hands rendered messages to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpMailRelay {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    from: String,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailRelay {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_mail_relay_url()?.to_string();
        let from = settings
            .mail_from
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FROM.to_string());

        let timeout_secs = std::env::var("MAIL_RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build mail relay http client")?;

        Ok(Self {
            http,
            url,
            api_key: settings.mail_relay_api_key.clone(),
            from,
        })
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailRelay {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let body = RelayMessage {
            from: &self.from,
            to,
            subject,
            html,
        };

        let mut req = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req.send().await.context("mail relay request failed")?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("mail relay HTTP {status}: {text}");
        }

        tracing::info!(to, subject, "mail sent");
        Ok(())
    }
}
