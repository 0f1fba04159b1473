pub mod domain;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod mail;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use error::CoreError;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub koscom_cust_id: Option<String>,
        pub koscom_auth_key: Option<String>,
        pub mail_relay_url: Option<String>,
        pub mail_relay_api_key: Option<String>,
        pub mail_from: Option<String>,
        pub tutor_prompt_path: Option<String>,
        pub recommendation_provider: Option<String>,
        pub analysis_provider: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                koscom_cust_id: std::env::var("KOSCOM_CUST_ID").ok(),
                koscom_auth_key: std::env::var("KOSCOM_AUTH_KEY").ok(),
                mail_relay_url: std::env::var("MAIL_RELAY_URL").ok(),
                mail_relay_api_key: std::env::var("MAIL_RELAY_API_KEY").ok(),
                mail_from: std::env::var("MAIL_FROM").ok(),
                tutor_prompt_path: std::env::var("TUTOR_PROMPT_PATH").ok(),
                recommendation_provider: std::env::var("RECOMMENDATION_LLM_PROVIDER").ok(),
                analysis_provider: std::env::var("ANALYSIS_LLM_PROVIDER").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_koscom_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let cust_id = self
                .koscom_cust_id
                .as_deref()
                .context("KOSCOM_CUST_ID is required")?;
            let auth_key = self
                .koscom_auth_key
                .as_deref()
                .context("KOSCOM_AUTH_KEY is required")?;
            Ok((cust_id, auth_key))
        }

        pub fn require_mail_relay_url(&self) -> anyhow::Result<&str> {
            self.mail_relay_url
                .as_deref()
                .context("MAIL_RELAY_URL is required")
        }

        /// Provider used for the schema-critical scoring and recommendation calls.
        pub fn recommendation_provider(&self) -> &str {
            self.recommendation_provider.as_deref().unwrap_or("openai")
        }

        /// Provider used for news analysis, rebalancing and the tutor.
        pub fn analysis_provider(&self) -> &str {
            self.analysis_provider.as_deref().unwrap_or("anthropic")
        }
    }
}
