use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Args;

pub const DEFAULT_MODEL_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent";

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "EDUASSIST_DB_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,
}

impl DatabaseArgs {
    pub fn url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// API key for the generative-text service
    #[arg(long, env = "EDUASSIST_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "EDUASSIST_MODEL_ENDPOINT", default_value = DEFAULT_MODEL_ENDPOINT)]
    pub model_endpoint: String,

    /// Request timeout in seconds
    #[arg(long, env = "EDUASSIST_MODEL_TIMEOUT_SECS", default_value_t = 30)]
    pub model_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl TryFrom<ModelArgs> for ModelConfig {
    type Error = anyhow::Error;

    fn try_from(args: ModelArgs) -> anyhow::Result<Self> {
        let api_key = args
            .api_key
            .filter(|key| !key.trim().is_empty())
            .context("EDUASSIST_API_KEY must be set to call the model API")?;
        ensure!(
            args.model_endpoint.starts_with("https://") || args.model_endpoint.starts_with("http://"),
            "model endpoint must be an http(s) URL, got {}",
            args.model_endpoint
        );
        ensure!(args.model_timeout_secs > 0, "model timeout must be positive");

        Ok(Self {
            endpoint: args.model_endpoint,
            api_key,
            timeout: Duration::from_secs(args.model_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(api_key: Option<&str>) -> ModelArgs {
        ModelArgs {
            api_key: api_key.map(str::to_string),
            model_endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            model_timeout_secs: 30,
        }
    }

    #[test]
    fn builds_model_config() {
        let config = ModelConfig::try_from(args(Some("secret"))).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.endpoint, DEFAULT_MODEL_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn requires_api_key() {
        assert!(ModelConfig::try_from(args(None)).is_err());
        assert!(ModelConfig::try_from(args(Some("  "))).is_err());
    }

    #[test]
    fn rejects_bad_endpoint_and_timeout() {
        let mut bad = args(Some("secret"));
        bad.model_endpoint = "ftp://example.com".to_string();
        assert!(ModelConfig::try_from(bad).is_err());

        let mut bad = args(Some("secret"));
        bad.model_timeout_secs = 0;
        assert!(ModelConfig::try_from(bad).is_err());
    }

    #[test]
    fn database_url_is_required_when_used() {
        let db = DatabaseArgs {
            database_url: None,
            max_connections: 5,
        };
        assert!(db.url().is_err());
    }
}
