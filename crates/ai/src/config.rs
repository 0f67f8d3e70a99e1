use anyhow::{Context, Result};

/// Endpoint base URL when `AI_BASE_URL` is not set. Deployments fronted by a
/// gateway override this.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// Model used when `AI_MODEL_ID` is not set. Haiku keeps per-call latency and
/// cost low for the high-volume features (roadmaps, check-ins).
pub const DEFAULT_MODEL_ID: &str = "claude-3-haiku-20240307";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Invocation-layer configuration loaded from environment variables.
/// Only the API key is required; everything else has a production default.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_key: require_env("ANTHROPIC_API_KEY")?,
            base_url: std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model_id: std::env::var("AI_MODEL_ID")
                .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string()),
            request_timeout_secs: std::env::var("AI_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .context("AI_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
