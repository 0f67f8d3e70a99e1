//! Model endpoint transport — the single point of network contact with the
//! generative-model API.
//!
//! ARCHITECTURAL RULE: no other module in this crate performs network I/O.
//! The rest of the crate sees only the [`ModelEndpoint`] trait and the
//! [`EndpointFault`] a single attempt can raise; retry policy, fault
//! classification, and fallback all live in the invocation controller.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::invocation::request::InvocationRequest;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A fault raised by one network attempt, before classification.
#[derive(Debug, Error)]
pub enum EndpointFault {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// One network attempt against the generative-model endpoint.
///
/// Implementations perform exactly one call per `generate` invocation and
/// raise [`EndpointFault`] on anything short of a usable completion.
/// Carried as `Arc<dyn ModelEndpoint>` so tests can substitute scripted
/// endpoints.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    /// Sends one conversation and returns the completion text.
    async fn generate(&self, request: &InvocationRequest) -> Result<String, EndpointFault>;

    /// Identifier of the model this endpoint targets, for logs and health
    /// reports.
    fn model_id(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// Text of the first text block, if the model produced one.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Production endpoint speaking the Anthropic Messages API over HTTPS.
#[derive(Clone)]
pub struct AnthropicEndpoint {
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
}

impl AnthropicEndpoint {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
        })
    }
}

#[async_trait]
impl ModelEndpoint for AnthropicEndpoint {
    async fn generate(&self, request: &InvocationRequest) -> Result<String, EndpointFault> {
        let body = MessagesRequest {
            model: &self.model_id,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            system: &request.role_context,
            messages: request
                .conversation
                .iter()
                .map(|turn| WireMessage {
                    role: turn.speaker.wire_role(),
                    content: &turn.text,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;

        if !status.is_success() {
            // Prefer the message inside the API's error envelope when it has one.
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(EndpointFault::Api {
                status: status.as_u16(),
                message,
            });
        }

        let decoded: MessagesResponse = serde_json::from_str(&raw)?;
        debug!(
            input_tokens = decoded.usage.input_tokens,
            output_tokens = decoded.usage.output_tokens,
            "model call returned"
        );

        match decoded.text() {
            Some(text) => Ok(text.to_string()),
            None => Err(EndpointFault::EmptyCompletion),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
