//! Typed client for the generative-AI gateway.
//!
//! The gateway is an opaque remote endpoint speaking `{action, payload}` in
//! and `{text}` out, where `text` is expected to contain JSON, possibly
//! wrapped in a markdown code fence. This crate owns response-shape
//! validation and maps every failure mode to a typed [`AiError`]; prompt
//! content is a server-side concern it knows nothing about.

pub mod actions;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub use actions::AiActions;

pub const AI_URL_ENV: &str = "NUZTRACK_AI_URL";
pub const AI_KEY_ENV: &str = "NUZTRACK_AI_KEY";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI features unavailable: no gateway configured")]
    Unavailable,
    #[error("AI gateway returned an empty response")]
    EmptyResponse,
    #[error("AI gateway request failed: {0}")]
    Request(String),
    #[error("AI gateway error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("AI response was not valid JSON: {0}")]
    InvalidJson(String),
}

#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Run one gateway action and return its parsed JSON result.
    async fn generate(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, AiError>;

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GatewayError {
    #[serde(default)]
    error: String,
}

pub struct HttpAiGateway {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAiGateway {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl AiGateway for HttpAiGateway {
    async fn generate(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, AiError> {
        let body = serde_json::json!({ "action": action, "payload": payload });
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| AiError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GatewayError>(&text)
                .map(|parsed| parsed.error)
                .unwrap_or_else(|_| text.trim().to_string());
            return Err(AiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GatewayResponse = response
            .json()
            .await
            .map_err(|error| AiError::Request(error.to_string()))?;
        extract_json(&parsed.text)
    }
}

/// Stand-in used when no gateway is configured. Every call fails with
/// [`AiError::Unavailable`] so dependent features disable themselves instead
/// of erroring per request.
pub struct DisabledAiGateway;

#[async_trait]
impl AiGateway for DisabledAiGateway {
    async fn generate(
        &self,
        _action: &str,
        _payload: serde_json::Value,
    ) -> Result<serde_json::Value, AiError> {
        Err(AiError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Build a gateway from the environment. A missing endpoint degrades to the
/// disabled gateway with a single warning at startup, not a per-call failure.
pub fn gateway_from_env() -> Arc<dyn AiGateway> {
    match std::env::var(AI_URL_ENV) {
        Ok(endpoint) if !endpoint.trim().is_empty() => {
            let api_key = std::env::var(AI_KEY_ENV).ok().filter(|k| !k.is_empty());
            Arc::new(HttpAiGateway::new(endpoint, api_key))
        }
        _ => {
            warn!("{AI_URL_ENV} is not set; AI features unavailable");
            Arc::new(DisabledAiGateway)
        }
    }
}

/// Validate and parse the gateway's text payload: reject empty text, strip at
/// most one wrapping code fence, surface parse failures as typed errors.
pub fn extract_json(text: &str) -> Result<serde_json::Value, AiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    let inner = strip_code_fence(trimmed);
    serde_json::from_str(inner).map_err(|error| AiError::InvalidJson(error.to_string()))
}

/// Strip exactly one matching ```...``` pair, tolerating a language tag on
/// the opening fence. Anything else is returned untouched.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop a language tag such as `json` on the opening line.
    match rest.split_once('\n') {
        Some((first_line, body)) if !first_line.trim().contains(char::is_whitespace) => {
            let tag = first_line.trim();
            if tag.is_empty() || tag.chars().all(|c| c.is_ascii_alphanumeric()) {
                body.trim()
            } else {
                rest.trim()
            }
        }
        _ => rest.trim(),
    }
}
