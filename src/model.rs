//! AI model boundary.
//!
//! Every pipeline stage that talks to the model goes through the
//! [`ModelClient`] trait: a chat-completion-style request with a
//! `json_object` response format, parsed into `serde_json::Value` at the
//! boundary. Stage code owns the prompt and the typed result; this module
//! owns transport, retry, and response parsing.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Requests also carry a hard timeout (`model.timeout_secs`) so a hung
//! endpoint fails the call instead of blocking the pipeline indefinitely.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ModelConfig;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Which pipeline stage issued the request. Used for logging and lets test
/// doubles script a different response per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Transcription,
    Classification,
    FieldExtraction,
    IdentifierExtraction,
    MatchValidation,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Transcription => "transcription",
            RequestKind::Classification => "classification",
            RequestKind::FieldExtraction => "field_extraction",
            RequestKind::IdentifierExtraction => "identifier_extraction",
            RequestKind::MatchValidation => "match_validation",
        }
    }
}

/// A single JSON-object completion request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub kind: RequestKind,
    pub system: String,
    pub user: String,
    /// Base64-encoded images attached for vision-capable models.
    pub images: Vec<String>,
}

impl ModelRequest {
    pub fn new(kind: RequestKind, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
            user: user.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Trait for model backends. The HTTP implementation is [`HttpModelClient`];
/// tests use scripted doubles.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Issue the request and return the parsed JSON object from the
    /// response content.
    async fn complete(&self, request: ModelRequest) -> Result<serde_json::Value>;
}

/// Instantiate a client from configuration.
///
/// `"disabled"` yields a client whose calls always fail; every stage then
/// degrades to its documented default, so the pipeline still runs end to end.
pub fn create_client(config: &ModelConfig) -> Result<Arc<dyn ModelClient>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledClient)),
        "openai" => Ok(Arc::new(HttpModelClient::new(config)?)),
        other => bail!("Unknown model provider: {}", other),
    }
}

/// A no-op client that always returns an error.
pub struct DisabledClient;

#[async_trait]
impl ModelClient for DisabledClient {
    async fn complete(&self, _request: ModelRequest) -> Result<serde_json::Value> {
        bail!("Model provider is disabled")
    }
}

/// Client for any OpenAI-compatible chat-completions endpoint.
pub struct HttpModelClient {
    model: String,
    url: String,
    max_retries: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model.model required for openai provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            max_retries: config.max_retries,
            timeout,
            client,
        })
    }

    fn build_body(&self, request: &ModelRequest) -> serde_json::Value {
        let user_content = if request.images.is_empty() {
            serde_json::json!(request.user)
        } else {
            let mut parts = vec![serde_json::json!({ "type": "text", "text": request.user })];
            for image in &request.images {
                parts.push(serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:image/png;base64,{}", image) },
                }));
            }
            serde_json::json!(parts)
        };

        serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": user_content },
            ],
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<serde_json::Value> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = self.build_body(&request);
        let endpoint = format!("{}/chat/completions", self.url.trim_end_matches('/'));
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&endpoint)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion_content(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Model API error {} for {}: {}",
                            status,
                            request.kind.as_str(),
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!(
                        "Model API error {} for {}: {}",
                        status,
                        request.kind.as_str(),
                        body_text
                    );
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Model call failed after retries")))
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response and
/// parse it as a JSON object.
fn parse_completion_content(json: &serde_json::Value) -> Result<serde_json::Value> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid model response: missing message content"))?;

    let parsed: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| anyhow::anyhow!("Model returned non-JSON content: {}", e))?;

    if !parsed.is_object() {
        bail!("Model returned JSON that is not an object");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_completion_extracts_json_object() {
        let resp = serde_json::json!({
            "choices": [
                { "message": { "content": "{\"category\": \"invoice\"}" } }
            ]
        });
        let parsed = parse_completion_content(&resp).unwrap();
        assert_eq!(parsed["category"], "invoice");
    }

    #[test]
    fn parse_completion_rejects_missing_content() {
        let resp = serde_json::json!({ "choices": [] });
        assert!(parse_completion_content(&resp).is_err());
    }

    #[test]
    fn parse_completion_rejects_non_object_content() {
        let resp = serde_json::json!({
            "choices": [ { "message": { "content": "[1, 2, 3]" } } ]
        });
        assert!(parse_completion_content(&resp).is_err());
    }

    #[tokio::test]
    async fn disabled_client_always_errors() {
        let client = DisabledClient;
        let req = ModelRequest::new(RequestKind::Classification, "sys", "user");
        assert!(client.complete(req).await.is_err());
    }
}
