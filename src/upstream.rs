use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use crate::persona::UpstreamPayload;

pub const DEFAULT_GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta2/models/chat-bison-001:generateMessage";

/// Substituted when the upstream answers successfully but without the
/// expected content field.
pub const FALLBACK_CONTENT: &str = "The ether is silent.";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Seam to the generative-language provider. The gateway pipeline only sees
/// this trait; tests inject scripted implementations.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn generate(&self, payload: &UpstreamPayload) -> Result<String, GatewayError>;
}

#[derive(Clone)]
pub struct HttpUpstream {
    http: reqwest::Client,
    generate_url: String,
    api_key: String,
}

impl HttpUpstream {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            generate_url: DEFAULT_GENERATE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_generate_url(mut self, url: impl Into<String>) -> Self {
        self.generate_url = url.into();
        self
    }
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("generate_url", &self.generate_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn generate(&self, payload: &UpstreamPayload) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(&self.generate_url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| GatewayError::Upstream {
                message: format!("upstream request failed: {err}"),
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("upstream generate call failed")
                .to_string();
            return Err(GatewayError::Upstream { message });
        }

        let content = body
            .pointer("/candidates/0/content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
            .unwrap_or(FALLBACK_CONTENT);
        Ok(content.to_string())
    }
}
