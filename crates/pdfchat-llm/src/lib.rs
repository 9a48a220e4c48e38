//! pdfchat-llm
//!
//! Client for an Ollama-compatible `/api/generate` endpoint, implementing
//! [`pdfchat_core::traits::Generator`]. One non-streaming request per call,
//! no retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use pdfchat_core::config::LlmSettings;
use pdfchat_core::error::{Error, Result};
use pdfchat_core::traits::Generator;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        Self::with_timeout(&settings.base_url, Duration::from_secs(settings.timeout_secs))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')), client })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: &GenerateRequest<'_>) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ExternalCall(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::ExternalCall(format!("{status}: {}", detail.trim())));
        }
        let parsed: GenerateResponse = resp.json().await.map_err(|e| Error::ExternalCall(e.to_string()))?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn try_generate(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        cancel: &CancellationToken,
    ) -> Result<String> {
        debug!(model, endpoint = %self.endpoint, prompt_chars = prompt.len(), "generate");
        let body = GenerateRequest { model, prompt, temperature, stream: false };
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            res = self.post(&body) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_the_generate_api() {
        let body = GenerateRequest { model: "mistral", prompt: "oi", temperature: 0.7, stream: false };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "mistral");
        assert_eq!(json["prompt"], "oi");
        assert_eq!(json["stream"], false);
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let c = OllamaClient::with_timeout("http://localhost:11434/", Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint(), "http://localhost:11434/api/generate");
    }
}
