//! Language-model backends.
//!
//! Implements the core [`LanguageModel`] trait:
//! - **[`DisabledModel`]**: always errors; used when `enrichment.provider = "disabled"`.
//!   The enrichment service turns those errors into its fallback payloads.
//! - **[`GeminiModel`]**: calls the Generative Language API's
//!   `models/{model}:generateContent` endpoint.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use corkboard_core::enrichment::LanguageModel;

use crate::config::EnrichmentConfig;

// ============ Disabled Model ============

/// A backend that refuses every request.
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate_structured(
        &self,
        _api_key: &str,
        _prompt: &str,
        _schema: &Value,
    ) -> Result<String> {
        bail!("Enrichment provider is disabled")
    }

    async fn generate_text(&self, _api_key: &str, _prompt: &str) -> Result<String> {
        bail!("Enrichment provider is disabled")
    }
}

// ============ Gemini Model ============

/// Client for the Generative Language API.
///
/// The credential travels in the `x-goog-api-key` header on every call;
/// it is supplied per request because it lives in application state rather
/// than in configuration.
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl GeminiModel {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// POST a `generateContent` request with retry/backoff and return the
    /// concatenated text of the first candidate.
    async fn generate(&self, api_key: &str, body: &Value) -> Result<String> {
        let url = self.endpoint();
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            debug!(model = %self.model, attempt, "generateContent");
            let resp = self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_generate_response(&json);
                    }

                    // 429 or 5xx: try again
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("Gemini API error {}: {}", status, body_text));
                        continue;
                    }

                    // Any other client error is final
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Generation failed after retries")))
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_structured(
        &self,
        api_key: &str,
        prompt: &str,
        schema: &Value,
    ) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });
        self.generate(api_key, &body).await
    }

    async fn generate_text(&self, api_key: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        self.generate(api_key, &body).await
    }
}

/// Extract `candidates[0].content.parts[].text` from a response.
fn parse_generate_response(json: &Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidate parts"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        bail!("Invalid Gemini response: candidate has no text");
    }
    Ok(text)
}

/// Create the configured [`LanguageModel`].
///
/// | Config Value | Backend |
/// |-------------|---------|
/// | `"disabled"` | [`DisabledModel`] |
/// | `"gemini"` | [`GeminiModel`] |
pub fn create_model(config: &EnrichmentConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        other => bail!("Unknown enrichment provider: {}", other),
    }
}
