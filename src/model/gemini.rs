//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ModelBackend, ModelSettings};
use crate::error::AgentError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiBackend {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
    settings: ModelSettings,
}

impl GeminiBackend {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AgentError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::Configuration("Missing GEMINI_API_KEY".into()));
        }
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(Self {
            client,
            model: model.into(),
            api_key,
            base_url: BASE_URL.to_string(),
            settings: ModelSettings::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }]
        });

        let mut gen_config = serde_json::Map::new();
        if let Some(max) = self.settings.max_output_tokens {
            gen_config.insert("maxOutputTokens".into(), max.into());
        }
        if let Some(temp) = self.settings.temperature {
            gen_config.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = self.settings.top_p {
            gen_config.insert("topP".into(), top_p.into());
        }
        if !gen_config.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(gen_config);
        }

        body
    }
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        debug!(model = %self.model, prompt_len = prompt.len(), "Gemini generateContent");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_request_body(prompt))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let retry_after_header = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(|secs| (secs * 1000.0) as u64);
            let body_text = resp.text().await.unwrap_or_default();
            return Err(match status_to_error(status, &body_text) {
                AgentError::RateLimited { retry_after_ms } => AgentError::RateLimited {
                    retry_after_ms: retry_after_header.or(retry_after_ms),
                },
                other => other,
            });
        }

        let data: GeminiResponse = resp.json().await?;
        let candidate = data
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::model("gemini", "No candidates in Gemini response"))?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AgentError::model(
                "gemini",
                format!(
                    "empty completion (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            ));
        }

        Ok(text)
    }
}

/// Map a non-success HTTP status to an error.
fn status_to_error(status: u16, body: &str) -> AgentError {
    match status {
        401 | 403 => AgentError::Authentication(body.to_string()),
        429 => AgentError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => AgentError::api(status, body),
    }
}

/// Read the retry hint from a 429 body: Google's `RetryInfo.retryDelay`
/// (e.g. `"30s"`) or a plain `error.retry_after` in seconds.
fn extract_retry_after(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;

    let from_details = error
        .get("details")
        .and_then(|d| d.as_array())
        .and_then(|details| {
            details
                .iter()
                .find_map(|detail| detail.get("retryDelay").and_then(|d| d.as_str()))
        })
        .and_then(|delay| delay.trim().trim_end_matches('s').parse::<f64>().ok());

    from_details
        .or_else(|| error.get("retry_after").and_then(|r| r.as_f64()))
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| (secs * 1000.0) as u64)
}

// Internal Gemini response types

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_includes_generation_config_only_when_set() {
        let backend = GeminiBackend::new(DEFAULT_MODEL, "key").unwrap();
        let body = backend.build_request_body("hi");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert!(body.get("generationConfig").is_none());

        let backend = backend.with_settings(ModelSettings::builder().temperature(0.2).build());
        let body = backend.build_request_body("hi");
        assert_eq!(body["generationConfig"], json!({ "temperature": 0.2 }));
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = GeminiBackend::new(DEFAULT_MODEL, "  ").unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn status_errors_are_classified() {
        assert!(matches!(status_to_error(403, "denied"), AgentError::Authentication(_)));
        assert!(matches!(status_to_error(429, ""), AgentError::RateLimited { .. }));
        assert!(matches!(
            status_to_error(503, "overloaded"),
            AgentError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn rate_limit_body_carries_retry_delay() {
        let body = json!({
            "error": {
                "code": 429,
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    { "@type": "type.googleapis.com/google.rpc.QuotaFailure" },
                    { "@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "12.5s" }
                ]
            }
        })
        .to_string();
        assert!(matches!(
            status_to_error(429, &body),
            AgentError::RateLimited { retry_after_ms: Some(12_500) }
        ));

        let body = json!({ "error": { "retry_after": 2 } }).to_string();
        assert_eq!(extract_retry_after(&body), Some(2_000));
        assert_eq!(extract_retry_after("quota exceeded"), None);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let backend = GeminiBackend::new(DEFAULT_MODEL, "secret-key").unwrap();
        assert!(!format!("{backend:?}").contains("secret-key"));
    }
}
