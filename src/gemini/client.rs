/// Gemini HTTP client implementation.
///
/// This module provides `GeminiClient` for making synchronous HTTP requests to the Gemini API,
/// along with error types and builder patterns for configuration.
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Default API host used when neither the builder nor `GEMINI_BASE_URL` provide one.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model used when neither the builder nor `GEMINI_MODEL` provide one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur when interacting with the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code and the message Gemini returned, if any
    #[error("HTTP error: status {status}: {message}")]
    Http { status: u16, message: String },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Gemini API-specific errors (blocked prompts, empty candidates)
    #[error("Gemini API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No API key was configured
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
}

impl GeminiError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            GeminiError::Timeout(error)
        } else {
            GeminiError::Network(error)
        }
    }
}

/// Sampling parameters forwarded as `generationConfig`.
///
/// Unset fields are omitted from the request so the model defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl GenerationConfig {
    /// Returns true when no parameter is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Builder for constructing `GeminiClient` instances.
///
/// # Examples
///
/// ```
/// use musannif::gemini::GeminiClientBuilder;
///
/// let client = GeminiClientBuilder::new()
///     .api_key("test-key")
///     .model("gemini-1.5-flash")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.model(), "gemini-1.5-flash");
/// ```
#[derive(Debug, Default)]
pub struct GeminiClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiClientBuilder {
    /// Creates a new `GeminiClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Gemini API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model name (e.g., "gemini-1.5-flash").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key sent in the `x-goog-api-key` header.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the per-request timeout. Defaults to 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the `GeminiClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// Values not set on the builder fall back to `GEMINI_BASE_URL`, `GEMINI_MODEL`
    /// and `GEMINI_API_KEY`, then to `DEFAULT_BASE_URL` and `DEFAULT_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` when no key is available, and
    /// `GeminiError::InvalidUrl` when the base URL does not parse.
    pub fn build(self) -> Result<GeminiClient, GeminiError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        let model = match self.model {
            Some(m) => m,
            None => std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        };

        let api_key = match self.api_key {
            Some(key) => key,
            None => std::env::var("GEMINI_API_KEY").map_err(|_| GeminiError::MissingApiKey)?,
        };
        if api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        reqwest::Url::parse(&base_url)
            .map_err(|e| GeminiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            )
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(GeminiError::Network)?;

        Ok(GeminiClient {
            client,
            base_url,
            model,
            api_key,
        })
    }
}

/// Synchronous HTTP client for the Gemini API.
///
/// Constructed once with `GeminiClientBuilder` and shared as
/// `Arc<dyn GenerativeModel>`. Requests are never retried; a failed call
/// surfaces immediately to the caller.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

/// The external text-generation capability.
///
/// This trait is the only network seam of the crate and enables mocking in
/// unit tests.
pub trait GenerativeModel: Send + Sync {
    /// Sends `prompt` to the model and returns the generated text.
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GeminiError>;
}

impl GeminiClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Lists models that support `generateContent`.
    pub fn list_models(&self) -> Result<Vec<String>, GeminiError> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .map_err(GeminiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeminiError::Http {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let json: serde_json::Value = response.json().map_err(GeminiError::from_reqwest)?;

        let models = json
            .get("models")
            .and_then(|m| m.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter(|model| {
                        model
                            .get("supportedGenerationMethods")
                            .and_then(|m| m.as_array())
                            .is_none_or(|methods| {
                                methods.iter().any(|m| m.as_str() == Some("generateContent"))
                            })
                    })
                    .filter_map(|model| model.get("name").and_then(|n| n.as_str()))
                    .map(|name| name.trim_start_matches("models/").to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    fn generate_internal(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GeminiError> {
        let body = request_body(prompt, config)?;

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(GeminiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeminiError::Http {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let json: serde_json::Value = response.json().map_err(GeminiError::from_reqwest)?;
        extract_text(&json)
    }
}

impl GenerativeModel for GeminiClient {
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GeminiError> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "calling generateContent");
        self.generate_internal(prompt, config)
    }
}

/// Builds the `generateContent` request body.
fn request_body(
    prompt: &str,
    config: &GenerationConfig,
) -> Result<serde_json::Value, GeminiError> {
    let mut body = serde_json::json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt } ] }
        ]
    });
    if !config.is_empty() {
        body["generationConfig"] =
            serde_json::to_value(config).map_err(GeminiError::Serialization)?;
    }
    Ok(body)
}

/// Concatenates the text parts of the first candidate.
///
/// A response without candidates usually means the prompt was blocked; the
/// block reason is reported when present.
fn extract_text(json: &serde_json::Value) -> Result<String, GeminiError> {
    let Some(candidate) = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        let reason = json
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
            .unwrap_or("no candidates returned");
        return Err(GeminiError::Api {
            message: reason.to_string(),
        });
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .get("finishReason")
            .and_then(|r| r.as_str())
            .unwrap_or("UNKNOWN");
        return Err(GeminiError::Api {
            message: format!("Candidate has no text (finish reason: {})", reason),
        });
    }

    Ok(text)
}

/// Pulls `error.message` out of a Gemini error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
