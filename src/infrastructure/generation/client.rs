//! HTTP client for an OpenAI-compatible chat completions API.
//!
//! Implements the `GenerationService` port: one POST per completion, rate
//! limited through the token bucket, with a single repair re-prompt when the
//! response does not parse into the requested shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::models::GenerationConfig;
use crate::domain::ports::{CompletionRequest, GenerationError, GenerationService, ResponseFormat};
use crate::infrastructure::generation::rate_limiter::TokenBucketRateLimiter;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Chat-completions client for the generation service.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    rate_limiter: TokenBucketRateLimiter,
}

impl OpenAiClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            rate_limiter: TokenBucketRateLimiter::new(config.rate_limit_rps),
        })
    }

    async fn send(&self, system: &str, user: &str, wants_json: bool) -> Result<String, GenerationError> {
        self.rate_limiter.acquire().await;

        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        if wants_json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http
            .post(format!("{}{COMPLETIONS_PATH}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(map_status(status, detail));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| GenerationError::Malformed {
                schema: "chat_completion".to_string(),
                reason: "no message content in response".to_string(),
            })
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Value, GenerationError> {
        let system = format!(
            "{}\n\n{}",
            request.instructions,
            format_guidance(&request.format)
        );
        let wants_json = !matches!(request.format, ResponseFormat::Text);

        let content = self.send(&system, &request.input, wants_json).await?;
        match parse_response(&content, &request.format) {
            Ok(value) => Ok(value),
            Err(err) => {
                // One repair re-prompt before giving up on the shape.
                warn!(error = %err, "response malformed, attempting repair");
                let repair = format!(
                    "Your previous response could not be used: {err}.\n\
                     Respond again with only the requested structure, no prose.\n\n\
                     Previous response:\n{content}"
                );
                let repaired = self.send(&system, &repair, wants_json).await?;
                let value = parse_response(&repaired, &request.format)?;
                debug!("repair re-prompt succeeded");
                Ok(value)
            }
        }
    }
}

fn map_status(status: StatusCode, detail: String) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Auth(detail),
        StatusCode::REQUEST_TIMEOUT => GenerationError::Timeout,
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited,
        s if s.is_server_error() => GenerationError::Unavailable(format!("{s}: {detail}")),
        s => GenerationError::InvalidRequest(format!("{s}: {detail}")),
    }
}

/// Instructions describing the shape the caller expects back.
fn format_guidance(format: &ResponseFormat) -> String {
    match format {
        ResponseFormat::Text => "Respond in plain text.".to_string(),
        ResponseFormat::JsonObject {
            schema_name,
            required_keys,
        } => format!(
            "Respond with a single JSON object ({schema_name}) containing at least the keys: {}.",
            required_keys.join(", ")
        ),
        ResponseFormat::JsonArray {
            schema_name,
            required_keys,
        } => format!(
            "Respond with a JSON object with one key '{schema_name}' holding an array of \
             objects, each containing the keys: {}.",
            required_keys.join(", ")
        ),
    }
}

/// Parse and shape-check the raw completion text.
fn parse_response(content: &str, format: &ResponseFormat) -> Result<Value, GenerationError> {
    match format {
        ResponseFormat::Text => Ok(Value::String(content.to_string())),
        ResponseFormat::JsonObject {
            schema_name,
            required_keys,
        } => {
            let value = parse_json(content, schema_name)?;
            let object = value.as_object().ok_or_else(|| malformed(schema_name, "not a JSON object"))?;
            for key in *required_keys {
                if !object.contains_key(*key) {
                    return Err(malformed(schema_name, &format!("missing key '{key}'")));
                }
            }
            Ok(value)
        }
        ResponseFormat::JsonArray {
            schema_name,
            required_keys,
        } => {
            let value = parse_json(content, schema_name)?;
            // Accept either a bare array or the array wrapped under the
            // schema name (the json_object response mode forces an object).
            let items = match &value {
                Value::Array(items) => items.clone(),
                Value::Object(map) => map
                    .get(*schema_name)
                    .and_then(Value::as_array)
                    .cloned()
                    .ok_or_else(|| malformed(schema_name, "no array found"))?,
                _ => return Err(malformed(schema_name, "not a JSON array")),
            };
            for item in &items {
                let object = item
                    .as_object()
                    .ok_or_else(|| malformed(schema_name, "array item is not an object"))?;
                for key in *required_keys {
                    if !object.contains_key(*key) {
                        return Err(malformed(
                            schema_name,
                            &format!("array item missing key '{key}'"),
                        ));
                    }
                }
            }
            Ok(Value::Array(items))
        }
    }
}

/// Parse JSON out of completion text, tolerating Markdown code fences.
fn parse_json(content: &str, schema_name: &str) -> Result<Value, GenerationError> {
    let trimmed = content.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(stripped).map_err(|e| malformed(schema_name, &e.to_string()))
}

fn malformed(schema: &str, reason: &str) -> GenerationError {
    GenerationError::Malformed {
        schema: schema.to_string(),
        reason: reason.to_string(),
    }
}
