//! HTTP publisher for the publishing platform.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::info;

use crate::domain::models::{AssembledPost, PublisherConfig};
use crate::domain::ports::{PublishError, PublishReceipt, Publisher};

const POSTS_PATH: &str = "/api/v1/posts";

/// Publishes assembled posts over an authenticated HTTP API.
pub struct HttpPublisher {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    publication: String,
}

impl HttpPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            publication: config.publication.clone(),
        })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, post: &AssembledPost) -> Result<PublishReceipt, PublishError> {
        let body = json!({
            "publication": self.publication,
            "title": post.title,
            "slug": post.slug,
            "body": post.body,
            "meta_description": post.meta_description,
            "tags": post.tags,
            "media": post.media,
        });

        let response = self
            .http
            .post(format!("{}{POSTS_PATH}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PublishError::Timeout
                } else {
                    PublishError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::Auth(detail),
                StatusCode::REQUEST_TIMEOUT => PublishError::Timeout,
                StatusCode::TOO_MANY_REQUESTS => PublishError::RateLimited,
                s if s.is_server_error() => PublishError::Unavailable(format!("{s}: {detail}")),
                s => PublishError::Rejected(format!("{s}: {detail}")),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;
        let published_url = payload
            .get("url")
            .and_then(Value::as_str)
            .map(String::from);
        info!(slug = %post.slug, url = published_url.as_deref(), "post accepted");

        Ok(PublishReceipt { published_url })
    }
}
