//! Jenkins generic-webhook-trigger client.

use bytes::Bytes;
use hook_proxy_core::{config::JenkinsConfig, models::Event, util::UrlExt};
use reqwest::{StatusCode, header};
use thiserror::Error;
use url::Url;

/// Query parameter the generic-webhook-trigger plugin uses to select a job.
pub const TOKEN_PARAM: &str = "token";

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("repository name missing from payload")]
    MissingToken,
    #[error("request to jenkins failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("jenkins responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct Jenkins {
    client: reqwest::Client,
    endpoint: Url,
}

impl Jenkins {
    pub fn new(config: &JenkinsConfig, client: reqwest::Client) -> Self {
        Self { client, endpoint: config.endpoint.clone() }
    }

    /// The configured endpoint with `token=<repository name>` merged into its query.
    pub fn trigger_url(&self, event: &Event) -> Result<Url, TriggerError> {
        let name = event.repository_name();
        if name.is_empty() {
            return Err(TriggerError::MissingToken);
        }
        Ok(self.endpoint.with_query_param(TOKEN_PARAM, name))
    }

    /// Forward the unmodified payload to Jenkins. A single attempt is made and
    /// anything but `200 OK` is an error.
    pub async fn trigger(&self, event: &Event, payload: Bytes) -> Result<Bytes, TriggerError> {
        let url = self.trigger_url(event)?;
        tracing::debug!("URL: {url}");
        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(TriggerError::Status { status, body });
        }
        Ok(response.bytes().await?)
    }
}
