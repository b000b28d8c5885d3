use async_trait::async_trait;
use hook_proxy_core::config::SlackConfig;
use serde::Deserialize;
use url::Url;

use crate::{Notifier, NotifyError, Severity};

const POST_MESSAGE: &str = "chat.postMessage";

/// Posts messages through the Slack Web API.
#[derive(Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    api_url: Url,
    token: String,
    channel: String,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig, channel: String, client: reqwest::Client) -> Self {
        Self { client, api_url: config.api_url.clone(), token: config.token.clone(), channel }
    }

    async fn api_post(
        &self,
        method: &'static str,
        body: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        let url = self
            .api_url
            .join(method)
            .map_err(|e| NotifyError::Api { method, error: e.to_string() })?;
        let response: SlackResponse = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.ok {
            let error = response.error.unwrap_or_else(|| "unknown".to_string());
            return Err(NotifyError::Api { method, error });
        }
        Ok(())
    }
}

fn indicator(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => ":ok:",
        Severity::Error => ":red_circle:",
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, severity: Severity, message: &str) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "channel": self.channel,
            "text": format!("{} {message}", indicator(severity)),
        });
        self.api_post(POST_MESSAGE, &body).await
    }
}
