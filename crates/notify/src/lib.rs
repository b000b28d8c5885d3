//! Outcome reporting: every outcome is logged, and optionally posted to chat.

mod slack;

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use hook_proxy_core::{config::SlackConfig, models::Event};
pub use slack::SlackNotifier;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request to slack failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("slack API {method} failed: {error}")]
    Api { method: &'static str, error: String },
}

/// A chat sink for outcome messages. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, severity: Severity, message: &str) -> Result<(), NotifyError>;
}

/// Used when no chat channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _severity: Severity, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Pick the notifier for the configuration: Slack when a channel is set, otherwise a no-op.
pub fn from_config(config: &SlackConfig, client: reqwest::Client) -> Arc<dyn Notifier> {
    match &config.channel {
        Some(channel) => {
            tracing::info!("Slack notifications enabled for {channel}");
            Arc::new(SlackNotifier::new(config, channel.clone(), client))
        }
        None => {
            tracing::info!("Slack notifications disabled");
            Arc::new(NoopNotifier)
        }
    }
}

pub fn success_message(event: &Event, response: &str) -> String {
    format!("{event} message:\n```{response}\njenkins has been successfully triggered```")
}

pub fn failure_message(context: &str, error: &dyn Display) -> String {
    format!("{context}:\n```\n{error}\n```")
}

/// Logs every outcome and forwards it to the notifier.
/// Notifier failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct Reporter {
    notifier: Arc<dyn Notifier>,
}

impl Reporter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self { Self { notifier } }

    pub async fn triggered(&self, event: &Event, response: &str) {
        tracing::info!(
            repository = %event.repository_name(),
            git_ref = %event.git_ref,
            "{response}\njenkins has been successfully triggered"
        );
        self.send(Severity::Success, &success_message(event, response)).await;
    }

    pub async fn failed(&self, context: &str, error: &(dyn Display + Sync)) {
        tracing::error!("{context}: {error}");
        self.send(Severity::Error, &failure_message(context, error)).await;
    }

    async fn send(&self, severity: Severity, message: &str) {
        if let Err(e) = self.notifier.notify(severity, message).await {
            tracing::error!("Failed to send to slack: {e}");
        }
    }
}
