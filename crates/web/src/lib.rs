mod handlers;

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::ConnectInfo,
    http::{HeaderName, Request, StatusCode, header},
};
use hook_proxy_core::config::{Config, ServerConfig};
use hook_proxy_github::{
    GitHubSignature, Verifier,
    webhook::{SIGNATURE_256_HEADER, SIGNATURE_HEADER},
};
use hook_proxy_jenkins::Jenkins;
use hook_proxy_notify::{Notifier, Reporter};
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::{Level, Span};

pub use crate::handlers::{RelayError, build_router};

/// Everything a request handler needs. Built once at startup, read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn Verifier>,
    pub jenkins: Arc<Jenkins>,
    pub reporter: Reporter,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let client = http_client(&config.server).context("Failed to create HTTP client")?;
        let verifier = GitHubSignature::new(config.github.webhook_secret.as_bytes());
        if !verifier.is_configured() {
            tracing::warn!("GITHUB_SECRET is not set, every webhook will be rejected");
        }
        let notifier = hook_proxy_notify::from_config(&config.slack, client.clone());
        tracing::info!("Forwarding webhooks to {}", config.jenkins.endpoint);
        Ok(Self::with_parts(
            Arc::new(verifier),
            Jenkins::new(&config.jenkins, client),
            notifier,
        ))
    }

    pub fn with_parts(
        verifier: Arc<dyn Verifier>,
        jenkins: Jenkins,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { verifier, jenkins: Arc::new(jenkins), reporter: Reporter::new(notifier) }
    }
}

/// Shared outbound client for Jenkins and Slack.
pub fn http_client(config: &ServerConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.client_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn app(state: AppState) -> Router {
    let sensitive_headers: Arc<[_]> = vec![
        header::AUTHORIZATION,
        HeaderName::from_static(SIGNATURE_256_HEADER),
        HeaderName::from_static(SIGNATURE_HEADER),
    ]
    .into();
    let middleware = ServiceBuilder::new()
        .sensitive_request_headers(sensitive_headers)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DeliveryMakeSpan { level: Level::INFO })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(120),
        ));
    build_router().with_state(state).layer(middleware)
}

/// Request span carrying the client address and the GitHub delivery headers.
#[derive(Debug, Clone)]
pub struct DeliveryMakeSpan {
    level: Level,
}

impl<B> MakeSpan<B> for DeliveryMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(socket_addr)| socket_addr.ip())
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        let delivery = hook_proxy_github::delivery(request.headers());
        let event = delivery.event.as_deref().unwrap_or("[unknown]");
        let delivery_id = delivery.id.as_deref().unwrap_or("[unknown]");
        macro_rules! make_span {
            ($level:expr) => {
                tracing::span!(
                    $level,
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    ip = %ip,
                    event = %event,
                    delivery = %delivery_id,
                )
            }
        }
        match self.level {
            Level::ERROR => make_span!(Level::ERROR),
            Level::WARN => make_span!(Level::WARN),
            Level::INFO => make_span!(Level::INFO),
            Level::DEBUG => make_span!(Level::DEBUG),
            Level::TRACE => make_span!(Level::TRACE),
        }
    }
}
