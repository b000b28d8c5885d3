use axum::{Router, routing::get};

use crate::AppState;

mod common;
mod webhook;

pub use webhook::RelayError;

/// GitHub may be pointed at any path, so every unmatched request is treated as a webhook.
pub fn build_router() -> Router<AppState> {
    Router::new().route("/healthz", get(common::healthz)).fallback(webhook::webhook)
}
