use axum::{
    body::{Bytes, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hook_proxy_core::models::Event;
use hook_proxy_github::{DecodeError, VerificationError, decode_push};
use hook_proxy_jenkins::TriggerError;
use thiserror::Error;

use crate::AppState;

/// GitHub caps webhook payloads at 25 MB.
const MAX_PAYLOAD_SIZE: usize = 25 * 1024 * 1024;

/// A failed pipeline step. Any of these ends the request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("error reading body: {0}")]
    Body(axum::Error),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{error}")]
    Trigger { event: Event, error: TriggerError },
}

impl RelayError {
    /// Short label naming the step that failed.
    pub fn context(&self) -> String {
        match self {
            Self::Body(_) | Self::Verification(_) => {
                "failed to parse the request, check your secret".to_string()
            }
            Self::Decode(_) => "failed to decode the payload".to_string(),
            Self::Trigger { event, .. } => format!("{event} failed to trigger jenkins"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::Verification(_) => StatusCode::UNAUTHORIZED,
            Self::Trigger { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response { (self.status(), self.to_string()).into_response() }
}

/// Verify, decode and forward a GitHub webhook to Jenkins, then report the outcome.
pub async fn webhook(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let result = match to_bytes(body, MAX_PAYLOAD_SIZE).await {
        Ok(body) => relay(&state, &parts.headers, body).await,
        Err(e) => Err(RelayError::Body(e)),
    };
    match result {
        Ok((event, response)) => {
            let response = String::from_utf8_lossy(&response).into_owned();
            state.reporter.triggered(&event, &response).await;
            (StatusCode::OK, response).into_response()
        }
        Err(e) => {
            state.reporter.failed(&e.context(), &e).await;
            e.into_response()
        }
    }
}

async fn relay(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(Event, Bytes), RelayError> {
    let payload = state.verifier.verify(headers, body)?;
    let event = decode_push(&payload)?;
    tracing::info!("Triggering jenkins for {event}");
    match state.jenkins.trigger(&event, payload).await {
        Ok(response) => Ok((event, response)),
        Err(error) => Err(RelayError::Trigger { event, error }),
    }
}

#[cfg(test)]
mod tests {
    use hook_proxy_core::models::Repository;

    use super::*;

    #[test]
    fn trigger_context_names_repository_and_ref() {
        let err = RelayError::Trigger {
            event: Event {
                git_ref: "refs/heads/main".to_string(),
                repository: Repository { name: "demo".to_string() },
            },
            error: TriggerError::MissingToken,
        };
        assert_eq!(err.context(), "`demo` `refs/heads/main` failed to trigger jenkins");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        // Printed once, not repeated through the source chain
        assert_eq!(err.to_string(), "repository name missing from payload");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn verification_maps_to_unauthorized() {
        let err = RelayError::from(VerificationError::Mismatch);
        assert_eq!(err.context(), "failed to parse the request, check your secret");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "signature mismatch");
    }
}
