use hook_proxy_core::models::Event;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error)]
#[error("error parsing body: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Decode a verified push payload. Missing fields decode to empty strings;
/// anything that isn't a JSON object of the expected shape is an error.
pub fn decode_push(payload: &[u8]) -> Result<Event, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    if tracing::enabled!(Level::DEBUG) {
        match serde_json::to_string_pretty(&value) {
            Ok(pretty) => tracing::debug!("Received payload:\n{pretty}"),
            Err(e) => tracing::debug!("Failed to prettify payload: {e}"),
        }
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ref_and_repository_name() {
        let event = decode_push(
            br#"{"ref":"refs/heads/main","before":"0000","repository":{"id":1,"name":"demo","full_name":"src-d/demo"},"pusher":{"name":"x"}}"#,
        )
        .unwrap();
        assert_eq!(event.git_ref, "refs/heads/main");
        assert_eq!(event.repository_name(), "demo");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let event = decode_push(b"{}").unwrap();
        assert_eq!(event, Event::default());
        let event = decode_push(br#"{"repository":{}}"#).unwrap();
        assert!(event.repository_name().is_empty());
    }

    #[test]
    fn null_fields_default_to_empty() {
        let event = decode_push(br#"{"ref":null,"repository":null}"#).unwrap();
        assert_eq!(event, Event::default());
        let event =
            decode_push(br#"{"ref":"refs/heads/main","repository":{"name":null}}"#).unwrap();
        assert_eq!(event.git_ref, "refs/heads/main");
        assert!(event.repository_name().is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(decode_push(b"{\"ref\":").is_err());
        assert!(decode_push(b"").is_err());
        assert!(decode_push(b"ref=refs/heads/main").is_err());
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(decode_push(b"[1, 2, 3]").is_err());
        assert!(decode_push(br#"{"ref":42}"#).is_err());
    }
}
