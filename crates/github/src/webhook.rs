use axum::{body::Bytes, http::HeaderMap};
use hmac::{Hmac, Mac};
use hook_proxy_core::models::Delivery;
use sha1::Sha1;
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_256_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_HEADER: &str = "x-hub-signature";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("webhook secret is not configured")]
    SecretNotConfigured,
    #[error("signature header missing")]
    MissingSignature,
    #[error("{header} malformed")]
    MalformedSignature { header: &'static str },
    #[error("signature mismatch")]
    Mismatch,
}

/// Authenticates an inbound webhook and hands back the payload.
pub trait Verifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap, body: Bytes) -> Result<Bytes, VerificationError>;
}

/// GitHub's HMAC signature scheme.
///
/// `X-Hub-Signature-256` is checked when present, otherwise the legacy SHA-1
/// `X-Hub-Signature` header is accepted. An empty secret rejects every request.
#[derive(Clone)]
pub struct GitHubSignature {
    secret: Vec<u8>,
}

impl GitHubSignature {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self { Self { secret: secret.into() } }

    pub fn is_configured(&self) -> bool { !self.secret.is_empty() }
}

impl Verifier for GitHubSignature {
    fn verify(&self, headers: &HeaderMap, body: Bytes) -> Result<Bytes, VerificationError> {
        if !self.is_configured() {
            return Err(VerificationError::SecretNotConfigured);
        }
        if let Some(signature) = signature(headers, SIGNATURE_256_HEADER, "sha256=")? {
            let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
                .expect("HMAC can take key of any size");
            mac.update(&body);
            mac.verify_slice(&signature).map_err(|_| VerificationError::Mismatch)?;
        } else if let Some(signature) = signature(headers, SIGNATURE_HEADER, "sha1=")? {
            let mut mac = Hmac::<Sha1>::new_from_slice(&self.secret)
                .expect("HMAC can take key of any size");
            mac.update(&body);
            mac.verify_slice(&signature).map_err(|_| VerificationError::Mismatch)?;
        } else {
            return Err(VerificationError::MissingSignature);
        }
        Ok(body)
    }
}

fn signature(
    headers: &HeaderMap,
    header: &'static str,
    prefix: &str,
) -> Result<Option<Vec<u8>>, VerificationError> {
    let Some(value) = headers.get(header) else {
        return Ok(None);
    };
    let malformed = || VerificationError::MalformedSignature { header };
    let hex_digest =
        value.to_str().map_err(|_| malformed())?.strip_prefix(prefix).ok_or_else(malformed)?;
    hex::decode(hex_digest).map(Some).map_err(|_| malformed())
}

/// Extract the delivery metadata GitHub attaches to every webhook.
pub fn delivery(headers: &HeaderMap) -> Delivery {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Delivery { event: get(EVENT_HEADER), id: get(DELIVERY_HEADER) }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &str = "It's a Secret to Everybody";
    const BODY: &str = "Hello, World!";
    // Test vector from GitHub's webhook validation documentation
    const SHA256: &str = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

    fn sha1_signature(secret: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn verify(secret: &str, pairs: &[(&'static str, &str)]) -> Result<Bytes, VerificationError> {
        GitHubSignature::new(secret).verify(&headers(pairs), Bytes::from_static(BODY.as_bytes()))
    }

    #[test]
    fn accepts_sha256_signature() {
        let body = verify(SECRET, &[(SIGNATURE_256_HEADER, SHA256)]).unwrap();
        assert_eq!(body, BODY.as_bytes());
    }

    #[test]
    fn accepts_legacy_sha1_signature() {
        let signature = sha1_signature(SECRET, BODY);
        assert!(verify(SECRET, &[(SIGNATURE_HEADER, &signature)]).is_ok());
    }

    #[test]
    fn sha256_takes_precedence() {
        let sha1 = sha1_signature(SECRET, BODY);
        let bad_sha256 = format!("sha256={}", "00".repeat(32));
        assert_eq!(
            verify(SECRET, &[(SIGNATURE_256_HEADER, &bad_sha256), (SIGNATURE_HEADER, &sha1)]),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        assert_eq!(
            verify("another secret", &[(SIGNATURE_256_HEADER, SHA256)]),
            Err(VerificationError::Mismatch)
        );
    }

    #[test]
    fn rejects_missing_signature() {
        assert_eq!(verify(SECRET, &[]), Err(VerificationError::MissingSignature));
    }

    #[test]
    fn rejects_malformed_signature() {
        let malformed = VerificationError::MalformedSignature { header: SIGNATURE_256_HEADER };
        assert_eq!(verify(SECRET, &[(SIGNATURE_256_HEADER, "abcdef")]), Err(malformed.clone()));
        assert_eq!(verify(SECRET, &[(SIGNATURE_256_HEADER, "sha256=zz")]), Err(malformed));
    }

    #[test]
    fn empty_secret_rejects_everything() {
        assert_eq!(
            verify("", &[(SIGNATURE_256_HEADER, SHA256)]),
            Err(VerificationError::SecretNotConfigured)
        );
    }

    #[test]
    fn reads_delivery_headers() {
        let delivery = delivery(&headers(&[(EVENT_HEADER, "push"), (DELIVERY_HEADER, "72d3162e")]));
        assert_eq!(delivery.event.as_deref(), Some("push"));
        assert_eq!(delivery.id.as_deref(), Some("72d3162e"));
        assert_eq!(super::delivery(&HeaderMap::new()), Delivery::default());
    }
}
