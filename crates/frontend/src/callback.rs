//! Outbound control-plane callbacks (spec.md §6): a signed HTTP POST to
//! the job's `callbackURL` documenting node progress/completion.
//!
//! Signed callback format (bit-exact): HMAC-SHA256 of
//! `timestamp_header_value + "." + raw_request_body`, keyed by a shared
//! secret, compared via constant-time equality on the receiving end.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-LinkFlow-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-LinkFlow-Signature";

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("invalid signing secret")]
    InvalidSecret,
    #[error("http error sending callback: {0}")]
    Http(#[from] reqwest::Error),
    #[error("callback endpoint returned status {0}")]
    NonSuccessStatus(reqwest::StatusCode),
}

/// Lowercase hex HMAC-SHA256 of `timestamp + "." + body` keyed by `secret`.
pub fn sign(timestamp: &str, body: &str, secret: &str) -> Result<String, CallbackError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| CallbackError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a received `(timestamp, signature)` pair against `body`,
/// rejecting stale timestamps and comparing the HMAC in constant time
/// (spec.md §6 "Receivers reject ... where the HMAC does not match in
/// constant-time comparison"). Exposed for the receiving side of this
/// protocol (an external control plane callback endpoint, or tests).
pub fn verify(timestamp: &str, signature: &str, body: &str, secret: &str, ttl: std::time::Duration) -> bool {
    let Ok(sent_at) = chrono::DateTime::parse_from_rfc2822(timestamp) else {
        return false;
    };
    let age = (Utc::now() - sent_at.with_timezone(&Utc)).num_seconds().unsigned_abs();
    if age > ttl.as_secs() {
        return false;
    }

    let Ok(expected) = sign(timestamp, body, secret) else {
        return false;
    };
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

pub struct CallbackSender {
    client: reqwest::Client,
    secret: String,
}

impl CallbackSender {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret: secret.into(),
        }
    }

    /// POSTs `body` to `url` with the signed timestamp/signature header
    /// pair (spec.md §6 "Outbound control-plane callbacks").
    pub async fn send(&self, url: &str, body: &serde_json::Value) -> Result<(), CallbackError> {
        let raw_body = serde_json::to_string(body).unwrap_or_default();
        let timestamp = Utc::now().to_rfc2822();
        let signature = sign(&timestamp, &raw_body, &self.secret)?;

        let response = self
            .client
            .post(url)
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .header("Content-Type", "application/json")
            .body(raw_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CallbackError::NonSuccessStatus(response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let timestamp = Utc::now().to_rfc2822();
        let body = r#"{"status":"completed"}"#;
        let signature = sign(&timestamp, body, "shared-secret").unwrap();
        assert!(verify(&timestamp, &signature, body, "shared-secret", std::time::Duration::from_secs(300)));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let timestamp = Utc::now().to_rfc2822();
        let signature = sign(&timestamp, "original", "shared-secret").unwrap();
        assert!(!verify(&timestamp, &signature, "tampered", "shared-secret", std::time::Duration::from_secs(300)));
    }

    #[test]
    fn verify_rejects_stale_timestamp() {
        let stale = (Utc::now() - chrono::Duration::seconds(600)).to_rfc2822();
        let body = "payload";
        let signature = sign(&stale, body, "shared-secret").unwrap();
        assert!(!verify(&stale, &signature, body, "shared-secret", std::time::Duration::from_secs(300)));
    }
}
