//! Webhook request authentication.
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw request body
//! and sends the digest in `X-Hub-Signature-256`.  Verification runs against
//! the exact raw bytes before the body is parsed; anything that fails here
//! never reaches the rest of the pipeline.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::PipelineError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Verify the `X-Hub-Signature-256` header against `body`.
///
/// Missing header, missing `sha256=` prefix, malformed hex, or digest
/// mismatch all fail.  The digest comparison itself is constant-time
/// (`Mac::verify_slice`).
pub fn verify_signature(
    secret: &[u8],
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), PipelineError> {
    let sig_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PipelineError::Auth("missing X-Hub-Signature-256 header".into()))?;

    let sig_hex = sig_header
        .strip_prefix("sha256=")
        .ok_or_else(|| PipelineError::Auth("signature does not start with sha256=".into()))?;

    let sig_bytes = hex::decode(sig_hex)
        .map_err(|e| PipelineError::Auth(format!("invalid hex in signature: {e}")))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| PipelineError::Auth(format!("HMAC key error: {e}")))?;
    mac.update(body);

    mac.verify_slice(&sig_bytes)
        .map_err(|_| PipelineError::Auth("signature mismatch".into()))
}

/// Compute the signature header value for `body`, `sha256=<hex>`.
///
/// The inverse of [`verify_signature`]; used by tests and by operators
/// hand-crafting deliveries with curl.
pub fn signature_for(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(sig: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, sig.parse().unwrap());
        headers
    }

    #[test]
    fn accepts_valid_signature() {
        let secret = b"test-secret";
        let body = b"{\"zen\":\"Keep it logically awesome.\"}";
        let headers = headers_with(&signature_for(secret, body));
        assert!(verify_signature(secret, &headers, body).is_ok());
    }

    #[test]
    fn rejects_flipped_body_byte() {
        let secret = b"test-secret";
        let body = b"payload bytes";
        let headers = headers_with(&signature_for(secret, body));

        let mut tampered = body.to_vec();
        tampered[3] ^= 0x01;
        assert!(verify_signature(secret, &headers, &tampered).is_err());
    }

    #[test]
    fn rejects_flipped_secret_byte() {
        let body = b"payload bytes";
        let headers = headers_with(&signature_for(b"test-secret", body));
        assert!(verify_signature(b"test-secreu", &headers, body).is_err());
    }

    #[test]
    fn rejects_missing_header() {
        let err = verify_signature(b"s", &HeaderMap::new(), b"body").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn rejects_wrong_prefix() {
        let headers = headers_with("sha1=deadbeef");
        assert!(verify_signature(b"s", &headers, b"body").is_err());
    }

    #[test]
    fn rejects_malformed_hex() {
        let headers = headers_with("sha256=not-hex-at-all");
        assert!(verify_signature(b"s", &headers, b"body").is_err());
    }

    #[test]
    fn rejects_truncated_digest() {
        let secret = b"test-secret";
        let body = b"body";
        let full = signature_for(secret, body);
        let headers = headers_with(&full[..full.len() - 2]);
        assert!(verify_signature(secret, &headers, body).is_err());
    }
}
