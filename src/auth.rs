//! Inbound request authentication.
//!
//! A request is trusted when its body carries a valid HMAC-SHA256 signature
//! from the provider, or when the caller presents the shared workflow token.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the lowercase hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-cal-signature-256";

/// Query parameter carrying the trusted-caller token.
pub const TOKEN_PARAM: &str = "token";

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(payload: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_signature(payload: &[u8], signature: Option<&str>, secret: Option<&str>) -> bool {
    let (Some(signature), Some(secret)) = (signature, secret) else {
        return false;
    };
    if signature.is_empty() || secret.is_empty() {
        return false;
    }

    match sign(payload, secret) {
        Some(expected) => timing_safe_eq(signature.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

pub fn verify_token(supplied: Option<&str>, expected: Option<&str>) -> bool {
    match (supplied, expected) {
        (Some(supplied), Some(expected)) if !expected.is_empty() => {
            timing_safe_eq(supplied.as_bytes(), expected.as_bytes())
        }
        _ => false,
    }
}

/// Signature valid OR workflow token valid.
pub fn is_authorized(
    config: &AppConfig,
    payload: &[u8],
    signature: Option<&str>,
    token: Option<&str>,
) -> bool {
    verify_signature(payload, signature, config.webhook_secret.as_deref())
        || verify_token(token, config.workflow_token.as_deref())
}

fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
