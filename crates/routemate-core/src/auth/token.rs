//! Decoding of the compact `header.payload.signature` tokens issued by the
//! RouteMate server.
//!
//! # Trust boundary
//!
//! The signature segment is never checked: the client holds no key material.
//! Claims are read at face value and are only ever used for advisory
//! decisions (showing a username, skipping requests with an expired token).
//! The server stays the authority and rejects bad tokens with a 401, which the
//! gateway turns into a session teardown.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Standard alphabet after the `-`/`_` substitution; padding is optional
/// since issuers strip it.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Number of dot-separated segments in a compact token
const TOKEN_SEGMENTS: usize = 3;

#[derive(Error, Debug)]
pub enum MalformedTokenError {
    #[error("Expected 3 token segments, found {0}")]
    SegmentCount(usize),

    #[error("Payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,
}

/// The claims carried in a token's middle segment.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPayload {
    claims: Map<String, Value>,
}

impl TokenPayload {
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// The username the token was issued for: `sub`, falling back to `username`.
    pub fn subject(&self) -> Option<&str> {
        self.claims
            .get("sub")
            .and_then(Value::as_str)
            .or_else(|| self.claims.get("username").and_then(Value::as_str))
    }

    /// The `exp` claim scaled from seconds to milliseconds.
    pub fn expires_at_ms(&self) -> Option<f64> {
        self.claims
            .get("exp")
            .and_then(Value::as_f64)
            .map(|secs| secs * 1000.0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at_ms()
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
    }

    /// True while `now` is strictly before expiry. A token without a numeric
    /// `exp` is never valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at_ms() {
            Some(exp_ms) => (now.timestamp_millis() as f64) < exp_ms,
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// Decode a token's payload without verifying its signature.
pub fn decode(token: &str) -> Result<TokenPayload, MalformedTokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != TOKEN_SEGMENTS {
        return Err(MalformedTokenError::SegmentCount(segments.len()));
    }

    let standard = segments[1].replace('-', "+").replace('_', "/");
    let bytes = PAYLOAD_ENGINE.decode(standard)?;
    let json = String::from_utf8(bytes)?;

    match serde_json::from_str::<Value>(&json)? {
        Value::Object(claims) => Ok(TokenPayload { claims }),
        _ => Err(MalformedTokenError::NotAnObject),
    }
}

/// Build an unsigned token around `claims`, the way the server lays them out.
#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

/// Token for `username` expiring `secs_from_now` seconds from now (negative for the past).
#[cfg(test)]
pub(crate) fn token_expiring_in(username: &str, secs_from_now: i64) -> String {
    let exp = Utc::now().timestamp() + secs_from_now;
    encode_unsigned(&serde_json::json!({ "sub": username, "exp": exp }))
}

// ============================================================================
// Tests
// ============================================================================
