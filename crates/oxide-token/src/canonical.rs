//! Canonical signing view
//!
//! The signing view is the token with `integrity.signature` and
//! `integrity.token_hash` removed. It is serialized with recursively sorted
//! object keys and no insignificant whitespace; integral floating point
//! values render without a fractional part. The same bytes are hashed for
//! `token_hash` and MACed for `signature.sig`.

use crate::model::OverrideToken;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

type HmacSha256 = Hmac<Sha256>;

/// Largest magnitude for which an integral `f64` is printed as an integer
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Build the signing view of a token as a JSON value
#[must_use]
pub fn signing_view(token: &OverrideToken) -> Value {
    // Serializing plain data structs into a `Value` is infallible.
    let mut view = serde_json::to_value(token).unwrap_or(Value::Null);
    if let Some(integrity) = view.get_mut("integrity").and_then(Value::as_object_mut) {
        integrity.remove("signature");
        integrity.remove("token_hash");
    }
    view
}

/// Canonical string form of the token's signing view
#[must_use]
pub fn canonical_signing_payload(token: &OverrideToken) -> String {
    to_canonical_json(&signing_view(token))
}

/// Deterministic JSON: sorted keys, compact separators
#[must_use]
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                #[allow(clippy::cast_possible_truncation)]
                let _ = write!(out, "{}", f as i64);
            }
            _ => {
                let _ = write!(out, "{n}");
            }
        },
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json escapes exactly the characters JSON requires.
    out.push_str(&Value::String(s.to_owned()).to_string());
}

/// Lowercase hex SHA-256 of a payload
#[must_use]
pub fn sha256_hex(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Base64 HMAC-SHA256 of a payload
#[must_use]
pub fn hmac_sha256_base64(key: &[u8], payload: &str) -> String {
    let mut mac = new_mac(key);
    mac.update(payload.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Constant-time check of a base64 MAC against a payload
///
/// Decode failures and length mismatches return `false`.
#[must_use]
pub fn verify_hmac_sha256_base64(key: &[u8], payload: &str, sig_b64: &str) -> bool {
    let Ok(provided) = BASE64.decode(sig_b64) else {
        return false;
    };
    if provided.is_empty() {
        return false;
    }
    let mut mac = new_mac(key);
    mac.update(payload.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length")
}
