//! TC3-HMAC-SHA256 request signing.
//!
//! Tencent Cloud verifies a signature computed over a canonical form of the
//! request. Header order, casing and every newline are part of that form, so
//! the builders here produce it byte for byte.

use chrono::DateTime;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "TC3-HMAC-SHA256";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

const TERMINATOR: &str = "tc3_request";
const SIGNED_HEADERS: [&str; 5] = [
    "content-type",
    "host",
    "x-tc-action",
    "x-tc-timestamp",
    "x-tc-version",
];

type HmacSha256 = Hmac<Sha256>;

/// Everything that goes into one signed call. Built fresh per request.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: &'static str,
    pub canonical_uri: &'static str,
    pub canonical_query: String,
    /// Lower-cased name and value, in signing order.
    pub canonical_headers: Vec<(&'static str, String)>,
    pub payload: Vec<u8>,
    /// Unix seconds.
    pub timestamp: i64,
    /// `YYYY-MM-DD` in UTC, derived from `timestamp`.
    pub date: String,
}

impl SignedRequest {
    pub fn new(
        host: &str,
        action: &str,
        version: &str,
        timestamp: i64,
        payload: Vec<u8>,
    ) -> Self {
        let canonical_headers = vec![
            ("content-type", CONTENT_TYPE_JSON.to_string()),
            ("host", host.to_string()),
            ("x-tc-action", action.to_lowercase()),
            ("x-tc-timestamp", timestamp.to_string()),
            ("x-tc-version", version.to_string()),
        ];

        Self {
            method: "POST",
            canonical_uri: "/",
            canonical_query: String::new(),
            canonical_headers,
            payload,
            timestamp,
            date: utc_date(timestamp),
        }
    }

    /// `content-type;host;x-tc-action;x-tc-timestamp;x-tc-version`
    pub fn signed_headers(&self) -> String {
        SIGNED_HEADERS.join(";")
    }

    pub fn canonical_request(&self) -> String {
        let headers: String = self
            .canonical_headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect();

        format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.canonical_uri,
            self.canonical_query,
            headers,
            self.signed_headers(),
            sha256_hex(&self.payload),
        )
    }

    pub fn credential_scope(&self, service: &str) -> String {
        format!("{}/{}/{}", self.date, service, TERMINATOR)
    }

    pub fn string_to_sign(&self, service: &str) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            self.timestamp,
            self.credential_scope(service),
            sha256_hex(self.canonical_request().as_bytes()),
        )
    }

    /// The value of the `Authorization` header.
    pub fn authorization(&self, secret_id: &str, secret_key: &str, service: &str) -> String {
        let key = derive_signing_key(secret_key, &self.date, service);
        let signature = hex::encode(hmac_sha256(&key, self.string_to_sign(service).as_bytes()));

        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            secret_id,
            self.credential_scope(service),
            self.signed_headers(),
            signature,
        )
    }
}

/// Parameters of [`sign`] that describe the call rather than the caller.
#[derive(Debug, Clone, Copy)]
pub struct RequestParams<'a> {
    pub secret_id: &'a str,
    pub payload: &'a [u8],
}

/// Compute the `Authorization` header value for a POST to `host`.
pub fn sign(
    params: RequestParams<'_>,
    secret_key: &str,
    timestamp: i64,
    service: &str,
    host: &str,
    action: &str,
    version: &str,
) -> String {
    SignedRequest::new(host, action, version, timestamp, params.payload.to_vec()).authorization(
        params.secret_id,
        secret_key,
        service,
    )
}

fn derive_signing_key(secret_key: &str, date: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("TC3{secret_key}").as_bytes(), date.as_bytes());
    let k_service = hmac_sha256(&k_date, service.as_bytes());
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn utc_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}
