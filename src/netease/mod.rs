//! # NetEase Integration Module
//!
//! This module provides the integration layer to the NetEase Cloud Music web
//! API. It implements the vendor's crypto envelope, session authentication,
//! HTTP transport, request orchestration, and response parsing, and exposes
//! the service facade consumed by the CLI layer.
//!
//! ## Architecture
//!
//! ```text
//! Application Layer (CLI, Management)
//!          ↓
//! NetEase Integration Layer
//!     ├── Service Facade (one in-flight query per operation kind)
//!     ├── Query Orchestrator (queues, waves, pagination, fan-out)
//!     ├── Response Parser (pure JSON decode functions)
//!     ├── Authentication (anonymous device registration)
//!     └── Crypto Envelope (weapi / eapi)
//!          ↓
//! HTTP Layer (Transport trait, reqwest)
//!          ↓
//! NetEase Web API
//! ```
//!
//! ## Core Modules
//!
//! - [`service`] - Facade owning the session and at most one in-flight
//!   query handle per operation kind
//! - [`request`] - The per-query orchestrator: fans a logical query out into
//!   cascading dependent requests and emits one terminal result
//! - [`parser`] - Stateless decode functions for each vendor JSON shape
//! - [`crypto`] - The proprietary request envelope (AES + RSA)
//! - [`transport`] - The `Transport` seam and its reqwest implementation
//! - [`auth`] - Anonymous device registration and cookie capture
//! - [`stream`] - Stream URL resolution for a single song
//! - [`lyrics`] / [`covers`] - Thin search providers over the same API

pub mod auth;
pub mod covers;
pub mod crypto;
pub mod lyrics;
pub mod parser;
pub mod request;
pub mod service;
pub mod stream;
pub mod transport;

use serde_json::Value;

/// Name of the session cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "__csrf";

/// Extra cookie pairs the vendor expects on every request.
pub const EXTRA_COOKIES: [&str; 2] = ["os=pc", "appver=2.7.1.198277"];

/// HTTP status codes accepted as a successful API reply.
pub const ACCEPTED_STATUS: std::ops::RangeInclusive<u16> = 200..=207;

/// A raw HTTP reply as handed back by the transport.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: u16,
    pub mimetype: Option<String>,
    pub body: Vec<u8>,
}

/// Transport outcome: a reply, or a network-level error message.
pub type TransportResult = Result<RawReply, String>;

/// Everything that can go wrong with a single API request.
///
/// All variants are handled identically at the single-request level: the
/// message is recorded as the query's last error and that one request's
/// contribution is dropped. None of them abort a query.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    Network(String),
    /// Reply carried an HTTP status outside the accepted range.
    Http(u16),
    /// Reply body was not valid JSON.
    Parse(String),
    /// Well-formed JSON carrying the vendor error envelope (`msg` + `code`).
    Api { message: String, code: i64 },
    /// JSON parsed but an expected key or shape is missing.
    Validation(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(message) => write!(f, "{}", message),
            ApiError::Http(status) => write!(f, "Received HTTP code {}", status),
            ApiError::Parse(message) => write!(f, "{}", message),
            ApiError::Api { message, code } => write!(f, "{} ({})", message, code),
            ApiError::Validation(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Decodes a transport reply into a JSON object.
///
/// The vendor error envelope (a body carrying both `msg` and `code` instead
/// of a payload) wins over everything else, then an out-of-range HTTP status,
/// then a JSON parse failure.
pub fn parse_json_object(reply: TransportResult) -> Result<Value, ApiError> {
    let reply = match reply {
        Ok(reply) => reply,
        Err(message) => return Err(ApiError::Network(message)),
    };

    let parsed: Result<Value, serde_json::Error> = serde_json::from_slice(&reply.body);

    if let Ok(value) = &parsed {
        if let Some(object) = value.as_object() {
            if object.contains_key("msg") && object.contains_key("code") {
                let message = object
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let code = object.get("code").and_then(Value::as_i64).unwrap_or_default();
                return Err(ApiError::Api { message, code });
            }
        }
    }

    if !ACCEPTED_STATUS.contains(&reply.status) {
        return Err(ApiError::Http(reply.status));
    }

    match parsed {
        Ok(value) => Ok(value),
        Err(err) => Err(ApiError::Parse(err.to_string())),
    }
}
