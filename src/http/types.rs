//! Shared types used by the dispatcher and its callers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::encoder::EncodingError;

/// Request headers, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// Errors raised while dispatching a request. Server-reported failures are not errors;
/// they arrive as [`ApiResponse::Error`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Method outside the supported verb set; raised before any network activity.
    #[error("'{0}' is not a valid HttpMethod")]
    InvalidMethod(String),
    /// Base URL failed to parse or normalize.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed: connection refused, DNS failure, timeout.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Request payload could not be encoded.
    #[error("Failed to encode request payload: {0}")]
    Encoding(#[from] EncodingError),
    /// A success body declared as JSON did not parse.
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    /// Failure raised by a custom [`crate::http::Transport`] implementation.
    #[error("Transport failure: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Supported HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    /// Whether the payload is encoded and sent as the request body.
    pub const fn has_payload(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    /// Upper-case verb.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            "patch" => Ok(Self::Patch),
            _ => Err(DispatchError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a 2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    /// HTTP status in `[200, 300)`.
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string.
    pub data: Value,
}

/// Body of any other response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON error body, or the raw text as a JSON string.
    pub error: Value,
}

/// Outcome of one dispatched call: exactly one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// 2xx response.
    Success(SuccessEnvelope),
    /// Any other response.
    Error(ErrorEnvelope),
}

impl ApiResponse {
    /// HTTP status carried by either envelope.
    pub fn status(&self) -> u16 {
        match self {
            Self::Success(envelope) => envelope.status,
            Self::Error(envelope) => envelope.status,
        }
    }

    /// Normalize into a success body or an error envelope.
    ///
    /// A `Success` envelope whose status falls outside `[200, 300)` is treated as an
    /// error, with its data as the error body.
    pub fn classify(self) -> Result<SuccessEnvelope, ErrorEnvelope> {
        match self {
            Self::Success(envelope) if is_success(envelope.status) => Ok(envelope),
            Self::Success(SuccessEnvelope { status, data }) => {
                Err(ErrorEnvelope { status, error: data })
            }
            Self::Error(envelope) => Err(envelope),
        }
    }
}

/// Status codes in `[200, 300)`.
pub const fn is_success(status: u16) -> bool {
    status >= 200 && status < 300
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_methods_case_insensitively() {
        for (input, expected) in [
            ("get", HttpMethod::Get),
            ("POST", HttpMethod::Post),
            ("Put", HttpMethod::Put),
            ("delete", HttpMethod::Delete),
            ("patch", HttpMethod::Patch),
        ] {
            assert_eq!(input.parse::<HttpMethod>().expect("valid method"), expected);
        }
    }

    #[test]
    fn rejects_unknown_methods() {
        let err = "invalid_method".parse::<HttpMethod>().expect_err("invalid");
        assert_eq!(err.to_string(), "'invalid_method' is not a valid HttpMethod");
        assert!("HEAD".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn only_post_and_put_carry_payloads() {
        assert!(HttpMethod::Post.has_payload());
        assert!(HttpMethod::Put.has_payload());
        assert!(!HttpMethod::Get.has_payload());
        assert!(!HttpMethod::Delete.has_payload());
        assert!(!HttpMethod::Patch.has_payload());
    }

    #[test]
    fn classify_demotes_success_with_error_status() {
        let response = ApiResponse::Success(SuccessEnvelope {
            status: 404,
            data: json!({"error": "missing"}),
        });
        let error = response.classify().expect_err("non-2xx");
        assert_eq!(error.status, 404);
        assert_eq!(error.error, json!({"error": "missing"}));
    }

    #[test]
    fn classify_keeps_success_envelopes() {
        let response = ApiResponse::Success(SuccessEnvelope {
            status: 201,
            data: json!("ok"),
        });
        assert_eq!(response.status(), 201);
        assert_eq!(response.classify().expect("2xx").data, json!("ok"));
    }
}
