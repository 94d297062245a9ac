use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const STATUS_OK: u16 = 200;
pub const STATUS_MOVED_PERMANENTLY: u16 = 301;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_NOT_ACCEPTABLE: u16 = 406;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Outcome of resolving one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Redirect { location: String },
    Json { body: String },
    Status(u16),
}

impl Reply {
    pub fn bad_request() -> Self {
        Self::Status(STATUS_BAD_REQUEST)
    }

    pub fn not_found() -> Self {
        Self::Status(STATUS_NOT_FOUND)
    }

    pub fn not_acceptable() -> Self {
        Self::Status(STATUS_NOT_ACCEPTABLE)
    }

    pub fn internal_error() -> Self {
        Self::Status(STATUS_INTERNAL_ERROR)
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Redirect { .. } => STATUS_MOVED_PERMANENTLY,
            Self::Json { .. } => STATUS_OK,
            Self::Status(status) => *status,
        }
    }

    /// The proxy-integration response envelope.
    #[must_use]
    pub fn to_gateway(&self) -> GatewayResponse {
        let mut headers = BTreeMap::new();
        let mut body = String::new();
        match self {
            Self::Redirect { location } => {
                headers.insert("Location".to_string(), location.clone());
            }
            Self::Json { body: json } => {
                headers.insert("Content-Type".to_string(), "application/json".to_string());
                body.clone_from(json);
            }
            Self::Status(_) => {}
        }
        GatewayResponse {
            status_code: self.status(),
            headers,
            body,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redirect_envelope_carries_location() {
        let reply = Reply::Redirect {
            location: "https://cdn.example/f40/sha256-00".to_string(),
        };
        assert_eq!(
            serde_json::to_value(reply.to_gateway()).expect("json"),
            json!({
                "statusCode": 301,
                "headers": {"Location": "https://cdn.example/f40/sha256-00"}
            })
        );
    }

    #[test]
    fn error_envelope_is_bare_status() {
        assert_eq!(
            serde_json::to_value(Reply::not_acceptable().to_gateway()).expect("json"),
            json!({"statusCode": 406})
        );
    }

    #[test]
    fn json_envelope_keeps_body_verbatim() {
        let reply = Reply::Json {
            body: "[\n  \"a\"\n]\n".to_string(),
        };
        let envelope = reply.to_gateway();
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.body, "[\n  \"a\"\n]\n");
        assert_eq!(
            envelope.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }
}
