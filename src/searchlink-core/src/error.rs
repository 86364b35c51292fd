use serde::{Deserialize, Serialize};
use std::fmt;

/// Request construction failed before anything was sent
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("malformed request for {path:?}: {reason}")]
    Malformed { path: String, reason: String },
}

impl RequestError {
    pub(crate) fn malformed(path: &str, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Error status computed locally from a response status line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}")]
pub struct StatusError {
    pub code: u16,
    pub status: String,
}

/// Structured error reported by the search engine in a non-2xx response body.
///
/// Accepts both the flat form (`{"reason": "..."}`) and the nested form
/// (`{"error": {"type": "...", "reason": "..."}, "status": 404}`), where
/// `error` may also be a plain string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Cause(ErrorCause),
}

/// One level of a server-side error cause chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_cause: Vec<ErrorCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Box<ErrorCause>>,
}

impl ApiError {
    /// Decode an error response body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Most specific human-readable reason available
    pub fn reason(&self) -> Option<&str> {
        match &self.error {
            Some(ErrorDetail::Message(message)) => Some(message.as_str()),
            Some(ErrorDetail::Cause(cause)) => cause.reason.as_deref().or(self.reason.as_deref()),
            None => self.reason.as_deref(),
        }
    }

    /// Server error type, e.g. `index_not_found_exception`
    pub fn error_type(&self) -> Option<&str> {
        match &self.error {
            Some(ErrorDetail::Cause(cause)) if !cause.kind.is_empty() => Some(cause.kind.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(status) = self.status {
            parts.push(format!("status: {status}"));
        }
        if let Some(kind) = self.error_type() {
            parts.push(format!("type: {kind}"));
        }
        if let Some(reason) = self.reason() {
            parts.push(format!("reason: {reason}"));
        }

        if parts.is_empty() {
            write!(f, "unknown server error")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

impl std::error::Error for ApiError {}
