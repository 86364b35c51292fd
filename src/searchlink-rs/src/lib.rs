//! SearchLink Client Library
//!
//! HTTP client for search-engine REST APIs. Requests built with
//! [`build_request`] are dispatched through a [`Transport`]; non-2xx responses
//! come back as a typed [`ClientError`] instead of a raw response.

mod client;
mod transport;

pub use client::Client;
pub use transport::HttpTransport;

pub use searchlink_core::{
    build_request, format_duration, ApiError, CancellationToken, Config, Context, ErrorCause,
    ErrorDetail, HeaderMap, HttpResponse, Method, Request, RequestError, Response, ResponseBody,
    StatusCode, StatusError, Transport, TransportError,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport failed before a response was available
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    MalformedRequest(#[from] RequestError),

    /// Error status without a body; `text` is the status line
    #[error("{text}")]
    Status { status: u16, text: String },

    #[error("status: {status}, error: {source}")]
    UnreadableBody {
        status: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("status: {status}, error: {source}")]
    UnparseableBody {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// Well-formed error reported by the server
    #[error("{error}")]
    Api { status: u16, error: ApiError },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status of the error response, `None` when no response was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. }
            | ClientError::UnreadableBody { status, .. }
            | ClientError::UnparseableBody { status, .. }
            | ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
