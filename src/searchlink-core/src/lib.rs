//! SearchLink Core Library
//!
//! Transport-independent building blocks of the SearchLink client:
//! - Request construction (query parameter and header merging)
//! - The response contract every transport implements
//! - Structured server errors
//! - The transport contract and per-call execution context
//! - Client configuration

pub mod config;
pub mod context;
pub mod duration;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use context::Context;
pub use duration::format_duration;
pub use error::{ApiError, ErrorCause, ErrorDetail, RequestError, StatusError};
pub use http::{HeaderMap, Method, StatusCode};
pub use request::{build_request, Request};
pub use response::{HttpResponse, Response, ResponseBody};
pub use transport::{Transport, TransportError};
pub use tokio_util::sync::CancellationToken;
