use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io;

use crate::context::Context;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to read response body: {0}")]
    Body(#[source] io::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl TransportError {
    /// Classify a body read failure.
    ///
    /// A body bound to a [`Context`] fails with the context's own error once
    /// the context ends; that error is recovered here. Anything else is a
    /// [`TransportError::Body`].
    pub fn from_body(error: io::Error) -> Self {
        let context_error = error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<TransportError>());
        match context_error {
            Some(TransportError::Cancelled) => TransportError::Cancelled,
            Some(TransportError::DeadlineExceeded) => TransportError::DeadlineExceeded,
            _ => TransportError::Body(error),
        }
    }

    pub(crate) fn into_io_error(self) -> io::Error {
        let kind = match self {
            TransportError::Cancelled => io::ErrorKind::Interrupted,
            TransportError::DeadlineExceeded => io::ErrorKind::TimedOut,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }
}

/// Exchanges requests and responses with the search engine
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange, aborting when `ctx` is cancelled or its deadline passes
    async fn perform(&self, ctx: &Context, request: Request) -> Result<Box<dyn Response>, TransportError>;

    /// Perform one exchange and decode a successful JSON body into `target`.
    ///
    /// Error responses are returned untouched. The decoded bytes stay readable
    /// through [`Response::body`].
    async fn perform_decode<D>(
        &self,
        ctx: &Context,
        request: Request,
        target: Option<&mut D>,
    ) -> Result<Box<dyn Response>, TransportError>
    where
        D: DeserializeOwned + Send,
    {
        let mut response = self.perform(ctx, request).await?;

        if let Some(target) = target {
            if !response.is_error() {
                if let Some(body) = response.body() {
                    let bytes = body.read_all().await.map_err(TransportError::from_body)?;
                    *target = serde_json::from_slice(&bytes).map_err(TransportError::Decode)?;
                    tracing::trace!(bytes = bytes.len(), "decoded response body");
                }
            }
        }

        Ok(response)
    }
}
