//! Response contract
//!
//! Every transport hands its responses back as a `Box<dyn Response>`, so the
//! dispatch code and callers never see transport internals. [`HttpResponse`]
//! is the plain-data implementation transports adapt their native responses
//! into.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::io;

use crate::error::StatusError;

/// What a transport-level response exposes to callers
pub trait Response: Send + fmt::Debug {
    /// Status line, e.g. `"404 Not Found"`
    fn status(&self) -> String;

    fn status_code(&self) -> u16;

    fn headers(&self) -> &HeaderMap;

    /// Response body, `None` when the transport produced no body at all
    fn body(&mut self) -> Option<&mut ResponseBody>;

    fn is_error(&self) -> bool {
        self.status_code() > 299
    }

    /// Error computed from the status alone; `Some` exactly when [`Response::is_error`]
    fn err(&self) -> Option<StatusError> {
        self.is_error().then(|| StatusError {
            code: self.status_code(),
            status: self.status(),
        })
    }
}

/// Response body owned by its response and released when the response is dropped.
///
/// Starts either buffered or as a byte stream. [`ResponseBody::read_all`]
/// drains a stream once and keeps the bytes, so later readers see the same
/// content.
pub struct ResponseBody {
    state: BodyState,
}

enum BodyState {
    Buffered(Bytes),
    Streaming(BoxStream<'static, io::Result<Bytes>>),
    Failed { kind: io::ErrorKind, message: String },
}

impl ResponseBody {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            state: BodyState::Buffered(bytes.into()),
        }
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            state: BodyState::Streaming(stream.boxed()),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.state, BodyState::Buffered(_))
    }

    /// Read the whole body.
    ///
    /// A failed read is final: the bytes read before the failure are
    /// discarded and every later read fails with the same kind of error.
    pub async fn read_all(&mut self) -> io::Result<Bytes> {
        let stream = match &mut self.state {
            BodyState::Buffered(bytes) => return Ok(bytes.clone()),
            BodyState::Streaming(stream) => stream,
            BodyState::Failed { kind, message } => {
                return Err(io::Error::new(*kind, format!("response body already failed: {message}")));
            }
        };

        let mut buf = BytesMut::new();
        let mut failure = None;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure {
            self.state = BodyState::Failed {
                kind: e.kind(),
                message: e.to_string(),
            };
            return Err(e);
        }

        let bytes = buf.freeze();
        self.state = BodyState::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Consume the body as a byte stream
    pub fn into_stream(self) -> BoxStream<'static, io::Result<Bytes>> {
        match self.state {
            BodyState::Buffered(bytes) => stream::iter(Some(Ok(bytes))).boxed(),
            BodyState::Streaming(stream) => stream,
            BodyState::Failed { kind, message } => {
                stream::iter(Some(Err(io::Error::new(kind, message)))).boxed()
            }
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            BodyState::Buffered(bytes) => f
                .debug_struct("ResponseBody")
                .field("buffered", &bytes.len())
                .finish(),
            BodyState::Streaming(_) => f.debug_struct("ResponseBody").field("streaming", &true).finish(),
            BodyState::Failed { kind, .. } => f.debug_struct("ResponseBody").field("failed", kind).finish(),
        }
    }
}

/// Plain-data response
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<ResponseBody>,
}

impl HttpResponse {
    /// Response with the given status, no headers and no body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn into_body(self) -> Option<ResponseBody> {
        self.body
    }
}

impl Response for HttpResponse {
    fn status(&self) -> String {
        self.status.to_string()
    }

    fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&mut self) -> Option<&mut ResponseBody> {
        self.body.as_mut()
    }
}
