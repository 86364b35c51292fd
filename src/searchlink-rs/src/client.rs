use crate::{ClientError, HttpTransport, Result};
use searchlink_core::{ApiError, Config, Context, Request, Response, Transport, TransportError};
use serde::de::DeserializeOwned;

/// SearchLink API client
///
/// Holds only the transport, so one client can be cloned or shared across
/// tasks freely.
#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    transport: T,
}

impl Client {
    /// Create a client over HTTP from the given configuration
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// Client for a local development cluster, see [`Config::local_development`]
    pub fn local_development() -> Result<Self> {
        Self::new(&Config::local_development())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatch a request, decoding a successful JSON body into `target`.
    ///
    /// Only success responses are returned. An error status becomes a
    /// [`ClientError`]: the parsed [`ApiError`] when the body holds one,
    /// otherwise an error carrying the status.
    #[tracing::instrument(skip_all, fields(method = %request.method(), path = %request.path()))]
    pub async fn execute<D>(&self, ctx: &Context, request: Request, target: Option<&mut D>) -> Result<Box<dyn Response>>
    where
        D: DeserializeOwned + Send,
    {
        let mut response = self.transport.perform_decode(ctx, request, target).await?;

        if !response.is_error() {
            tracing::debug!(status = response.status_code(), "request succeeded");
            return Ok(response);
        }

        Err(error_from_response(&mut *response).await)
    }

    /// Dispatch a request without decoding the response body
    pub async fn send(&self, ctx: &Context, request: Request) -> Result<Box<dyn Response>> {
        self.execute(ctx, request, None::<&mut serde_json::Value>).await
    }
}

async fn error_from_response(response: &mut dyn Response) -> ClientError {
    let status = response.status_code();
    let status_text = response.status();

    let Some(body) = response.body() else {
        return ClientError::Status {
            status,
            text: status_text,
        };
    };

    let bytes = match body.read_all().await {
        Ok(bytes) => bytes,
        Err(source) => {
            return match TransportError::from_body(source) {
                TransportError::Body(source) => ClientError::UnreadableBody { status, source },
                ended => ClientError::Transport(ended),
            };
        }
    };

    match ApiError::from_slice(&bytes) {
        Ok(error) => {
            tracing::warn!(status, %error, "server reported an error");
            ClientError::Api { status, error }
        }
        Err(source) => ClientError::UnparseableBody { status, source },
    }
}
