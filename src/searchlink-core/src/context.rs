//! Per-call execution context
//!
//! A [`Context`] carries the cancellation signal and optional deadline for a
//! single dispatch. Transports race the network exchange against it.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::transport::TransportError;

#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Context cancelled together with `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `future` until it completes or the context ends, whichever comes first
    pub async fn run<F>(&self, future: F) -> Result<F::Output, TransportError>
    where
        F: Future,
    {
        if self.token.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(TransportError::DeadlineExceeded);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TransportError::Cancelled),
            _ = deadline => Err(TransportError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }

    /// Bind a body stream to this context.
    ///
    /// Every chunk is awaited under [`Context::run`]. Once the context ends the
    /// stream yields one error wrapping the [`TransportError`] and stops; see
    /// [`TransportError::from_body`].
    pub fn bind_stream<S, T>(&self, stream: S) -> BoxStream<'static, io::Result<T>>
    where
        S: Stream<Item = io::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let state = Some((self.clone(), stream.boxed()));
        stream::unfold(state, |state| async move {
            let (ctx, mut inner) = state?;
            match ctx.run(inner.next()).await {
                Ok(Some(item)) => Some((item, Some((ctx, inner)))),
                Ok(None) => None,
                Err(e) => Some((Err(e.into_io_error()), None)),
            }
        })
        .boxed()
    }
}
