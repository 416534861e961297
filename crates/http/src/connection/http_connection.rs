use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use http::{HeaderValue, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{DEFAULT_SERVER_NAME, HttpError, Response, SendError, reason_phrase};

/// Per-connection limits, shared by every connection of a server.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Largest accepted `Content-Length`.
    pub max_body_size: usize,
    /// Upper bound for receiving one complete request, body included.
    pub read_timeout: Duration,
    pub server_name: HeaderValue,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1_000_000,
            read_timeout: Duration::from_secs(10),
            server_name: HeaderValue::from_static(DEFAULT_SERVER_NAME),
        }
    }
}

/// A single request/response exchange over one accepted socket.
///
/// The connection reads exactly one request, dispatches it to the handler,
/// writes exactly one response and closes. There is no keep-alive.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    read_timeout: Duration,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, config: &ConnectionConfig) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(config.max_body_size), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new(config.server_name.clone())),
            read_timeout: config.read_timeout,
        }
    }

    /// Drives the exchange to completion.
    ///
    /// - a peer that closes before sending anything gets no response
    /// - a framing error is answered with a plain `400 bad request`
    /// - a handler error is answered with the matching status and its reason phrase
    /// - a handler panic is answered with a plain `500 internal error`
    /// - a read timeout abandons the connection without a response
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        let next = match tokio::time::timeout(self.read_timeout, self.framed_read.next()).await {
            Ok(next) => next,
            Err(_) => {
                warn!(timeout_ms = self.read_timeout.as_millis(), "read timed out, closing connection");
                self.close().await;
                return Err(HttpError::ReadTimeout { timeout_ms: self.read_timeout.as_millis() });
            }
        };

        let request = match next {
            Some(Ok(request)) => request,
            Some(Err(e)) => {
                warn!(cause = %e, "can't decode request");
                self.send_response(Response::text(StatusCode::BAD_REQUEST, "bad request")).await?;
                return Err(e.into());
            }
            None => {
                info!("peer closed before sending a request");
                return Ok(());
            }
        };

        let response = match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let status = e.status();
                warn!(%status, cause = %e, "handler returned an error");
                Response::text(status, reason_phrase(status))
            }
            Err(_) => {
                error!("handler panicked");
                Response::text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };

        self.send_response(response).await
    }

    async fn send_response(&mut self, response: Response) -> Result<(), HttpError> {
        if let Err(e) = self.framed_write.send(response).await {
            error!(cause = %e, "can't send response");
            // nothing was buffered for the rejected response
            if matches!(e, SendError::InvalidResponse { .. }) {
                self.framed_write.send(Response::text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")).await?;
            }
            self.close().await;
            return Err(e.into());
        }

        self.close().await;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.framed_write.get_mut().shutdown().await {
            info!(cause = %e, "shutdown of write half failed");
        }
    }
}
