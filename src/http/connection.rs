use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::http::handler::Handler;
use crate::http::limits::Limits;
use crate::http::reader::{self, RequestError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, WriteState};

/// How long unread request bytes are drained after the response was sent.
const LINGER: Duration = Duration::from_secs(2);

/// One accepted connection: a single request, a single response, then close.
pub struct Connection<S, H> {
    stream: S,
    handler: Arc<H>,
    limits: Limits,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Responding(Request),
    /// Sending an error response the handler never saw.
    Rejecting(Response),
    Closed,
}

impl<S, H> Connection<S, H>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    H: Handler,
{
    pub fn new(stream: S, handler: Arc<H>, limits: Limits) -> Self {
        Self {
            stream,
            handler,
            limits,
            state: ConnectionState::Reading,
        }
    }

    /// Runs the exchange to completion. The stream is shut down on every
    /// exit path.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "shutdown after response failed");
        }
        self.linger().await;

        result
    }

    /// Discards input the parser never consumed, until the peer closes or
    /// [`LINGER`] elapses.
    async fn linger(&mut self) {
        let mut sink = [0u8; 1024];
        let drain = async {
            loop {
                match self.stream.read(&mut sink).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(LINGER, drain).await.is_err() {
            debug!("peer kept the connection open after the response");
        }
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(req) => {
                        info!(method = %req.method(), path = %req.target(), "request received");
                        self.state = ConnectionState::Responding(req);
                    }
                    Err(RequestError::Io(e)) => {
                        return Err(e).context("reading request");
                    }
                    Err(e) => {
                        warn!(error = %e, "rejecting request");
                        self.state =
                            ConnectionState::Rejecting(Response::error(e.status_code(), e.to_string()));
                    }
                },

                ConnectionState::Responding(req) => {
                    let mut writer = ResponseWriter::new(&mut self.stream);
                    let outcome = self.handler.handle(&mut writer, &req).await;

                    match outcome {
                        Ok(()) if writer.state() == WriteState::Init => {
                            warn!(path = %req.target(), "handler wrote no response");
                        }
                        Ok(()) => {}
                        Err(e) if writer.state() == WriteState::Init => {
                            warn!(error = %e, "handler failed before responding");
                            self.state = ConnectionState::Rejecting(Response::internal_error());
                        }
                        Err(e) => return Err(e.context("handler failed mid-response")),
                    }
                }

                ConnectionState::Rejecting(response) => {
                    let mut writer = ResponseWriter::new(&mut self.stream);
                    writer
                        .write_response(&response)
                        .await
                        .context("writing error response")?;
                }

                ConnectionState::Closed => break,
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> Result<Request, RequestError> {
        let read = reader::read_request(&mut self.stream, &self.limits);
        match self.limits.read_timeout() {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| RequestError::TimedOut(limit))?,
            None => read.await,
        }
    }
}
