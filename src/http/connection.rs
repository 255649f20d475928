use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ServerError;
use crate::http::parser::parse_request;
use crate::http::request::Request;
use crate::http::responder::Responder;
use crate::http::writer::ResponseWriter;
use crate::storage::BlobStore;

/// Bytes taken from the socket per request. Anything past this is dropped.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// State shared by every connection: the responder plus traffic log
/// locations and socket timeouts.
pub struct Handler<S> {
    responder: Responder<S>,
    request_log: PathBuf,
    response_log: PathBuf,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl<S: BlobStore> Handler<S> {
    pub fn new(
        responder: Responder<S>,
        request_log: impl Into<PathBuf>,
        response_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            responder,
            request_log: request_log.into(),
            response_log: response_log.into(),
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn from_config(cfg: &Config, store: S) -> Self {
        let responder = Responder::new(store, &cfg.storage.asset, cfg.routing.unmatched);
        Self::new(
            responder,
            &cfg.storage.request_log,
            &cfg.storage.response_log,
        )
        .with_timeouts(cfg.server.read_timeout(), cfg.server.write_timeout())
    }

    pub fn with_timeouts(mut self, read: Option<Duration>, write: Option<Duration>) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn responder(&self) -> &Responder<S> {
        &self.responder
    }

    fn store(&self) -> &S {
        self.responder.store()
    }
}

/// How a connection ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response of `bytes` length was written.
    Responded { bytes: usize },
    /// The request was unmatched and the policy says to send nothing.
    Ignored,
    /// The peer closed before sending anything.
    PeerClosed,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
    Closed,
}

/// One accepted connection, served start to finish and then closed.
pub struct Connection<T> {
    stream: T,
    peer: SocketAddr,
    state: ConnectionState,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            state: ConnectionState::Reading,
        }
    }

    /// Serves a single request. The stream is shut down and dropped when
    /// this returns, whatever the result.
    pub async fn serve<S: BlobStore>(mut self, handler: &Handler<S>) -> Result<Outcome, ServerError> {
        let result = self.run(handler).await;
        self.close().await;
        result
    }

    async fn run<S: BlobStore>(&mut self, handler: &Handler<S>) -> Result<Outcome, ServerError> {
        let mut outcome = Outcome::PeerClosed;

        loop {
            // Any early return leaves the state at Closed.
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    let Some(raw) = self.read_request(handler.read_timeout).await? else {
                        debug!(peer = %self.peer, "peer closed before sending a request");
                        continue;
                    };

                    let request = parse_request(&raw)?;
                    info!(
                        peer = %self.peer,
                        method = %request.method,
                        path = %request.path,
                        bytes = raw.len(),
                        "request received"
                    );

                    handler.store().append(&handler.request_log, &raw).await?;
                    self.state = ConnectionState::Processing(request);
                }

                ConnectionState::Processing(request) => {
                    match handler.responder.build(&request).await? {
                        Some(response) => {
                            let writer = ResponseWriter::new(&response);
                            handler
                                .store()
                                .overwrite(&handler.response_log, writer.as_bytes())
                                .await?;
                            self.state = ConnectionState::Writing(writer);
                        }
                        None => {
                            warn!(peer = %self.peer, path = %request.path, "request ignored");
                            outcome = Outcome::Ignored;
                        }
                    }
                }

                ConnectionState::Writing(mut writer) => {
                    with_timeout(
                        "write",
                        handler.write_timeout,
                        writer.write_to_stream(&mut self.stream),
                    )
                    .await??;

                    info!(peer = %self.peer, bytes = writer.written(), "response sent");
                    outcome = Outcome::Responded {
                        bytes: writer.written(),
                    };
                }

                ConnectionState::Closed => return Ok(outcome),
            }
        }
    }

    /// Single read of up to [`READ_BUFFER_SIZE`] bytes. `None` means EOF.
    async fn read_request(&mut self, limit: Option<Duration>) -> Result<Option<Vec<u8>>, ServerError> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = with_timeout("read", limit, self.stream.read(&mut buf)).await??;

        if n == 0 {
            return Ok(None);
        }

        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn close(&mut self) {
        self.state = ConnectionState::Closed;
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown failed");
        }
        debug!(peer = %self.peer, "connection closed");
    }
}

async fn with_timeout<F: Future>(
    op: &'static str,
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, ServerError> {
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| ServerError::Timeout { op, after }),
        None => Ok(fut.await),
    }
}
