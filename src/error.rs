//! Error taxonomy for the responder.
//!
//! Only [`ServerError::Bind`] is fatal to the process. Every other variant is
//! scoped to a single connection and is logged by the accept loop.

use std::io;
use std::time::Duration;

use thiserror::Error;

pub use crate::http::parser::ParseError;
pub use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen on 0.0.0.0:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("failed to parse request: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("connection i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
}
