//! Listener error types

use std::io;
use std::net::SocketAddr;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{listener} listener failed to bind {addr}: {source}")]
    Bind {
        listener: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("{0} listener is not running")]
    NotRunning(&'static str),

    #[error("listener worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
