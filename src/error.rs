//! Unified error type.

use std::net::SocketAddr;
use std::time::Duration;

/// The error type returned by routekit's server and registry operations.
///
/// Application-level failures (bad JSON, failed validation, 404) are expressed
/// as [`JsonError`](crate::JsonError) values or HTTP
/// [`Response`](crate::Response)s, not as `Error`s. This type surfaces
/// infrastructure failures, every one of which is fatal for the process when
/// the server is launched through [`start`](crate::start).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listening socket could not be bound (port in use, bad address, ...).
    #[error("bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A path pattern was rejected by the routing engine while composing.
    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    /// In-flight connections were still open when the shutdown window closed.
    #[error("server could not shut down gracefully within {0:?}")]
    DrainTimeout(Duration),

    #[error("server has already been started")]
    AlreadyStarted,

    /// The accept loop panicked or was cancelled.
    #[error("accept loop failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
