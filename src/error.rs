//! Unified error type.

use std::net::AddrParseError;

use thiserror::Error;

/// The error type returned by relais' fallible operations.
///
/// Application-level outcomes (401, 404, 422, ...) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and stage faults: a pipeline stage returning an
/// `Error` aborts the request with `500 Internal Server Error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error(transparent)]
    UnsupportedMethod(#[from] crate::method::UnknownMethod),

    #[error("unknown culture `{0}`")]
    UnknownLocale(String),

    #[error("request body: {0}")]
    Body(String),

    #[error("handler task failed: {0}")]
    Handler(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
