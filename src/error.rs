use pixmatrix_common::{ParseColorError, ProtocolError};
use std::{io, time::Duration};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pixel ({x}, {y}) is outside the 64x64 canvas")]
    OutOfBounds { x: i32, y: i32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to connect to {endpoint}")]
    Connection {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<ParseColorError> for Error {
    fn from(err: ParseColorError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Failure after a connection was established.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no acknowledgement within {0:?}")]
    Timeout(Duration),

    #[error("i/o error while talking to the display")]
    Io(#[from] io::Error),

    #[error("display rejected the packet with status {0}")]
    Rejected(u8),

    #[error("malformed acknowledgement")]
    Protocol(#[from] ProtocolError),

    #[error("session is closed")]
    Closed,
}
