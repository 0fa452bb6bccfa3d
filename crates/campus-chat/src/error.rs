use thiserror::Error;

/// Failure of a request/response fetch (history, roster, group list, create).
/// Always recoverable: the caller retries by reopening the channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("not authorized")]
    Unauthorized,

    #[error("server returned status {status}")]
    Status { status: u16 },

    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no channel is open")]
    NoActiveChannel,

    #[error("message is empty")]
    EmptyMessage,

    #[error("message is {len} characters, limit is {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("session driver has shut down")]
    DriverClosed,
}
