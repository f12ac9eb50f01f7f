use thiserror::Error;

/// Internal plumbing errors. These never cross the wire directly — every
/// site that can produce one converts it to the `"error"` wire string
/// before it reaches a client (see `reply::Reply::Error`).
#[derive(Debug, Error)]
pub enum RedisError {
    #[error("mailbox closed")]
    MailboxClosed,

    #[error("fan-out timed out")]
    FanOutTimeout,

    #[error("invalid integer argument")]
    NotAnInteger,

    #[error("invalid float argument")]
    NotAFloat,

    #[error("index out of range")]
    OutOfRange,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RedisError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RedisError::MailboxClosed
    }
}

impl From<tokio::time::error::Elapsed> for RedisError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RedisError::FanOutTimeout
    }
}
