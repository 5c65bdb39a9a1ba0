//! Protocol error types.

use thiserror::Error;

/// Result type used throughout the protocol crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors surfaced by the codec and message parser.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An underlying I/O error.
    #[error("an io error occurred")]
    Io(#[from] std::io::Error),

    /// A line exceeded the configured limit before a terminator arrived.
    #[error("message exceeds line limit: {actual} > {limit}")]
    MessageTooLong {
        /// Observed length in bytes.
        actual: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A line could not be parsed as an IRC message.
    #[error("invalid message: {string:?}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// What went wrong.
        #[source]
        cause: MessageParseError,
    },
}

/// Detail for [`ProtocolError::InvalidMessage`].
#[derive(Debug, Error)]
pub enum MessageParseError {
    /// The line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Tags or a prefix were present but nothing followed them.
    #[error("message ended before the command")]
    TruncatedMessage,

    /// No command token was found.
    #[error("missing command")]
    MissingCommand,
}
