//! Fatal error taxonomy for the relay process.
//!
//! Everything here terminates the process with a nonzero exit. Protocol
//! events (nickname collision, kick, part) are handled in-state by the
//! session and never appear in this enum; dropped datagrams are
//! diagnostics, not errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that end the process.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A UDP port could not be bound. A half-working bridge is worse
    /// than none, so this is fatal rather than skipped.
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The IRC connection could not be established.
    #[error("IRC connection failed: {0}")]
    Connect(#[source] std::io::Error),

    /// The configured host is not a valid TLS server name.
    #[error("invalid TLS server name: {0:?}")]
    InvalidServerName(String),

    /// Another instance holds the single-instance marker.
    #[error("already running? pidfile {path:?} exists (held by pid {holder})")]
    AlreadyRunning { path: PathBuf, holder: String },

    /// The single-instance marker could not be written.
    #[error("failed to write pidfile {path:?}: {source}")]
    Pidfile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
