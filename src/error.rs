//! Crate-wide error type.

use std::convert::Infallible;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by atomic cells, locks, shared regions and the manager channel.
///
/// A failed `compare_and_set` is not an error; it is reported as `false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value of the wrong type was offered to a typed cell. The write did not happen.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared element type of the cell.
        expected: &'static str,
        /// Type of the rejected value.
        found: &'static str,
    },

    /// A lock mode was released without being held.
    #[error("lock released while not held")]
    NotHeld,

    /// A bounded `try_swap` lost every CAS race it was allowed to attempt.
    #[error("swap gave up after {attempts} failed compare-and-set attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
    },

    /// An OS call failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A value could not be serialized for, or deserialized from, the manager.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The manager closed the connection.
    #[error("manager closed the connection")]
    Disconnected,

    /// The peer sent something that is not part of the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A shared memory region is missing, uninitialized or has the wrong layout.
    #[error("invalid shared region: {0}")]
    InvalidRegion(String),

    /// The manager process could not be started.
    #[error("manager failed to start: {0}")]
    Spawn(String),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl Error {
    /// Returns `true` for [`Error::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}
