//! Error types for backing-store operations.

use thiserror::Error;

/// Result type for backing-store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the backing store.
///
/// These errors are propagated unchanged through the transaction layer to
/// the transaction coordinator, which decides retry vs. abort. The layers
/// above never retry internally.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be reached or refused the request.
    #[error("backing store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// A bulk write was rejected by the backing store.
    ///
    /// The write is all-or-nothing: nothing was applied.
    #[error("backing store write failed: {message}")]
    WriteFailed {
        /// Description of the failure.
        message: String,
    },

    /// A read or write timed out waiting on a row lock.
    #[error("backing store operation timed out after {millis} ms")]
    Timeout {
        /// How long the operation waited before giving up.
        millis: u64,
    },
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a write-failed error.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(millis: u64) -> Self {
        Self::Timeout { millis }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::unavailable("connection refused");
        assert_eq!(
            err.to_string(),
            "backing store unavailable: connection refused"
        );

        let err = StorageError::timeout(250);
        assert_eq!(
            err.to_string(),
            "backing store operation timed out after 250 ms"
        );
    }
}
