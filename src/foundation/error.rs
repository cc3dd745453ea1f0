/// Convenience result type used across Holoreel.
pub type HoloreelResult<T> = Result<T, HoloreelError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum HoloreelError {
    /// Container identifier does not match the expected asset kind.
    #[error("identifier mismatch: expected {expected:?}, got {actual:?}")]
    IdentifierMismatch {
        /// Identifier this engine build expects.
        expected: [u8; 4],
        /// Identifier read from the stream.
        actual: [u8; 4],
    },

    /// Container format version is not the one this engine build supports.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Supported IO version.
        expected: u32,
        /// Version read from the stream.
        actual: u32,
    },

    /// Invalid or out-of-range data in the container body.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure while decoding pixel or audio payload data.
    #[error("decode error: {0}")]
    Decode(String),

    /// Stream open/read failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HoloreelError {
    /// Build a [`HoloreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`HoloreelError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
