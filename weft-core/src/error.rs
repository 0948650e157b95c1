//! Error types for the tracking engine.
//!
//! Bookkeeping operations (recording edges, notifying, scheduling) cannot
//! fail. Errors come from two places: usage errors detected by the engine,
//! and failures returned by user-supplied read/write functions. The latter
//! are passed through [`Computed::get`](crate::reactive::Computed::get)
//! unchanged.

use thiserror::Error;

/// Errors surfaced by computations, containers, and models.
#[derive(Debug, Error)]
pub enum Error {
    /// A write was attempted on a computation that has no write function.
    #[error("unsupported operation: computed `{name}` has no write function")]
    ReadOnly { name: String },

    /// A sequence write landed past the end of the sequence.
    #[error("index {index} is out of bounds for a sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A model field was accessed before being defined.
    #[error("model has no field named `{0}`")]
    UnknownField(String),

    /// A user function failed with a plain message.
    #[error("{0}")]
    Message(String),

    /// A user function failed with an arbitrary error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Build a [`Error::Message`] from anything string-like.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_names_the_node() {
        let err = Error::ReadOnly { name: "total".into() };
        assert_eq!(
            err.to_string(),
            "unsupported operation: computed `total` has no write function"
        );
    }

    #[test]
    fn boxed_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(io);
        let err = Error::from(boxed);
        assert_eq!(err.to_string(), "disk on fire");
    }
}
