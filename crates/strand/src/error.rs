//! Error types for strand.

use thiserror::Error;

/// Hard failures of attribute access and mutation.
///
/// A key that simply does not resolve is not an error; it is reported as an
/// absent value and recorded in the lookup ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttrError {
    /// Name fails the validity predicate.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// A sibling already uses this name.
    #[error("name already in use: {0:?}")]
    DuplicateName(String),

    /// Target of a mutation does not exist and may not be created.
    #[error("no such attribute: {0:?}")]
    Missing(String),

    /// Attribute cannot be assigned through this root.
    #[error("attribute is read-only: {0:?}")]
    ReadOnly(String),

    /// The host failed to compute the value.
    #[error("host error in {name:?}: {message}")]
    HostValue {
        /// Attribute whose value failed.
        name: String,
        /// Host-provided description.
        message: String,
    },

    /// Flushing hit the round limit with work still queued.
    #[error("evaluation did not settle: {pending} downstreams still queued")]
    Unsettled {
        /// Queue length when flushing stopped.
        pending: usize,
    },
}

/// Error raised by a host function.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors loading a [`SceneConfig`](crate::config::SceneConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
