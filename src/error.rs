//! Error types for annotation resolution
//!
//! Every error aborts the generation run for the active compilation unit:
//! there are no retries and no partial artifacts. Variants carry structured
//! context (key paths, file paths, resource names) to aid diagnostics.

use thiserror::Error;

use crate::annotation::KeyPath;

/// Main error type for annotation resolution
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid annotation content: unrecognized key in a nested block,
    /// value of the wrong type, unparsable listener argument, or mutually
    /// inconsistent TLS fields.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what's invalid
        message: String,
        /// The traversed key path, when the error occurred inside an
        /// annotation value tree (e.g. "http[0].route[1].destination")
        path: Option<String>,
    },

    /// A referenced file could not be read, or its mount location would
    /// collide with the project source root.
    #[error("path error for '{path}': {message}")]
    Path {
        /// The offending file path, as written in the source
        path: String,
        /// Description of what failed
        message: String,
    },

    /// Two declarations resolved to the same resource name within one kind.
    #[error("model consistency error: duplicate {kind} name '{name}'")]
    ModelConsistency {
        /// Resource kind (e.g. "ingress", "secret")
        kind: String,
        /// The colliding resource name
        name: String,
    },
}

impl Error {
    /// Create a configuration error with the given message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error located at a key path
    pub fn configuration_at(path: &KeyPath, message: impl Into<String>) -> Self {
        Self::Configuration {
            message: format!("{} at '{}'", message.into(), path),
            path: Some(path.to_string()),
        }
    }

    /// Create a path error for the given file path
    pub fn path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a model consistency error for a duplicate resource name
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ModelConsistency {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
