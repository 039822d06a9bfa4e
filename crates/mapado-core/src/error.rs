//! Error types for the Mapado core library
//!
//! This module defines the error handling system for Mapado, using thiserror
//! for ergonomic error definitions and anyhow for flexible error contexts.
//! Every configuration problem is detected while a mapping is compiled;
//! executing an already-compiled mapping only fails for inputs the plan
//! cannot represent (bad casts, abstract fall-through instantiation).
//!
//! Copyright (c) 2025 Mapado Team
//! Licensed under the Apache-2.0 license

use crate::plan::MapKind;
use thiserror::Error;

/// Main error type for Mapado operations
#[derive(Error, Debug)]
pub enum Error {
    /// Structural configuration failures detected during compilation
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Unmapped destination members while RequireDestinationMemberSource is enabled
    #[error("Validation error: the following members of destination type {type_name} do not have a corresponding source member mapped or ignored: {members}")]
    Validation { type_name: String, members: String },

    /// The statement-form recursion bound was exceeded during synthesis
    #[error("Synthesis limit exceeded for {source_type} -> {dest} ({kind:?}): {message}")]
    SynthesisLimit {
        source_type: String,
        dest: String,
        kind: MapKind,
        message: String,
    },

    /// A type name was used that is not present in the registry
    #[error("Unknown type: {name}")]
    UnknownType { name: String },

    /// Runtime failures of a compiled mapping
    #[error("Execution error: {message}")]
    Execution { message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a sourceless configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Error::Execution {
            message: message.into(),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Configuration {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
