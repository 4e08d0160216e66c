use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[cfg(feature = "service")]
use sqlx::Error as SqlxError;

/// Unified error type for the path tracing engine.
///
/// Incomplete and inactive paths are first-class states, not errors; only
/// structural inconsistency, cycles and collaborator failures surface here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ConduitError {
    /// Termination data violates a model invariant (mixed node categories on
    /// one cable end, empty end, dangling side pairing). Rejected before any
    /// tracing begins; no partial state is written.
    #[error("Structural error: {0}")]
    Structural(String),
    /// A walk revisited a node. Fatal to the affected path branch only;
    /// nothing is persisted for that branch.
    #[error("Path cycle detected: {0}")]
    Cycle(String),
    /// Persistence collaborator failure, propagated to the caller.
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("File system error: {0}")]
    Io(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<uuid::Error> for ConduitError {
    fn from(src: uuid::Error) -> ConduitError {
        ConduitError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<JsonError> for ConduitError {
    fn from(src: JsonError) -> ConduitError {
        ConduitError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for ConduitError {
    fn from(src: toml::de::Error) -> ConduitError {
        ConduitError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ConduitError {
    fn from(src: toml::ser::Error) -> ConduitError {
        ConduitError::Config(format!("Toml serialization error: {src}"))
    }
}

impl From<io::Error> for ConduitError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => ConduitError::NotFound(format!("{x}")),
            _ => ConduitError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

#[cfg(feature = "service")]
impl From<SqlxError> for ConduitError {
    fn from(db_error: SqlxError) -> Self {
        ConduitError::Storage(format!("database error: {db_error:?}"))
    }
}
