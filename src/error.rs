use std::path::PathBuf;

use thiserror::Error;

/// Main library error type covering derivation, linking and orchestration failures
#[derive(Error, Debug)]
pub enum DeriveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("XML parse error: {details}")]
    Parse { details: String },

    #[error("Invalid query expression '{expression}': {details}")]
    Query { expression: String, details: String },

    #[error("Deriver for {artifact_type} failed: {details}")]
    Plugin {
        artifact_type: String,
        details: String,
    },

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },

    #[error("Unsupported document: {path} - no artifact type mapped to this extension")]
    UnsupportedDocument { path: PathBuf },
}

/// Failures reported by a `LinkerContext` while resolving references
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Artifact query failed for {model}/{artifact_type}: {details}")]
    Query {
        model: String,
        artifact_type: String,
        details: String,
    },

    #[error("Artifact not persisted before linking: {uuid}")]
    NotPersisted { uuid: String },
}

impl From<roxmltree::Error> for DeriveError {
    fn from(err: roxmltree::Error) -> Self {
        DeriveError::Parse {
            details: err.to_string(),
        }
    }
}

impl From<crate::config::ConfigError> for DeriveError {
    fn from(err: crate::config::ConfigError) -> Self {
        DeriveError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DeriveError>;

/// Link result type alias
pub type LinkResult<T> = std::result::Result<T, LinkError>;
