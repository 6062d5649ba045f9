use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Taxonomy structural errors.
///
/// A conflict means the same normalized category path implies two different
/// parent chains. The affected subtree is skipped; siblings proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("path conflict: '{path}' already resolves to a different parent chain ({existing} vs {conflicting})")]
    Conflict {
        path: String,
        existing: String,
        conflicting: String,
    },

    #[error("unknown node: {0}")]
    UnknownNode(String),
}

/// Pipeline phase-ordering errors.
///
/// Aggregation must not start until matching is complete, and scoring must
/// not start until aggregation is complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    #[error("phase '{required}' must complete before '{attempted}' can run")]
    OutOfOrder {
        required: &'static str,
        attempted: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
