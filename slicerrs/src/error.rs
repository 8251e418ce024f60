use thiserror::Error;

pub type Result<T> = std::result::Result<T, SlicerError>;

#[derive(Debug, Error)]
pub enum SlicerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("query requires at least one dimension or metric")]
    EmptyProjection,
    #[error("duplicate alias {0}")]
    DuplicateAlias(String),
    #[error("reference {reference} cannot be applied to dimension {dimension}: {reason}")]
    IncompatibleReference {
        reference: String,
        dimension: String,
        reason: String,
    },
    #[error("unknown dimension {0}")]
    UnknownDimension(String),
    #[error("unknown table {0}")]
    UnknownTable(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
