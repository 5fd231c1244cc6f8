use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failed or empty result, suitable for reporting.
///
/// `EmptyInput` is never an [`AnalysisError`]: it is carried by
/// `Report::NoData` so callers can still render an empty chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Query,
    EmptyInput,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Query => "query",
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::Config => "config",
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query '{context}' failed: {message}")]
    Query { context: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AnalysisError {
    pub fn query(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        AnalysisError::Query {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Connection(_) => ErrorKind::Connection,
            AnalysisError::Query { .. } => ErrorKind::Query,
            AnalysisError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<deadpool_postgres::PoolError> for AnalysisError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        AnalysisError::Connection(err.to_string())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
