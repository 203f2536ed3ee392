//! Error types for the object pool

use thiserror::Error;

/// Error produced by a resource factory.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Executor unavailable: {0}")]
    ExecutorUnavailable(String),

    #[error("Resource construction failed: {0}")]
    Construction(String),

    #[error("Metrics export failed: {0}")]
    MetricsExport(String),
}

impl PoolError {
    pub(crate) fn construction(err: &FactoryError) -> Self {
        PoolError::Construction(err.to_string())
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
