//! Crate-level error type composed from the module errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::execution::processor::SinkError;
use crate::execution::processor_manager::RegistryError;
use crate::execution::worker_pool::WorkerPoolError;

#[derive(Debug, Error)]
pub enum RemotingError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("worker pool error: {0}")]
    WorkerPool(#[from] WorkerPoolError),

    #[error("transport sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, RemotingError>;
