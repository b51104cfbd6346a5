//! Dispatch and Concurrency
//!
//! Processor registry, bounded worker pool and the inbound dispatch path.

pub mod dispatcher;
pub mod processor;
pub mod processor_manager;
pub mod worker_pool;

pub use dispatcher::CommandDispatcher;
pub use processor::{InvokeContext, ProcessorError, RemotingProcessor, ResponseSink, SinkError};
pub use processor_manager::{ProcessorManager, RegistryError};
pub use worker_pool::{WorkerPool, WorkerPoolConfig, WorkerPoolError, WorkerPoolStats};
