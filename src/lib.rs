#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Remoting Core
//!
//! Command-dispatch and response-protocol core of an asynchronous RPC
//! transport.
//!
//! ## Overview
//!
//! A decoded wire command enters through the [`execution::CommandDispatcher`],
//! which resolves the responsible [`execution::RemotingProcessor`] through
//! the [`execution::ProcessorManager`], executes it on a bounded
//! [`execution::WorkerPool`], and answers the peer with a response built by
//! the [`protocol::CommandFactory`]: one well-formed response for every
//! terminal outcome: success, application exception, missing processor,
//! pool saturation, timeout, send failure or closed connection.
//!
//! Socket I/O, frame codecs, connection lifecycle and payload serialization
//! are external collaborators consumed through narrow traits
//! ([`execution::ResponseSink`], opaque [`protocol::Payload`] values).
//!
//! ## Module Organization
//!
//! - [`protocol`] - Command value types, status taxonomy, command factory
//! - [`execution`] - Processor contract, registry, worker pool, dispatcher
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing initialization
//!
//! ## Quick Start
//!
//! ```rust
//! use remoting_core::execution::{CommandDispatcher, ProcessorManager};
//! use remoting_core::protocol::{CommandCode, CommandFactory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = Arc::new(ProcessorManager::new());
//!     let factory = Arc::new(CommandFactory::new());
//!
//!     // Processors are registered here, then commands flow through
//!     // CommandDispatcher::dispatch as the transport decodes them.
//!     let dispatcher = CommandDispatcher::new(Arc::clone(&manager), Arc::clone(&factory));
//!
//!     let request = factory.create_request_command(CommandCode::RPC_REQUEST, None);
//!     assert!(manager.get_processor(request.code).is_none());
//!     let _ = dispatcher;
//! }
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod protocol;

pub use config::{LoggingConfig, RemotingConfig};
pub use error::{RemotingError, Result};
pub use execution::{
    CommandDispatcher, InvokeContext, ProcessorManager, RemotingProcessor, ResponseSink,
    WorkerPool, WorkerPoolConfig,
};
pub use protocol::{
    CommandCode, CommandFactory, Payload, ProcessorError, ProtocolSwitch, RemotingCommand,
    RequestCommand, ResponseCommand, ResponseStatus, ServerException,
};
