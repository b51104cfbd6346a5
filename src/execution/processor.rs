//! Processor Contract
//!
//! The handler seam between the dispatch core and business logic, plus the
//! narrow interfaces through which the transport collaborator is consumed.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::execution::worker_pool::WorkerPool;
use crate::protocol::command::{RequestCommand, ResponseCommand};
pub use crate::protocol::exception::ProcessorError;

/// Business-logic handler bound to one or more command codes.
///
/// Concrete processors are registered by value with the
/// [`ProcessorManager`](crate::execution::ProcessorManager). A processor
/// either returns a response command to be written back, returns `Ok(None)`
/// for fire-and-forget commands, or fails; failures are caught at the
/// dispatch boundary and converted to `ServerException` responses, never
/// propagated as faults.
#[async_trait]
pub trait RemotingProcessor: Send + Sync {
    /// Handle one decoded command.
    async fn process(
        &self,
        command: RequestCommand,
        context: &InvokeContext,
    ) -> Result<Option<ResponseCommand>, ProcessorError>;

    /// Processor name for diagnostics.
    fn name(&self) -> &str;

    /// Dedicated executor for this processor. `None` selects the manager's
    /// shared default pool.
    fn executor(&self) -> Option<Arc<WorkerPool>> {
        None
    }
}

/// Write side of the transport collaborator.
///
/// The sink owns pairing a response to the originating request's connection
/// and putting it on the wire.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn write(&self, response: ResponseCommand) -> Result<(), SinkError>;
}

/// Transport write failures reported by a [`ResponseSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("connection to {peer} closed")]
    ConnectionClosed { peer: SocketAddr },

    #[error("send to {peer} failed: {reason}")]
    SendFailed { peer: SocketAddr, reason: String },
}

/// Execution context handed to a processor along with the command.
#[derive(Clone)]
pub struct InvokeContext {
    /// Address of the remote peer that sent the command.
    pub remote_addr: SocketAddr,

    sink: Arc<dyn ResponseSink>,
}

impl InvokeContext {
    pub fn new(remote_addr: SocketAddr, sink: Arc<dyn ResponseSink>) -> Self {
        Self { remote_addr, sink }
    }

    /// Hand a response to the transport collaborator for encoding and
    /// transmission.
    pub async fn write_response(&self, response: ResponseCommand) -> Result<(), SinkError> {
        self.sink.write(response).await
    }
}

impl fmt::Debug for InvokeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeContext")
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}
