//! Command Dispatcher
//!
//! The inbound path: resolve the processor for a decoded command, execute it
//! under the bounded pool, and guarantee the peer an observable response for
//! every terminal outcome. Processor failures are converted to responses at
//! this boundary; they never escape as faults.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::execution::processor::InvokeContext;
use crate::execution::processor_manager::ProcessorManager;
use crate::protocol::command::{RequestCommand, ResponseCommand};
use crate::protocol::command_factory::CommandFactory;
use crate::protocol::status::ResponseStatus;

/// Routes decoded commands to their processors.
pub struct CommandDispatcher {
    manager: Arc<ProcessorManager>,
    factory: Arc<CommandFactory>,
}

impl CommandDispatcher {
    pub fn new(manager: Arc<ProcessorManager>, factory: Arc<CommandFactory>) -> Self {
        Self { manager, factory }
    }

    pub fn manager(&self) -> &Arc<ProcessorManager> {
        &self.manager
    }

    /// Dispatch one decoded command.
    ///
    /// Returns once the work is accepted (or refused); the processor runs on
    /// its executor and writes its own response through the context. Every
    /// refusal path produces a categorical response: `NoProcessor` when no
    /// binding and no default exist, `ServerThreadpoolBusy` when the
    /// executor rejects the submission.
    pub async fn dispatch(&self, command: RequestCommand, context: InvokeContext) {
        let id = command.id;
        let code = command.code;
        debug!("dispatching command: code={}, id={}", code, id);

        let Some(processor) = self.manager.get_processor(code) else {
            warn!("no processor registered for code {}, rejecting command {}", code, id);
            let response = self
                .factory
                .create_status_response(id, ResponseStatus::NoProcessor);
            write_response(&context, response).await;
            return;
        };

        let executor = processor
            .executor()
            .unwrap_or_else(|| self.manager.default_executor());

        let factory = Arc::clone(&self.factory);
        let job_context = context.clone();
        let job = async move {
            match processor.process(command, &job_context).await {
                Ok(Some(response)) => write_response(&job_context, response).await,
                Ok(None) => {}
                Err(failure) => {
                    error!(
                        "processor {} failed for command {}: {}",
                        processor.name(),
                        id,
                        failure
                    );
                    let response = factory.create_exception_response_with_cause(
                        id,
                        &failure,
                        &format!("processor [{}] execution failed", processor.name()),
                    );
                    write_response(&job_context, response).await;
                }
            }
        };

        if let Err(rejection) = executor.try_submit(job) {
            warn!(
                "executor rejected command {} (code {}): {}",
                id, code, rejection
            );
            let response = self
                .factory
                .create_status_response(id, ResponseStatus::ServerThreadpoolBusy);
            write_response(&context, response).await;
        }
    }
}

/// Sink failures are logged, not propagated: there is nobody left to answer.
async fn write_response(context: &InvokeContext, response: ResponseCommand) {
    let id = response.id;
    if let Err(failure) = context.write_response(response).await {
        error!(
            "failed to write response {} to {}: {}",
            id, context.remote_addr, failure
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::processor::{ProcessorError, RemotingProcessor, ResponseSink, SinkError};
    use crate::execution::worker_pool::WorkerPoolConfig;
    use crate::protocol::command::{CommandCode, Payload};
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use tokio::sync::Mutex;
    use tokio::time::Duration;

    struct RecordingSink {
        written: Mutex<Vec<ResponseCommand>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                written: Mutex::new(Vec::new()),
            })
        }

        async fn count(&self) -> usize {
            self.written.lock().await.len()
        }
    }

    #[async_trait]
    impl ResponseSink for RecordingSink {
        async fn write(&self, response: ResponseCommand) -> Result<(), SinkError> {
            self.written.lock().await.push(response);
            Ok(())
        }
    }

    struct EchoProcessor {
        factory: Arc<CommandFactory>,
    }

    #[async_trait]
    impl RemotingProcessor for EchoProcessor {
        async fn process(
            &self,
            mut command: RequestCommand,
            _context: &InvokeContext,
        ) -> Result<Option<ResponseCommand>, ProcessorError> {
            let payload = command.payload.take();
            Ok(Some(self.factory.create_response(payload, &command)))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn peer() -> SocketAddr {
        "192.0.2.1:9600".parse().expect("valid address")
    }

    fn dispatcher() -> (CommandDispatcher, Arc<CommandFactory>) {
        let factory = Arc::new(CommandFactory::new());
        let manager = Arc::new(ProcessorManager::with_executor_config(WorkerPoolConfig {
            core_workers: 1,
            max_workers: 2,
            queue_capacity: 4,
            keep_alive_ms: 1_000,
        }));
        (
            CommandDispatcher::new(manager, Arc::clone(&factory)),
            factory,
        )
    }

    async fn wait_for_writes(sink: &RecordingSink, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while sink.count().await < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "sink never saw {count} responses"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_dispatch_writes_success_response() {
        let (dispatcher, factory) = dispatcher();
        dispatcher.manager().register_processor(
            CommandCode::new(20),
            Arc::new(EchoProcessor {
                factory: Arc::clone(&factory),
            }),
        );

        let sink = RecordingSink::new();
        let request = factory
            .create_request_command(CommandCode::new(20), Some(Payload::new(5u32)));
        let request_id = request.id;
        dispatcher
            .dispatch(request, InvokeContext::new(peer(), sink.clone()))
            .await;

        wait_for_writes(&sink, 1).await;
        let written = sink.written.lock().await;
        assert_eq!(written[0].id, request_id);
        assert_eq!(written[0].status(), ResponseStatus::Success);
    }

    #[tokio::test]
    async fn test_unknown_code_yields_no_processor_response() {
        let (dispatcher, factory) = dispatcher();
        let sink = RecordingSink::new();

        let request = factory.create_request_command(CommandCode::new(404), None);
        let request_id = request.id;
        dispatcher
            .dispatch(request, InvokeContext::new(peer(), sink.clone()))
            .await;

        wait_for_writes(&sink, 1).await;
        let written = sink.written.lock().await;
        assert_eq!(written[0].id, request_id);
        assert_eq!(written[0].status(), ResponseStatus::NoProcessor);
    }
}
