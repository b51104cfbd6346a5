//! Processor Manager
//!
//! Thread-safe binding from command codes to processors, plus the shared
//! fallback worker pool used by processors without an executor of their own.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::execution::processor::RemotingProcessor;
use crate::execution::worker_pool::{WorkerPool, WorkerPoolConfig};
use crate::protocol::command::CommandCode;

/// Registration-time errors. These are wiring mistakes, not runtime
/// conditions, and are not recoverable by retry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("default processor already registered: {existing}")]
    DefaultAlreadyRegistered { existing: String },
}

/// Registry mapping command codes to processors.
///
/// Explicitly constructed and owned by its transport instance; there is no
/// process-wide singleton. Lookups are lock-free with respect to concurrent
/// registrations: a reader observes either the old or the new binding,
/// never a torn value, and never blocks on a writer.
///
/// The default processor is one-shot wiring while per-code bindings and the
/// default executor stay operationally swappable. That asymmetry is a
/// deliberate part of the contract.
///
/// # Examples
///
/// ```rust
/// use remoting_core::execution::ProcessorManager;
/// use remoting_core::protocol::CommandCode;
///
/// #[tokio::main]
/// async fn main() {
///     let manager = ProcessorManager::new();
///     assert!(manager.get_processor(CommandCode::RPC_REQUEST).is_none());
/// }
/// ```
pub struct ProcessorManager {
    processors: DashMap<CommandCode, Arc<dyn RemotingProcessor>>,
    default_processor: OnceLock<Arc<dyn RemotingProcessor>>,
    default_executor: RwLock<Arc<WorkerPool>>,
}

impl ProcessorManager {
    /// Manager with a default executor built from process-wide default
    /// settings. Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_executor_config(WorkerPoolConfig::default())
    }

    pub fn with_executor_config(config: WorkerPoolConfig) -> Self {
        Self {
            processors: DashMap::new(),
            default_processor: OnceLock::new(),
            default_executor: RwLock::new(Arc::new(WorkerPool::with_config(config))),
        }
    }

    /// Bind a processor to a command code, replacing any previous binding.
    ///
    /// Re-registration is tolerated for plugin-style late configuration:
    /// last write wins and the overwrite is reported as a warning, not an
    /// error.
    pub fn register_processor(&self, code: CommandCode, processor: Arc<dyn RemotingProcessor>) {
        let previous = self.processors.get(&code).map(|p| p.name().to_string());
        if let Some(previous) = previous {
            warn!(
                "processor for code {} is already registered: replacing {} with {}",
                code,
                previous,
                processor.name()
            );
        }
        info!("registered processor {} for code {}", processor.name(), code);
        self.processors.insert(code, processor);
    }

    /// Set the fallback processor for codes with no specific binding.
    ///
    /// One-shot: a second call fails and leaves the original in effect.
    /// Under racing concurrent calls at most one succeeds.
    pub fn register_default_processor(
        &self,
        processor: Arc<dyn RemotingProcessor>,
    ) -> Result<(), RegistryError> {
        let name = processor.name().to_string();
        self.default_processor
            .set(processor)
            .map_err(|_rejected| RegistryError::DefaultAlreadyRegistered {
                existing: self
                    .default_processor
                    .get()
                    .map(|p| p.name().to_string())
                    .unwrap_or_default(),
            })?;
        info!("registered default processor {}", name);
        Ok(())
    }

    /// Processor bound to `code`, falling back to the default processor.
    /// `None` means neither exists; signaling `NoProcessor` to the peer is
    /// the dispatching caller's job.
    pub fn get_processor(&self, code: CommandCode) -> Option<Arc<dyn RemotingProcessor>> {
        self.processors
            .get(&code)
            .map(|entry| Arc::clone(entry.value()))
            .or_else(|| self.default_processor.get().cloned())
    }

    /// The shared fallback worker pool.
    pub fn default_executor(&self) -> Arc<WorkerPool> {
        Arc::clone(&self.default_executor.read())
    }

    /// Replace the shared worker pool. The swap is immediate; work already
    /// submitted keeps running on the old pool, and retiring the old pool
    /// passes to the caller.
    pub fn register_default_executor(&self, executor: Arc<WorkerPool>) {
        let mut slot = self.default_executor.write();
        *slot = executor;
        info!("default executor replaced");
    }
}

impl Default for ProcessorManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::processor::{InvokeContext, ProcessorError};
    use crate::protocol::command::{RequestCommand, ResponseCommand};
    use async_trait::async_trait;

    struct NamedProcessor {
        name: &'static str,
    }

    #[async_trait]
    impl RemotingProcessor for NamedProcessor {
        async fn process(
            &self,
            _command: RequestCommand,
            _context: &InvokeContext,
        ) -> Result<Option<ResponseCommand>, ProcessorError> {
            Ok(None)
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn processor(name: &'static str) -> Arc<dyn RemotingProcessor> {
        Arc::new(NamedProcessor { name })
    }

    fn small_pool_config() -> WorkerPoolConfig {
        WorkerPoolConfig {
            core_workers: 1,
            max_workers: 2,
            queue_capacity: 4,
            keep_alive_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn test_registered_processor_is_returned() {
        let manager = ProcessorManager::with_executor_config(small_pool_config());
        let bound = processor("bound");
        manager.register_processor(CommandCode::new(10), Arc::clone(&bound));

        let resolved = manager.get_processor(CommandCode::new(10)).expect("bound");
        assert_eq!(resolved.name(), "bound");
    }

    #[tokio::test]
    async fn test_unbound_code_falls_back_to_default() {
        let manager = ProcessorManager::with_executor_config(small_pool_config());
        manager
            .register_default_processor(processor("fallback"))
            .expect("first registration succeeds");

        let resolved = manager.get_processor(CommandCode::new(99)).expect("default");
        assert_eq!(resolved.name(), "fallback");
    }

    #[tokio::test]
    async fn test_unbound_code_without_default_is_none() {
        let manager = ProcessorManager::with_executor_config(small_pool_config());
        assert!(manager.get_processor(CommandCode::new(99)).is_none());
    }

    #[tokio::test]
    async fn test_reregistration_overwrites_without_failing() {
        let manager = ProcessorManager::with_executor_config(small_pool_config());
        manager.register_processor(CommandCode::new(10), processor("first"));
        manager.register_processor(CommandCode::new(10), processor("second"));

        let resolved = manager.get_processor(CommandCode::new(10)).expect("bound");
        assert_eq!(resolved.name(), "second");
    }

    #[tokio::test]
    async fn test_default_processor_is_one_shot() {
        let manager = ProcessorManager::with_executor_config(small_pool_config());
        manager
            .register_default_processor(processor("first"))
            .expect("first registration succeeds");

        let error = manager
            .register_default_processor(processor("second"))
            .expect_err("second registration fails");
        assert!(matches!(
            error,
            RegistryError::DefaultAlreadyRegistered { ref existing } if existing.as_str() == "first"
        ));

        // The original default remains in effect.
        let resolved = manager.get_processor(CommandCode::new(1)).expect("default");
        assert_eq!(resolved.name(), "first");
    }

    #[tokio::test]
    async fn test_lookup_is_stable_under_concurrent_registration() {
        let manager = Arc::new(ProcessorManager::with_executor_config(small_pool_config()));
        let pinned = CommandCode::new(7);
        manager.register_processor(pinned, processor("pinned"));

        let writer = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                for value in 100..300u16 {
                    manager.register_processor(CommandCode::new(value), processor("churn"));
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            let resolved = manager.get_processor(pinned).expect("pinned stays bound");
            assert_eq!(resolved.name(), "pinned");
            tokio::task::yield_now().await;
        }
        writer.await.expect("writer task completes");
    }

    #[tokio::test]
    async fn test_executor_swap_is_immediate() {
        let manager = ProcessorManager::with_executor_config(small_pool_config());
        let original = manager.default_executor();

        let replacement = Arc::new(WorkerPool::with_config(small_pool_config()));
        manager.register_default_executor(Arc::clone(&replacement));

        assert!(Arc::ptr_eq(&manager.default_executor(), &replacement));
        // The old pool is untouched; retiring it is the swapper's call.
        assert!(original.try_submit(async {}).is_ok());
    }
}
