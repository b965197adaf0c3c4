//! # Resilience Runtime
//!
//! Wires the pieces together:
//!
//! ```text
//! submit ─▶ primary OperationQueue ─▶ OperationRunner ─▶ RemoteStore
//!                    ▲                       │ Failed
//!                    │                       ▼
//!                    └── RecoveryStrategy ◀─ RecoveryQueue (own worker)
//!                               │
//!                               ▼
//!                    NotificationBroadcaster
//! ```

use crate::config::ResilienceConfig;
use crate::constants::queues;
use crate::error::{ResilienceError, Result};
use crate::events::NotificationBroadcaster;
use crate::execution::{ExecutionQueue, OperationQueue, RecoveryQueue};
use crate::operation::{Operation, OperationHandle};
use crate::orchestration::{
    ErrorClassifier, OperationReplicator, OperationRunner, RecoveryStrategy,
    StandardErrorClassifier, StandardReplicator,
};
use crate::remote::RemoteStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Primary queue, recovery queue and broadcaster for one remote store
pub struct ResilienceRuntime {
    config: ResilienceConfig,
    broadcaster: NotificationBroadcaster,
    primary: OperationQueue,
    recovery: RecoveryQueue,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ResilienceRuntime {
    /// Build with the standard classifier and replicator.
    ///
    /// Must be called inside a tokio runtime: the recovery worker is spawned here.
    pub fn new(store: Arc<dyn RemoteStore>, config: ResilienceConfig) -> Result<Self> {
        let replicator =
            StandardReplicator::new().with_name_suffix(config.replica_name_suffix.clone());
        Self::with_components(
            store,
            config,
            Arc::new(StandardErrorClassifier::new()),
            Arc::new(replicator),
        )
    }

    pub fn with_components(
        store: Arc<dyn RemoteStore>,
        config: ResilienceConfig,
        classifier: Arc<dyn ErrorClassifier>,
        replicator: Arc<dyn OperationReplicator>,
    ) -> Result<Self> {
        config.validate()?;
        if Handle::try_current().is_err() {
            return Err(ResilienceError::RuntimeUnavailable);
        }

        let broadcaster = NotificationBroadcaster::new(config.notification_channel_capacity);
        let (recovery, inbox) = RecoveryQueue::channel();

        let runner = OperationRunner::new(store, broadcaster.clone())
            .with_failure_sink(Arc::new(recovery.clone()));
        let primary = OperationQueue::new(
            queues::PRIMARY,
            Arc::new(runner),
            config.primary_queue_concurrency,
        );

        let strategy = RecoveryStrategy::new(
            classifier,
            replicator,
            Arc::new(primary.clone()),
            broadcaster.clone(),
        )
        .with_settings(config.recovery_settings());
        let worker = inbox.start(Arc::new(strategy));

        info!(
            concurrency = config.primary_queue_concurrency,
            default_download_limit = config.default_download_limit,
            split_on_batch_failure = config.split_on_batch_failure,
            "Resilience runtime started"
        );

        Ok(Self {
            config,
            broadcaster,
            primary,
            recovery,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Submit to the primary queue
    pub fn submit(&self, operation: Operation) -> Result<OperationHandle> {
        Ok(self.primary.submit(operation)?)
    }

    pub fn broadcaster(&self) -> &NotificationBroadcaster {
        &self.broadcaster
    }

    pub fn primary_queue(&self) -> &OperationQueue {
        &self.primary
    }

    pub fn recovery_queue(&self) -> &RecoveryQueue {
        &self.recovery
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Wait until no operation is in flight and no failure awaits recovery,
    /// including replacements submitted by recovery
    pub async fn settle(&self) {
        loop {
            self.primary.wait_idle().await;
            self.recovery.wait_idle().await;
            if self.primary.in_flight() == 0 && self.recovery.pending() == 0 {
                return;
            }
        }
    }

    /// Stop the recovery worker and close the primary queue
    pub async fn shutdown(&self) {
        self.recovery.shutdown();
        self.primary.close();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(error) = worker.await {
                warn!(error = %error, "Recovery worker ended abnormally");
            }
        }
        info!("Resilience runtime stopped");
    }
}

impl std::fmt::Debug for ResilienceRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceRuntime")
            .field("config", &self.config)
            .field("primary", &self.primary)
            .field("recovery", &self.recovery)
            .finish()
    }
}
