//! Autosave Worker - 定时保存未确认的修改
//!
//! Every tick snapshots the ledger of one table and writes it to the local
//! store. The edit path is never blocked:
//! - the coordinator lock is only tried, a busy tick is skipped
//! - redb I/O runs on the blocking pool
//! - failures are logged and skipped, the next tick tries again
//! - a write that was already in flight when the session was cleaned up is
//!   dropped instead of recreating the entry

use super::resolver::SessionConflictResolver;
use crate::orders::ModificationCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Number of pending changes written
    Saved(usize),
    /// Ledger empty, nothing written
    Empty,
    /// An edit or confirm held the lock
    Busy,
    /// Shutdown was requested before the write could happen
    Stopped,
    Failed,
}

pub struct AutosaveWorker {
    table_id: String,
    coordinator: Arc<Mutex<ModificationCoordinator>>,
    resolver: SessionConflictResolver,
    interval: Duration,
    shutdown: CancellationToken,
}

impl AutosaveWorker {
    pub fn new(
        table_id: impl Into<String>,
        coordinator: Arc<Mutex<ModificationCoordinator>>,
        resolver: SessionConflictResolver,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            table_id: table_id.into(),
            coordinator,
            resolver,
            interval,
            shutdown,
        }
    }

    /// Spawn the worker on the current runtime
    pub fn spawn(self) -> AutosaveHandle {
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.run());
        AutosaveHandle {
            shutdown,
            task: Some(task),
        }
    }

    pub async fn run(self) {
        tracing::info!(
            table_id = %self.table_id,
            interval_ms = self.interval.as_millis() as u64,
            "Autosave worker started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!(table_id = %self.table_id, "Autosave worker stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        let items = match self.coordinator.try_lock() {
            Ok(coordinator) => coordinator.pending_items(),
            Err(_) => {
                tracing::debug!(table_id = %self.table_id, "Autosave skipped: editor busy");
                return TickOutcome::Busy;
            }
        };
        if items.is_empty() {
            return TickOutcome::Empty;
        }

        let count = items.len();
        let resolver = self.resolver.clone();
        let table_id = self.table_id.clone();
        let shutdown = self.shutdown.clone();
        let write = move || resolver.autosave_unless_cancelled(&table_id, &items, &shutdown);
        match tokio::task::spawn_blocking(write).await {
            Ok(Ok(true)) => TickOutcome::Saved(count),
            Ok(Ok(false)) => TickOutcome::Stopped,
            Ok(Err(e)) => {
                tracing::warn!(table_id = %self.table_id, error = %e, "Autosave failed, skipped");
                TickOutcome::Failed
            }
            Err(e) => {
                tracing::error!(table_id = %self.table_id, error = %e, "Autosave task panicked");
                TickOutcome::Failed
            }
        }
    }
}

/// Running autosave task, cancelled on drop
#[derive(Debug)]
pub struct AutosaveHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Cancel and wait until the task has exited
    pub async fn stop_and_wait(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "Autosave task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOfRecord, BackendResult};
    use crate::core::EditorConfig;
    use crate::orders::NoopHighlighter;
    use crate::session::AutosaveStorage;
    use async_trait::async_trait;
    use shared::ticket::{
        BatchModifyRequest, BatchModifyResponse, OrderLine, SessionStatus, SourceOrderRecord,
    };

    struct IdleBackend;

    #[async_trait]
    impl BackendOfRecord for IdleBackend {
        async fn session_status(&self, _table_id: &str) -> BackendResult<SessionStatus> {
            Ok(SessionStatus::default())
        }

        async fn batch_modify(
            &self,
            _table_id: &str,
            _request: &BatchModifyRequest,
        ) -> BackendResult<BatchModifyResponse> {
            Ok(BatchModifyResponse {
                success: true,
                updated_lines: vec![],
                message: None,
            })
        }

        async fn active_orders(&self, _table_id: &str) -> BackendResult<Vec<SourceOrderRecord>> {
            Ok(vec![])
        }
    }

    fn create_test_worker(interval: Duration) -> (AutosaveWorker, SessionConflictResolver) {
        let coordinator = ModificationCoordinator::new("order-1", Arc::new(NoopHighlighter))
            .with_snapshot([OrderLine::new("m1", "Rice", 2000, 1)]);
        let resolver = SessionConflictResolver::new(
            EditorConfig::with_overrides("/tmp/unused", "store-1", "counter"),
            Arc::new(IdleBackend),
            AutosaveStorage::open_in_memory().unwrap(),
        );
        let worker = AutosaveWorker::new(
            "5",
            Arc::new(Mutex::new(coordinator)),
            resolver.clone(),
            interval,
            CancellationToken::new(),
        );
        (worker, resolver)
    }

    #[tokio::test]
    async fn test_tick_skips_empty_ledger() {
        let (worker, resolver) = create_test_worker(Duration::from_secs(30));
        assert_eq!(worker.tick().await, TickOutcome::Empty);
        assert_eq!(resolver.storage().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tick_saves_pending_changes() {
        let (worker, resolver) = create_test_worker(Duration::from_secs(30));
        worker.coordinator.lock().await.add_item("m1", "Rice", 2000, 2);

        assert_eq!(worker.tick().await, TickOutcome::Saved(1));
        let record = resolver.storage().load("store-1:5").unwrap().unwrap();
        assert_eq!(record.items[0].new_quantity, 3);
    }

    #[tokio::test]
    async fn test_tick_skips_when_busy() {
        let (worker, _resolver) = create_test_worker(Duration::from_secs(30));
        let coordinator = worker.coordinator.clone();
        let mut guard = coordinator.lock().await;
        guard.add_item("m1", "Rice", 2000, 1);

        assert_eq!(worker.tick().await, TickOutcome::Busy);
        drop(guard);
        assert_eq!(worker.tick().await, TickOutcome::Saved(1));
    }

    #[tokio::test]
    async fn test_tick_after_shutdown_writes_nothing() {
        let (worker, resolver) = create_test_worker(Duration::from_secs(30));
        worker.coordinator.lock().await.add_item("m1", "Rice", 2000, 1);
        worker.shutdown.cancel();

        assert_eq!(worker.tick().await, TickOutcome::Stopped);
        assert_eq!(resolver.storage().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inflight_write_loses_to_cleanup() {
        let (worker, resolver) = create_test_worker(Duration::from_secs(30));
        worker.coordinator.lock().await.add_item("m1", "Rice", 2000, 1);
        assert_eq!(worker.tick().await, TickOutcome::Saved(1));

        // storage is slow: the next write is queued behind this guard
        let shutdown = worker.shutdown.clone();
        let writes = resolver.hold_writes();
        let tick = tokio::spawn(async move { worker.tick().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // session confirmed meanwhile: stop the timer, then clean up
        shutdown.cancel();
        drop(writes);
        assert!(resolver.cleanup("5").unwrap());

        assert_eq!(tick.await.unwrap(), TickOutcome::Stopped);
        assert_eq!(resolver.storage().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawned_worker_saves_and_stops() {
        let (worker, resolver) = create_test_worker(Duration::from_millis(20));
        worker.coordinator.lock().await.add_item("m2", "Soup", 1500, 1);

        let handle = worker.spawn();
        let mut saved = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if resolver.storage().count().unwrap() == 1 {
                saved = true;
                break;
            }
        }
        assert!(saved);

        handle.stop();
        for _ in 0..50 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
    }
}
