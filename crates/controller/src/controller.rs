//! The dispatch loop that feeds events to the reconciler.
//!
//! Every object key gets its own worker task with a FIFO queue, so events for
//! one ClusterProvisioner are reconciled strictly one after another while
//! different ClusterProvisioners proceed in parallel. Handing an event to a
//! worker never waits, so a slow key only delays its own events.
//!
//! A worker is retired once it has finished a `Deleted` event and nothing was
//! queued behind it. A key that is re-created while its old worker still has
//! work keeps that worker, so the old and new object are never reconciled
//! concurrently.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use provisioner::{ObjectName, RetryPolicy};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::{EventSource, ProvisionerEvent, ReconcileOutcome, Reconciler};

/// Name the controller logs under.
pub const CONTROLLER_NAME: &str = "k8sevents-provisioner-controller";

/// Tuning for the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Upper bound on a single reconcile call. Overrunning attempts are
    /// cancelled and count as retryable failures.
    pub reconcile_timeout: Duration,
    /// Delay before retrying when the reconciler does not name one.
    pub retry_backoff: Duration,
    /// Attempts per event, including the first.
    pub max_attempts: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconcile_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// Watches ClusterProvisioner events and hands them to a [`Reconciler`].
pub struct ProvisionerController {
    reconciler: Arc<dyn Reconciler>,
    config: ControllerConfig,
}

impl ProvisionerController {
    pub fn new(reconciler: Arc<dyn Reconciler>, config: ControllerConfig) -> Self {
        Self { reconciler, config }
    }

    /// Dispatches events from `source` until it ends or `shutdown` resolves.
    ///
    /// Once either happens no further events are read. Events already queued
    /// for a key are still reconciled before this returns.
    #[instrument(name = "provisioner_controller", skip_all, fields(controller = CONTROLLER_NAME))]
    pub async fn run<S, F>(self, mut source: S, shutdown: F)
    where
        S: EventSource,
        F: Future<Output = ()> + Send,
    {
        let (mut workers, mut idle) = Workers::new(self.reconciler, self.config);
        tokio::pin!(shutdown);

        info!("provisioner controller started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting events");
                    break;
                }
                Some(report) = idle.recv() => workers.retire(report),
                Some(result) = workers.tasks.join_next() => log_worker_exit(result),
                next = source.next_event() => match next {
                    Some(event) => workers.dispatch(event),
                    None => {
                        info!("event source closed");
                        break;
                    }
                },
            }
        }

        workers.drain().await;
        info!("provisioner controller stopped");
    }
}

/// Sent by a worker each time it finishes a `Deleted` event.
#[derive(Debug)]
struct IdleReport {
    key: ObjectName,
    processed: u64,
}

struct WorkerHandle {
    queue: mpsc::UnboundedSender<ProvisionerEvent>,
    sent: u64,
}

/// The live per-key workers.
struct Workers {
    reconciler: Arc<dyn Reconciler>,
    config: ControllerConfig,
    handles: HashMap<ObjectName, WorkerHandle>,
    tasks: JoinSet<()>,
    idle: mpsc::UnboundedSender<IdleReport>,
}

impl Workers {
    fn new(
        reconciler: Arc<dyn Reconciler>,
        config: ControllerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<IdleReport>) {
        let (idle, idle_rx) = mpsc::unbounded_channel();
        let workers = Self {
            reconciler,
            config,
            handles: HashMap::new(),
            tasks: JoinSet::new(),
            idle,
        };
        (workers, idle_rx)
    }

    fn len(&self) -> usize {
        self.handles.len()
    }

    /// Queues `event` on its key's worker, starting one if needed.
    fn dispatch(&mut self, event: ProvisionerEvent) {
        let Some(key) = event.key() else {
            warn!(action = event.action(), "dropping event for unnamed ClusterProvisioner");
            return;
        };

        let handle = match self.handles.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.tasks.spawn(run_worker(
                    key.clone(),
                    rx,
                    Arc::clone(&self.reconciler),
                    self.config.clone(),
                    self.idle.clone(),
                ));
                entry.insert(WorkerHandle { queue: tx, sent: 0 })
            }
        };

        if handle.queue.send(event).is_err() {
            error!(key = %key, "reconcile worker is gone, dropping event");
            self.handles.remove(&key);
            return;
        }
        handle.sent += 1;
    }

    /// Drops the worker named in `report` if it has caught up with every
    /// event sent to it.
    fn retire(&mut self, report: IdleReport) {
        let caught_up = self
            .handles
            .get(&report.key)
            .is_some_and(|handle| handle.sent == report.processed);
        if caught_up {
            self.handles.remove(&report.key);
            debug!(key = %report.key, "retired reconcile worker");
        }
    }

    /// Closes every queue and waits for the workers to finish what they hold.
    async fn drain(mut self) {
        self.handles.clear();
        while let Some(result) = self.tasks.join_next().await {
            log_worker_exit(result);
        }
    }
}

fn log_worker_exit(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "reconcile worker failed");
    }
}

#[instrument(name = "reconcile_worker", skip_all, fields(key = %key))]
async fn run_worker(
    key: ObjectName,
    mut events: mpsc::UnboundedReceiver<ProvisionerEvent>,
    reconciler: Arc<dyn Reconciler>,
    config: ControllerConfig,
    idle: mpsc::UnboundedSender<IdleReport>,
) {
    let mut processed = 0;
    while let Some(event) = events.recv().await {
        reconcile_with_retries(&event, reconciler.as_ref(), &config).await;
        processed += 1;
        if matches!(event, ProvisionerEvent::Deleted(_)) {
            // The dispatcher may already be gone during drain.
            let _ = idle.send(IdleReport {
                key: key.clone(),
                processed,
            });
        }
    }
    debug!("reconcile worker stopped");
}

/// Runs one event through the reconciler, retrying retryable failures.
async fn reconcile_with_retries(
    event: &ProvisionerEvent,
    reconciler: &dyn Reconciler,
    config: &ControllerConfig,
) -> ReconcileOutcome {
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(config.reconcile_timeout, reconciler.reconcile(event))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => ReconcileOutcome::retryable(
                format!(
                    "reconcile exceeded {}ms",
                    config.reconcile_timeout.as_millis()
                ),
                None,
            ),
        };

        match &outcome {
            ReconcileOutcome::Done => {
                debug!(action = event.action(), attempt, "reconciled");
                return outcome;
            }
            ReconcileOutcome::Failed {
                reason,
                retry: RetryPolicy::NonRetryable,
            } => {
                warn!(action = event.action(), attempt, reason = %reason, "reconcile failed, not retrying");
                return outcome;
            }
            ReconcileOutcome::Failed {
                reason,
                retry: RetryPolicy::Retryable { after },
            } => {
                if attempt >= config.max_attempts {
                    error!(action = event.action(), attempt, reason = %reason, "reconcile failed, giving up");
                    return outcome;
                }
                let delay = after.unwrap_or(config.retry_backoff);
                warn!(
                    action = event.action(),
                    attempt,
                    reason = %reason,
                    retry_in_ms = delay.as_millis() as u64,
                    "reconcile failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
