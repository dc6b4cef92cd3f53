//! The reconciler port.
//!
//! What reconciling a ClusterProvisioner should actually do is not decided
//! yet. [`Reconciler`] is the seam where that policy plugs in;
//! [`LoggingReconciler`] only records what it was asked to do.

use std::time::Duration;

use async_trait::async_trait;
use provisioner::RetryPolicy;
use tracing::info;

use crate::ProvisionerEvent;

/// Result of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The observed state has been handled.
    Done,
    /// The attempt failed; `retry` says whether it may be attempted again.
    Failed { reason: String, retry: RetryPolicy },
}

impl ReconcileOutcome {
    /// A failure that may be retried, after `after` if given.
    pub fn retryable(reason: impl Into<String>, after: Option<Duration>) -> Self {
        Self::Failed {
            reason: reason.into(),
            retry: RetryPolicy::Retryable { after },
        }
    }

    /// A failure that must not be retried.
    pub fn terminal(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            retry: RetryPolicy::NonRetryable,
        }
    }
}

/// Brings the world in line with one ClusterProvisioner event.
///
/// Implementations must be idempotent: the same event may be delivered more
/// than once after a retryable failure. They must also return in bounded
/// time; the controller cancels attempts that exceed its reconcile timeout.
/// Calls for one object never overlap, but calls for different objects may.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, event: &ProvisionerEvent) -> ReconcileOutcome;
}

/// Records each event and reports success without acting on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReconciler;

#[async_trait]
impl Reconciler for LoggingReconciler {
    async fn reconcile(&self, event: &ProvisionerEvent) -> ReconcileOutcome {
        let object = event.object();
        info!(
            action = event.action(),
            name = object.metadata.name.as_deref().unwrap_or_default(),
            reconciles = ?object.spec.reconciles,
            "observed ClusterProvisioner"
        );
        ReconcileOutcome::Done
    }
}
