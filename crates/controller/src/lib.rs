//! Watch controller for `ClusterProvisioner` objects.
//!
//! The controller receives create/update/delete events from an
//! [`EventSource`], queues them per object, and hands each one to a
//! [`Reconciler`]. It guarantees that reconciliation of one object is never
//! concurrent with itself, bounds every call with a timeout, and retries
//! failures the reconciler marks as retryable.
//!
//! ## Extension Point
//!
//! The policy for reconciling a ClusterProvisioner is an open question that
//! belongs to whoever owns provisioner lifecycle semantics. Until it is
//! settled the binary installs [`LoggingReconciler`], which records events
//! and changes nothing.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Event delivery and retry sequencing live here. The
//! cluster watch that produces events is supplied by the deployment through
//! [`EventSource`]; the provisioner domain types come from [`provisioner`].

pub mod controller;
pub mod event;
pub mod reconciler;
pub mod source;

pub use controller::{ControllerConfig, ProvisionerController, CONTROLLER_NAME};
pub use event::ProvisionerEvent;
pub use reconciler::{LoggingReconciler, ReconcileOutcome, Reconciler};
pub use source::{channel, ChannelEventSource, ControllerError, EventSender, EventSource};
