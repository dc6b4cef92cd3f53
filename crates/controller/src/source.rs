//! Where ClusterProvisioner events come from.
//!
//! The cluster watch itself belongs to the deployment: it implements
//! [`EventSource`] over whatever feed it has. [`channel`] provides an
//! in-process source for wiring and tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::ProvisionerEvent;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller no longer reads from this source.
    #[error("provisioner controller has stopped")]
    Stopped,
}

/// A stream of ClusterProvisioner events.
#[async_trait]
pub trait EventSource: Send {
    /// The next event, or `None` once the stream has ended.
    ///
    /// Must be cancel-safe: the controller drops a pending call when it shuts
    /// down.
    async fn next_event(&mut self) -> Option<ProvisionerEvent>;
}

/// Receiving half of [`channel`].
#[derive(Debug)]
pub struct ChannelEventSource {
    events: mpsc::Receiver<ProvisionerEvent>,
}

/// Sending half of [`channel`]. Dropping every sender ends the stream.
#[derive(Debug, Clone)]
pub struct EventSender {
    events: mpsc::Sender<ProvisionerEvent>,
}

/// Creates a bounded in-process event source.
///
/// A `capacity` of zero is treated as one.
pub fn channel(capacity: usize) -> (EventSender, ChannelEventSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { events: tx }, ChannelEventSource { events: rx })
}

impl EventSender {
    /// Delivers `event`, waiting while the source is full.
    pub async fn send(&self, event: ProvisionerEvent) -> Result<(), ControllerError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ControllerError::Stopped)
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<ProvisionerEvent> {
        self.events.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioner::ClusterProvisioner;

    #[tokio::test]
    async fn test_channel_delivers_in_order_then_ends() {
        let (sender, mut source) = channel(4);
        sender
            .send(ProvisionerEvent::Created(ClusterProvisioner::named("a")))
            .await
            .unwrap();
        sender
            .send(ProvisionerEvent::Deleted(ClusterProvisioner::named("a")))
            .await
            .unwrap();
        drop(sender);

        assert_eq!(source.next_event().await.unwrap().action(), "created");
        assert_eq!(source.next_event().await.unwrap().action(), "deleted");
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_send_fails_once_source_is_dropped() {
        let (sender, source) = channel(1);
        drop(source);

        let err = sender
            .send(ProvisionerEvent::Created(ClusterProvisioner::named("a")))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Stopped));
    }

    #[tokio::test]
    async fn test_zero_capacity_still_delivers() {
        let (sender, mut source) = channel(0);
        sender
            .send(ProvisionerEvent::Updated(ClusterProvisioner::named("a")))
            .await
            .unwrap();

        assert_eq!(source.next_event().await.unwrap().action(), "updated");
    }
}
