//! Lifecycle events for `ClusterProvisioner` objects.

use provisioner::{ClusterProvisioner, ObjectName};

/// A create, update or delete notification for one ClusterProvisioner.
///
/// Deletions carry the last observed state of the object.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionerEvent {
    Created(ClusterProvisioner),
    Updated(ClusterProvisioner),
    Deleted(ClusterProvisioner),
}

impl ProvisionerEvent {
    /// The object the event is about.
    pub fn object(&self) -> &ClusterProvisioner {
        match self {
            Self::Created(object) | Self::Updated(object) | Self::Deleted(object) => object,
        }
    }

    /// Identity that serializes reconciliation. `None` if the object is unnamed.
    pub fn key(&self) -> Option<ObjectName> {
        self.object().key()
    }

    /// Lower-case action name for logs.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}
