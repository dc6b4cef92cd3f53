//! Newtype domain identifiers.
//!
//! Object names and provisioner identities are both plain strings on the wire.
//! Wrapping them keeps a provisioner identity from being compared against an
//! object name by accident.

use serde::{Deserialize, Serialize};

/// Provisioner identity whose Sources this process synthesizes attachments for.
pub const K8S_EVENTS_PROVISIONER: &str = "k8sevents";

/// Provisioner identity written into every synthesized Channel.
pub const DEFAULT_CHANNEL_PROVISIONER: &str = "default";

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Identifies a provisioner implementation (e.g. `"k8sevents"`, `"default"`).
    ///
    /// Sources and Channels name their governing provisioner through an object
    /// reference; only the reference's `name` participates in matching.
    ProvisionerName
}

string_id! {
    /// Name of a cluster object, used as its identity for event serialization.
    ///
    /// `ClusterProvisioner` objects are cluster-scoped, so the name alone is
    /// a unique key.
    ObjectName
}

impl ProvisionerName {
    /// The identity this process synthesizes for.
    pub fn k8s_events() -> Self {
        Self(K8S_EVENTS_PROVISIONER.to_string())
    }

    /// The provisioner referenced by synthesized Channels.
    pub fn default_channel() -> Self {
        Self(DEFAULT_CHANNEL_PROVISIONER.to_string())
    }
}
