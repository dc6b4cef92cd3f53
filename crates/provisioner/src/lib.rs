//! Core domain for the k8sevents provisioner.
//!
//! Given a `Source` whose provisioner reference names `k8sevents`, the
//! provisioner synthesizes a Knative `Service` (from a service template) and a
//! `Channel`, which the caller hands on to the control plane to create.
//!
//! ## Architectural Layer
//!
//! **Business logic.** This crate knows nothing about HTTP or the cluster
//! event feed. The `webhook` crate decodes requests into [`Source`] values and
//! the `controller` crate delivers [`ClusterProvisioner`] events; both call in
//! here.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers and well-known provisioner names |
//! | [`types`] | Wire shapes of Sources, Services, Channels, ClusterProvisioners |
//! | [`template`] | Service template store |
//! | [`synthesis`] | Attachment synthesis |
//! | [`errors`] | Error and retry-policy types |

pub mod errors;
pub mod identifiers;
pub mod synthesis;
pub mod template;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{RetryPolicy, SynthesisError, TemplateError};
pub use identifiers::{
    ObjectName, ProvisionerName, DEFAULT_CHANNEL_PROVISIONER, K8S_EVENTS_PROVISIONER,
};
pub use synthesis::{
    Attachment, AttachmentSet, Skip, Synthesis, Synthesizer, CHANNEL_ADDRESS_ENV,
    UNWIRED_CHANNEL_ADDRESS,
};
pub use template::{Template, DEFAULT_TEMPLATE_PATH, MAX_TEMPLATE_DEPTH};
pub use types::{
    Channel, ChannelSpec, ClusterProvisioner, ClusterProvisionerSpec, ConfigurationSpec, Container,
    EnvVar, Extra, GroupKind, ObjectMeta, ObjectReference, ProvisionerReference, RevisionSpec,
    RevisionTemplateSpec, RunLatestType, Service, ServiceSpec, Source, SourceSpec,
};
