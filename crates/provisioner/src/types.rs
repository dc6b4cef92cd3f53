//! Wire shapes of the cluster objects the provisioner reads and produces.
//!
//! Only the fields the provisioner inspects or writes are typed. Everything
//! else an object carries is kept in a flattened `extra` map so that a template
//! author's `ports`, `resources`, labels and so on survive synthesis untouched.
//!
//! Field names follow the Kubernetes JSON conventions (`camelCase`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{ObjectName, ProvisionerName};

/// Untyped fields preserved verbatim alongside the typed ones.
pub type Extra = Map<String, Value>;

/// Reads an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Shared metadata
// ---------------------------------------------------------------------------

/// The subset of Kubernetes `ObjectMeta` the provisioner works with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Final object name. Absent on synthesized objects; the control plane
    /// assigns it from [`ObjectMeta::generate_name`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name prefix from which the control plane generates the final name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,

    /// Namespace, labels, annotations and anything else.
    #[serde(flatten)]
    pub extra: Extra,
}

impl ObjectMeta {
    /// Metadata for a synthesized object whose name is generated from `prefix`.
    ///
    /// An empty prefix is omitted rather than emitted as `""`.
    pub fn generated_from(prefix: &str) -> Self {
        Self {
            generate_name: (!prefix.is_empty()).then(|| prefix.to_string()),
            ..Self::default()
        }
    }
}

/// Reference to another object by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// Points a Source or Channel at the provisioner that governs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerReference {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ObjectReference>,
}

impl ProvisionerReference {
    /// A reference to the provisioner named `name`.
    pub fn to(name: &ProvisionerName) -> Self {
        Self {
            reference: Some(ObjectReference {
                name: name.as_str().to_string(),
                extra: Extra::new(),
            }),
        }
    }

    /// The referenced provisioner's name, if one is set.
    pub fn name(&self) -> Option<&str> {
        self.reference.as_ref().map(|r| r.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Source (input)
// ---------------------------------------------------------------------------

/// An event-source custom resource submitted for provisioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,

    #[serde(default, deserialize_with = "null_as_default")]
    pub spec: SourceSpec,
}

/// Desired state of a [`Source`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioner: Option<ProvisionerReference>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Source {
    /// Builds a Source named `name` governed by `provisioner`.
    pub fn new(name: impl Into<String>, provisioner: &ProvisionerName) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            spec: SourceSpec {
                provisioner: Some(ProvisionerReference::to(provisioner)),
                extra: Extra::new(),
            },
            ..Self::default()
        }
    }

    /// The Source's name, or `""` when the metadata carries none.
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// Name of the provisioner referenced by `spec.provisioner.ref.name`.
    pub fn provisioner_name(&self) -> Option<&str> {
        self.spec.provisioner.as_ref().and_then(ProvisionerReference::name)
    }
}

// ---------------------------------------------------------------------------
// Service spec (template + output)
// ---------------------------------------------------------------------------

/// Knative serving `v1alpha1` service spec, as found in the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_latest: Option<RunLatestType>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl ServiceSpec {
    /// The container the revision template runs, if the spec has one.
    pub fn container(&self) -> Option<&Container> {
        self.run_latest
            .as_ref()
            .map(|r| &r.configuration.revision_template.spec.container)
    }

    /// Mutable access to the revision template's container.
    pub fn container_mut(&mut self) -> Option<&mut Container> {
        self.run_latest
            .as_mut()
            .map(|r| &mut r.configuration.revision_template.spec.container)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLatestType {
    pub configuration: ConfigurationSpec,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSpec {
    pub revision_template: RevisionTemplateSpec,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisionTemplateSpec {
    pub spec: RevisionSpec,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevisionSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub container: Container,

    #[serde(flatten)]
    pub extra: Extra,
}

/// The single container a revision runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment bindings, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A single environment binding. `valueFrom` and friends live in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl EnvVar {
    /// A literal `name=value` binding.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            extra: Extra::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesized objects (output)
// ---------------------------------------------------------------------------

/// A Knative serving `Service` description derived from the template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ServiceSpec,
}

impl Service {
    pub const API_VERSION: &'static str = "serving.knative.dev/v1alpha1";
    pub const KIND: &'static str = "Service";

    pub fn new(metadata: ObjectMeta, spec: ServiceSpec) -> Self {
        Self {
            api_version: Self::API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata,
            spec,
        }
    }
}

/// A Knative eventing `Channel` description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ChannelSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioner: Option<ProvisionerReference>,
}

impl Channel {
    pub const API_VERSION: &'static str = "eventing.knative.dev/v1alpha1";
    pub const KIND: &'static str = "Channel";

    pub fn new(metadata: ObjectMeta, provisioner: &ProvisionerName) -> Self {
        Self {
            api_version: Self::API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            metadata,
            spec: ChannelSpec {
                provisioner: Some(ProvisionerReference::to(provisioner)),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ClusterProvisioner (watched)
// ---------------------------------------------------------------------------

/// Cluster-scoped registration of a provisioner implementation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProvisioner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,

    #[serde(default, deserialize_with = "null_as_default")]
    pub spec: ClusterProvisionerSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterProvisionerSpec {
    /// The kind of resource this provisioner reconciles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciles: Option<GroupKind>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKind {
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: String,
}

impl ClusterProvisioner {
    /// A ClusterProvisioner named `name` with an empty spec.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            ..Self::default()
        }
    }

    /// Identity used to serialize reconciliation. `None` for unnamed objects.
    pub fn key(&self) -> Option<ObjectName> {
        self.metadata.name.clone().and_then(ObjectName::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_decodes_provisioner_reference() {
        let source: Source = serde_json::from_value(json!({
            "metadata": {"name": "src1", "namespace": "default"},
            "spec": {"provisioner": {"ref": {"name": "k8sevents"}}}
        }))
        .unwrap();

        assert_eq!(source.name(), "src1");
        assert_eq!(source.provisioner_name(), Some("k8sevents"));
        assert_eq!(source.metadata.extra["namespace"], json!("default"));
    }

    #[test]
    fn test_source_without_provisioner_has_no_provisioner_name() {
        let source: Source = serde_json::from_value(json!({"metadata": {"name": "a"}})).unwrap();
        assert_eq!(source.provisioner_name(), None);

        let source: Source =
            serde_json::from_value(json!({"spec": {"provisioner": {}}})).unwrap();
        assert_eq!(source.provisioner_name(), None);
        assert_eq!(source.name(), "");
    }

    #[test]
    fn test_null_fields_decode_as_absent() {
        let source: Source =
            serde_json::from_value(json!({"metadata": null, "spec": null})).unwrap();
        assert_eq!(source, Source::default());

        let source: Source = serde_json::from_value(json!({
            "spec": {"provisioner": {"ref": {"name": null}}}
        }))
        .unwrap();
        assert_eq!(source.provisioner_name(), Some(""));
    }

    #[test]
    fn test_service_spec_preserves_unknown_fields() {
        let value = json!({
            "runLatest": {
                "configuration": {
                    "revisionTemplate": {
                        "metadata": {"labels": {"app": "events"}},
                        "spec": {
                            "container": {
                                "image": "example.com/adapter",
                                "ports": [{"containerPort": 8080}],
                                "env": [{"name": "A", "valueFrom": {"fieldRef": {"fieldPath": "x"}}}]
                            },
                            "serviceAccountName": "adapter"
                        }
                    }
                }
            }
        });

        let spec: ServiceSpec = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            spec.container().and_then(|c| c.image.as_deref()),
            Some("example.com/adapter")
        );
        assert_eq!(serde_json::to_value(&spec).unwrap(), value);
    }

    #[test]
    fn test_channel_serializes_type_meta_and_provisioner() {
        let channel = Channel::new(
            ObjectMeta::generated_from("src1"),
            &ProvisionerName::default_channel(),
        );

        assert_eq!(
            serde_json::to_value(&channel).unwrap(),
            json!({
                "apiVersion": "eventing.knative.dev/v1alpha1",
                "kind": "Channel",
                "metadata": {"generateName": "src1"},
                "spec": {"provisioner": {"ref": {"name": "default"}}}
            })
        );
    }

    #[test]
    fn test_empty_generate_name_is_omitted() {
        let meta = ObjectMeta::generated_from("");
        assert_eq!(serde_json::to_value(&meta).unwrap(), json!({}));
    }

    #[test]
    fn test_cluster_provisioner_key() {
        assert_eq!(
            ClusterProvisioner::named("k8sevents").key().map(|k| k.to_string()),
            Some("k8sevents".to_string())
        );
        assert!(ClusterProvisioner::default().key().is_none());
        assert!(ClusterProvisioner::named("").key().is_none());
    }
}
