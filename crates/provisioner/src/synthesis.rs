//! Resource synthesis: turning a [`Source`] into the Service and Channel the
//! control plane should create for it.
//!
//! Synthesis is pure. It reads the shared [`Template`] and the request's
//! Source and builds fresh objects; nothing it returns aliases the template.

use serde::Serialize;
use tracing::debug;

use crate::{
    Channel, EnvVar, ObjectMeta, ProvisionerName, Service, Source, SynthesisError, Template,
};

/// Environment variable through which the Service learns its Channel's address.
pub const CHANNEL_ADDRESS_ENV: &str = "CHANNEL_ADDRESS";

/// Value bound to [`CHANNEL_ADDRESS_ENV`].
///
/// The Channel's real address is only known once the control plane has
/// created it, and nothing feeds it back here yet. Until that is wired up
/// every Service carries this marker instead of an address.
pub const UNWIRED_CHANNEL_ADDRESS: &str = "TODO channel";

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// One synthesized object returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Attachment {
    Service(Service),
    Channel(Channel),
}

impl Attachment {
    /// The attachment's `kind` as it appears on the wire.
    pub fn kind(&self) -> &str {
        match self {
            Self::Service(service) => &service.kind,
            Self::Channel(channel) => &channel.kind,
        }
    }
}

/// Ordered attachments for one Source: either `[Service, Channel]` or nothing.
///
/// The constructors are the only way to build a set, so a set holding a
/// Service without its Channel cannot exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttachmentSet(Vec<Attachment>);

impl AttachmentSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn new(service: Service, channel: Channel) -> Self {
        Self(vec![Attachment::Service(service), Attachment::Channel(channel)])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire kinds in order, for logs.
    pub fn kinds(&self) -> Vec<&str> {
        self.0.iter().map(Attachment::kind).collect()
    }

    pub fn service(&self) -> Option<&Service> {
        match self.0.first() {
            Some(Attachment::Service(service)) => Some(service),
            _ => None,
        }
    }

    pub fn channel(&self) -> Option<&Channel> {
        match self.0.get(1) {
            Some(Attachment::Channel(channel)) => Some(channel),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesis outcome
// ---------------------------------------------------------------------------

/// Result of offering a Source to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    /// The Source is governed by this provisioner; attachments were built.
    Provisioned(AttachmentSet),
    /// The Source belongs to another provisioner and was left alone.
    Skipped(Skip),
}

/// Why a Source was skipped, for the caller's logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    /// Name of the skipped Source.
    pub source: String,
    /// Provisioner the Source names instead. `None` when it names none.
    pub provisioner: Option<ProvisionerName>,
}

impl Synthesis {
    /// The attachments to return; empty for a skipped Source.
    pub fn into_attachments(self) -> AttachmentSet {
        match self {
            Self::Provisioned(attachments) => attachments,
            Self::Skipped(_) => AttachmentSet::empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Builds attachments for Sources governed by a single provisioner identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesizer {
    identity: ProvisionerName,
    channel_provisioner: ProvisionerName,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(
            ProvisionerName::k8s_events(),
            ProvisionerName::default_channel(),
        )
    }
}

impl Synthesizer {
    /// A synthesizer answering for `identity` whose Channels are handed to
    /// `channel_provisioner`.
    pub fn new(identity: ProvisionerName, channel_provisioner: ProvisionerName) -> Self {
        Self {
            identity,
            channel_provisioner,
        }
    }

    pub fn identity(&self) -> &ProvisionerName {
        &self.identity
    }

    /// Returns `true` if `source` names this synthesizer's identity.
    pub fn governs(&self, source: &Source) -> bool {
        source.provisioner_name() == Some(self.identity.as_str())
    }

    /// Synthesizes the Service and Channel for `source`.
    ///
    /// Sources governed by a different provisioner yield
    /// [`Synthesis::Skipped`]. The template is never modified; the Service
    /// spec is built from [`Template::instantiate`].
    pub fn synthesize(
        &self,
        source: &Source,
        template: &Template,
    ) -> Result<Synthesis, SynthesisError> {
        if !self.governs(source) {
            return Ok(Synthesis::Skipped(Skip {
                source: source.name().to_string(),
                provisioner: source.provisioner_name().and_then(ProvisionerName::new),
            }));
        }

        let mut spec = template.instantiate();
        spec.container_mut()
            .ok_or(SynthesisError::MissingContainer)?
            .env
            .push(EnvVar::new(CHANNEL_ADDRESS_ENV, UNWIRED_CHANNEL_ADDRESS));

        let service = Service::new(ObjectMeta::generated_from(source.name()), spec);
        let channel = Channel::new(
            ObjectMeta::generated_from(source.name()),
            &self.channel_provisioner,
        );

        debug!(source = source.name(), "synthesized service and channel");
        Ok(Synthesis::Provisioned(AttachmentSet::new(service, channel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Template {
        Template::parse(
            r#"
runLatest:
  configuration:
    revisionTemplate:
      spec:
        container:
          image: example.com/k8sevents-adapter
          env:
            - name: NAMESPACE
              value: default
"#,
        )
        .unwrap()
    }

    fn source(name: &str, provisioner: &str) -> Source {
        Source::new(name, &ProvisionerName::new(provisioner).unwrap())
    }

    #[test]
    fn test_governed_source_yields_service_then_channel() {
        let synthesis = Synthesizer::default()
            .synthesize(&source("src1", "k8sevents"), &template())
            .unwrap();

        let Synthesis::Provisioned(attachments) = synthesis else {
            panic!("expected attachments");
        };
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments.kinds(), vec!["Service", "Channel"]);

        let service = attachments.service().unwrap();
        assert_eq!(service.metadata.generate_name.as_deref(), Some("src1"));
        assert_eq!(service.api_version, Service::API_VERSION);

        let channel = attachments.channel().unwrap();
        assert_eq!(channel.metadata.generate_name.as_deref(), Some("src1"));
        assert_eq!(
            channel.spec.provisioner.as_ref().and_then(|p| p.name()),
            Some("default")
        );
    }

    #[test]
    fn test_other_provisioner_is_skipped() {
        let synthesis = Synthesizer::default()
            .synthesize(&source("src1", "other"), &template())
            .unwrap();

        assert_eq!(
            synthesis,
            Synthesis::Skipped(Skip {
                source: "src1".to_string(),
                provisioner: ProvisionerName::new("other"),
            })
        );
        assert!(synthesis.into_attachments().is_empty());
    }

    #[test]
    fn test_source_without_provisioner_is_skipped() {
        let synthesis = Synthesizer::default()
            .synthesize(&Source::default(), &template())
            .unwrap();

        assert!(matches!(
            synthesis,
            Synthesis::Skipped(Skip { provisioner: None, .. })
        ));
    }

    #[test]
    fn test_channel_address_is_appended_after_existing_env() {
        let attachments = Synthesizer::default()
            .synthesize(&source("src1", "k8sevents"), &template())
            .unwrap()
            .into_attachments();

        let env = &attachments.service().unwrap().spec.container().unwrap().env;
        assert_eq!(
            env,
            &vec![
                EnvVar::new("NAMESPACE", "default"),
                EnvVar::new(CHANNEL_ADDRESS_ENV, UNWIRED_CHANNEL_ADDRESS),
            ]
        );
    }

    #[test]
    fn test_synthesis_never_touches_the_template() {
        let template = template();
        let before = template.clone();
        let synthesizer = Synthesizer::default();

        let mut first = synthesizer
            .synthesize(&source("a", "k8sevents"), &template)
            .unwrap()
            .into_attachments();
        let Some(Attachment::Service(service)) = first.0.first_mut() else {
            panic!("first attachment must be a service");
        };
        service.spec.container_mut().unwrap().env.clear();
        service.spec.extra.insert("mutated".into(), json!(true));

        let second = synthesizer
            .synthesize(&source("b", "k8sevents"), &template)
            .unwrap()
            .into_attachments();
        let spec = &second.service().unwrap().spec;
        assert_eq!(spec.container().unwrap().env.len(), 2);
        assert!(spec.extra.is_empty());
        assert_eq!(template, before);
    }

    #[test]
    fn test_attachment_set_serializes_in_order() {
        let attachments = Synthesizer::default()
            .synthesize(&source("src1", "k8sevents"), &template())
            .unwrap()
            .into_attachments();

        let value = serde_json::to_value(&attachments).unwrap();
        assert_eq!(value[0]["kind"], json!("Service"));
        assert_eq!(value[0]["metadata"], json!({"generateName": "src1"}));
        assert_eq!(
            value[0]["spec"]["runLatest"]["configuration"]["revisionTemplate"]["spec"]["container"]
                ["env"][1],
            json!({"name": "CHANNEL_ADDRESS", "value": "TODO channel"})
        );
        assert_eq!(value[1]["kind"], json!("Channel"));
        assert_eq!(value[1]["spec"]["provisioner"]["ref"]["name"], json!("default"));
    }
}
