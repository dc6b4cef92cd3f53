//! Service template store.
//!
//! The template is read once at startup and handed to request handlers behind
//! an `Arc`. [`Template`] exposes no mutating methods; per-request adaptation
//! starts from [`Template::instantiate`], which returns an independent copy.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::{ServiceSpec, TemplateError};

/// Default location of the service template inside the container image.
pub const DEFAULT_TEMPLATE_PATH: &str = "/templates/service.yaml";

/// Maximum nesting accepted in a YAML template that declares anchors.
///
/// Every level of alias expansion adds a level of nesting, so this bounds how
/// far a hostile document can expand. Documents without anchors cannot expand
/// and are not held to it.
pub const MAX_TEMPLATE_DEPTH: usize = 10;

/// The immutable service spec skeleton every synthesized Service starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    spec: ServiceSpec,
}

impl Template {
    /// Reads and decodes the template at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let template = Self::parse(&document)?;
        debug!(path = %path.display(), "loaded service template");
        Ok(template)
    }

    /// Decodes a YAML or JSON template document.
    ///
    /// Documents whose first non-whitespace character is `{` are decoded as
    /// JSON, everything else as YAML.
    pub fn parse(document: &str) -> Result<Self, TemplateError> {
        let tree: Value = if document.trim_start().starts_with('{') {
            serde_json::from_str(document).map_err(|e| TemplateError::Decode(e.to_string()))?
        } else {
            let tree: Value =
                serde_yaml::from_str(document).map_err(|e| TemplateError::Decode(e.to_string()))?;
            if may_declare_anchors(document) {
                check_depth(&tree)?;
            }
            tree
        };

        let spec: ServiceSpec =
            serde_json::from_value(tree).map_err(|e| TemplateError::Decode(e.to_string()))?;
        Self::from_spec(spec)
    }

    /// Wraps an already-decoded spec, checking it has a container to adapt.
    pub fn from_spec(spec: ServiceSpec) -> Result<Self, TemplateError> {
        if spec.container().is_none() {
            return Err(TemplateError::MissingContainer);
        }
        Ok(Self { spec })
    }

    /// Read-only view of the canonical spec.
    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    /// A deep copy of the spec that the caller may adapt freely.
    pub fn instantiate(&self) -> ServiceSpec {
        self.spec.clone()
    }
}

/// An alias needs an anchor, and an anchor needs a `&`. Stray `&`s inside
/// scalars only make the check stricter.
fn may_declare_anchors(document: &str) -> bool {
    document.contains('&')
}

fn check_depth(tree: &Value) -> Result<(), TemplateError> {
    let depth = nesting_depth(tree);
    if depth > MAX_TEMPLATE_DEPTH {
        return Err(TemplateError::TooDeep {
            depth,
            limit: MAX_TEMPLATE_DEPTH,
        });
    }
    Ok(())
}

fn nesting_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
        Value::Object(fields) => 1 + fields.values().map(nesting_depth).max().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use serde_json::json;

    const YAML_TEMPLATE: &str = r#"
runLatest:
  configuration:
    revisionTemplate:
      spec:
        container:
          image: example.com/k8sevents-adapter
          env:
            - name: NAMESPACE
              value: default
"#;

    const JSON_TEMPLATE: &str = r#"{
  "runLatest": {
    "configuration": {
      "revisionTemplate": {
        "spec": {
          "container": {
            "image": "example.com/k8sevents-adapter",
            "env": [{"name": "NAMESPACE", "value": "default"}]
          }
        }
      }
    }
  }
}"#;

    #[test]
    fn test_yaml_and_json_templates_decode_identically() {
        let yaml = Template::parse(YAML_TEMPLATE).unwrap();
        let json = Template::parse(JSON_TEMPLATE).unwrap();
        assert_eq!(yaml, json);

        let container = yaml.spec().container().unwrap();
        assert_eq!(container.image.as_deref(), Some("example.com/k8sevents-adapter"));
        assert_eq!(container.env.len(), 1);
        assert_eq!(container.env[0].name, "NAMESPACE");
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML_TEMPLATE.as_bytes()).unwrap();

        let template = Template::load(file.path()).unwrap();
        assert!(template.spec().container().is_some());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Template::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_invalid_document_fails() {
        let err = Template::parse("{ not json").unwrap_err();
        assert!(matches!(err, TemplateError::Decode(_)));

        let err = Template::parse("runLatest: [unterminated").unwrap_err();
        assert!(matches!(err, TemplateError::Decode(_)));

        let err = Template::parse("runLatest: 3").unwrap_err();
        assert!(matches!(err, TemplateError::Decode(_)));
    }

    #[test]
    fn test_template_without_container_fails() {
        let err = Template::parse("pinned:\n  revisionName: r1\n").unwrap_err();
        assert!(matches!(err, TemplateError::MissingContainer));
    }

    #[test]
    fn test_deep_template_without_anchors_is_accepted() {
        // root > runLatest > configuration > revisionTemplate > spec >
        // container > livenessProbe > httpGet > httpHeaders > [item] > extra
        let document = json!({"runLatest": {"configuration": {"revisionTemplate": {"spec": {
            "container": {
                "image": "example.com/adapter",
                "livenessProbe": {"httpGet": {"httpHeaders": [{"name": "X", "value": "y", "extra": {"k": "v"}}]}}
            }
        }}}}});
        assert!(nesting_depth(&document) > MAX_TEMPLATE_DEPTH);

        assert!(Template::parse(&document.to_string()).is_ok());

        let yaml = serde_yaml::to_string(&document).unwrap();
        assert!(!may_declare_anchors(&yaml));
        assert!(Template::parse(&yaml).is_ok());
    }

    #[test]
    fn test_anchored_template_at_depth_limit_is_accepted() {
        let document = r#"
runLatest:
  configuration:
    revisionTemplate:
      spec:
        container:
          image: example.com/adapter
          env:
            - &token
              name: TOKEN
              valueFrom:
                secretKeyRef: {name: s, key: k}
"#;
        assert!(Template::parse(document).is_ok());
    }

    #[test]
    fn test_expanding_aliases_hit_depth_limit() {
        let document = r#"
a: &a [x]
b: &b [*a]
c: &c [*b]
d: &d [*c]
e: &e [*d]
f: &f [*e]
g: &g [*f]
h: &h [*g]
i: &i [*h]
j: &j [*i]
k: &k [*j]
"#;
        let err = Template::parse(document).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::TooDeep { limit: MAX_TEMPLATE_DEPTH, .. }
        ));
    }

    #[test]
    fn test_instantiate_returns_independent_copy() {
        let template = Template::parse(YAML_TEMPLATE).unwrap();

        let mut first = template.instantiate();
        first.container_mut().unwrap().image = Some("mutated".to_string());

        let second = template.instantiate();
        assert_eq!(
            second.container().unwrap().image.as_deref(),
            Some("example.com/k8sevents-adapter")
        );
        assert_eq!(template.spec(), &second);
    }
}
