//! Graph entities: manifest-declared resources and the derived concepts discovery adds.
use serde::Serialize;

use super::record::Record;
use crate::errors::ExplorerError;

pub const DEFAULT_NAMESPACE: &str = "default";

pub const POD_KIND: &str = "Pod";
pub const SERVICE_KIND: &str = "Service";
pub const INGRESS_KIND: &str = "Ingress";
pub const LABEL_KIND: &str = "Label";
pub const NAMESPACE_KIND: &str = "Namespace";
pub const APPLICATION_KIND: &str = "Application";
pub const CONTAINER_IMAGE_KIND: &str = "ContainerImage";
pub const HOST_KIND: &str = "Host";

/// A manifest-declared object of any kind. Kind-specific behavior dispatches on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub api_version: Option<String>,
    pub labels: Vec<(String, String)>,
    pub annotations: Vec<(String, String)>,
    /// The whole source document.
    pub specification: Record,
}

impl Resource {
    /// Build a resource from a parsed manifest.
    ///
    /// # Errors
    /// Returns `ExplorerError::Validation` when the document has no string `kind` field.
    pub fn from_record(document: Record) -> Result<Self, ExplorerError> {
        let kind = match document.get("kind").as_str() {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => {
                let name = document.path(&["metadata", "name"]).scalar_string();
                return Err(ExplorerError::Validation(format!(
                    "document{} does not contain a valid Kubernetes kind",
                    name.map(|n| format!(" `{n}`")).unwrap_or_default()
                )));
            }
        };
        Ok(Self::with_kind(kind, document))
    }

    /// Build a resource of the given kind without looking at the document's own `kind`.
    #[must_use]
    pub fn with_kind(kind: impl Into<String>, document: Record) -> Self {
        let metadata = document.get("metadata");
        let name = metadata.get("name").scalar_string().unwrap_or_default();
        let namespace = metadata
            .get("namespace")
            .as_str()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string();
        let api_version = document.get("apiVersion").as_str().map(str::to_string);
        let labels = metadata.get("labels").string_pairs();
        let annotations = metadata.get("annotations").string_pairs();
        Self {
            kind: kind.into(),
            name,
            namespace,
            api_version,
            labels,
            annotations,
            specification: document,
        }
    }

    #[must_use]
    pub fn id(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }

    /// The `spec` section of the document.
    #[must_use]
    pub fn spec(&self) -> &Record {
        self.specification.get("spec")
    }

    /// The namespace written in the manifest, if any. `namespace` falls back to `default`;
    /// this does not.
    #[must_use]
    pub fn declared_namespace(&self) -> Option<&str> {
        self.specification.path(&["metadata", "namespace"]).as_str().filter(|ns| !ns.is_empty())
    }

    /// Pods described by a mapping `spec.template`, one per replica, named `<name>-<i>`.
    ///
    /// The pod document is the template itself, so its own labels and annotations apply.
    #[must_use]
    pub fn synthesize_pods(&self) -> Vec<Resource> {
        let template = self.spec().get("template");
        if template.as_map().is_none() {
            return Vec::new();
        }
        let replicas = match self.spec().get("replicas") {
            r if r.is_present() => usize::try_from(r.as_i64().unwrap_or(1)).unwrap_or(0),
            _ => 1,
        };
        (1..=replicas)
            .map(|i| {
                let mut document = template.clone();
                if document.get("metadata").as_map().is_none() {
                    document.insert("metadata", Record::map());
                }
                if let Some(metadata) = document.get_mut("metadata") {
                    metadata.insert("name", Record::Str(format!("{}-{i}", self.name)));
                    if metadata.get("namespace").as_str().is_none() {
                        if let Some(ns) = self.declared_namespace() {
                            metadata.insert("namespace", Record::from(ns));
                        }
                    }
                }
                Resource::with_kind(POD_KIND, document)
            })
            .collect()
    }

    fn pairs_record(pairs: &[(String, String)]) -> Record {
        Record::Map(pairs.iter().map(|(k, v)| (k.clone(), Record::from(v.as_str()))).collect())
    }
}

/// Key-value pair behind a `Label` node. Annotation pairs share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Entity {
    Resource(Resource),
    Label(KeyValue),
    Namespace(String),
    Application(String),
    ContainerImage(String),
    Host(String),
}

impl Entity {
    #[must_use]
    pub fn label(key: &str, value: &str) -> Self {
        Entity::Label(KeyValue { key: key.to_string(), value: value.to_string() })
    }

    /// Node kind: the manifest kind for resources, the entity class otherwise.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Entity::Resource(r) => &r.kind,
            Entity::Label(_) => LABEL_KIND,
            Entity::Namespace(_) => NAMESPACE_KIND,
            Entity::Application(_) => APPLICATION_KIND,
            Entity::ContainerImage(_) => CONTAINER_IMAGE_KIND,
            Entity::Host(_) => HOST_KIND,
        }
    }

    /// Deterministic node identity.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Entity::Resource(r) => r.id(),
            Entity::Label(kv) => format!("{}:{}:{}", self.kind(), kv.key, kv.value),
            Entity::Namespace(key)
            | Entity::Application(key)
            | Entity::ContainerImage(key)
            | Entity::Host(key) => format!("{}:{key}", self.kind()),
        }
    }

    #[must_use]
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Entity::Resource(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_key_value(&self) -> Option<&KeyValue> {
        match self {
            Entity::Label(kv) => Some(kv),
            _ => None,
        }
    }

    /// The key of key-only entities (and the name of a namespace).
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Entity::Namespace(k) | Entity::Application(k) | Entity::ContainerImage(k) | Entity::Host(k) => {
                Some(k)
            }
            Entity::Label(kv) => Some(&kv.key),
            Entity::Resource(_) => None,
        }
    }

    /// Attribute lookup used by query filters. `id` and `kind` are answered by the node.
    #[must_use]
    pub fn attribute<S: AsRef<str>>(&self, path: &[S]) -> Record {
        let Some((first, rest)) = path.split_first() else {
            return Record::Absent;
        };
        let field = match (self, first.as_ref()) {
            (Entity::Resource(r), "name") => Record::from(r.name.as_str()),
            (Entity::Resource(r), "namespace") => Record::from(r.namespace.as_str()),
            (Entity::Resource(r), "apiVersion") => {
                r.api_version.as_deref().map_or(Record::Absent, Record::from)
            }
            (Entity::Resource(r), "labels") => Resource::pairs_record(&r.labels),
            (Entity::Resource(r), "annotations") => Resource::pairs_record(&r.annotations),
            (Entity::Resource(r), _) => return r.specification.path(path).clone(),
            (Entity::Label(kv), "key") => Record::from(kv.key.as_str()),
            (Entity::Label(kv), "value") => Record::from(kv.value.as_str()),
            (Entity::Namespace(k), "name" | "key")
            | (Entity::Application(k) | Entity::ContainerImage(k) | Entity::Host(k), "key") => {
                Record::from(k.as_str())
            }
            _ => Record::Absent,
        };
        field.path(rest).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Record {
        Record::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap())
    }

    #[test]
    fn missing_kind_is_a_validation_error() {
        let err = Resource::from_record(doc("metadata:\n  name: orphan\n")).unwrap_err();
        assert!(matches!(err, ExplorerError::Validation(_)));
        assert!(err.to_string().contains("orphan"));
    }

    #[test]
    fn resource_defaults() {
        let r = Resource::from_record(doc("kind: ConfigMap\nmetadata:\n  name: cfg\n")).unwrap();
        assert_eq!(r.id(), "ConfigMap:cfg");
        assert_eq!(r.namespace, DEFAULT_NAMESPACE);
        assert!(r.declared_namespace().is_none());
        assert!(r.labels.is_empty());
        assert!(r.annotations.is_empty());
        assert!(r.api_version.is_none());
    }

    #[test]
    fn arbitrary_kinds_are_accepted() {
        let r = Resource::from_record(doc("kind: FancyCrd\nmetadata:\n  name: x\n")).unwrap();
        assert_eq!(Entity::Resource(r).kind(), "FancyCrd");
    }

    #[test]
    fn pods_use_template_metadata_and_parent_namespace() {
        let r = Resource::from_record(doc(r#"
kind: Deployment
metadata:
  name: web
  namespace: shop
  labels: {owner: team-a}
spec:
  replicas: 2
  template:
    metadata:
      labels: {app: web}
    spec:
      containers: [{image: nginx}]
"#))
        .unwrap();
        let pods = r.synthesize_pods();
        assert_eq!(pods.len(), 2);
        assert_eq!(pods[0].id(), "Pod:web-1");
        assert_eq!(pods[1].id(), "Pod:web-2");
        assert_eq!(pods[0].labels, vec![("app".to_string(), "web".to_string())]);
        assert_eq!(pods[0].declared_namespace(), Some("shop"));
        assert_eq!(pods[0].spec().path(&["containers", "0", "image"]).as_str(), Some("nginx"));
    }

    #[test]
    fn template_without_replicas_yields_one_pod() {
        let r = Resource::from_record(doc(
            "kind: Job\nmetadata: {name: once}\nspec:\n  template:\n    spec: {}\n",
        ))
        .unwrap();
        let pods = r.synthesize_pods();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "once-1");
    }

    #[test]
    fn scalar_template_yields_no_pods() {
        let r = Resource::from_record(doc(
            "kind: Deployment\nmetadata: {name: d}\nspec:\n  replicas: 3\n  template: oops\n",
        ))
        .unwrap();
        assert!(r.synthesize_pods().is_empty());
    }

    #[test]
    fn identities_per_entity_class() {
        assert_eq!(Entity::label("app", "web").id(), "Label:app:web");
        assert_eq!(Entity::Namespace("shop".into()).id(), "Namespace:shop");
        assert_eq!(Entity::ContainerImage("nginx:1.25".into()).id(), "ContainerImage:nginx:1.25");
        assert_eq!(Entity::Host("api.example.com".into()).id(), "Host:api.example.com");
        assert_eq!(Entity::Application("shop".into()).id(), "Application:shop");
    }

    #[test]
    fn attribute_paths() {
        let r = Resource::from_record(doc(
            "kind: Service\nmetadata:\n  name: svc\n  labels: {tier: web}\nspec:\n  ports: [{port: 80}]\n",
        ))
        .unwrap();
        let e = Entity::Resource(r);
        assert_eq!(e.attribute(&["name"]), Record::from("svc"));
        assert_eq!(e.attribute(&["labels", "tier"]), Record::from("web"));
        assert_eq!(e.attribute(&["spec", "ports", "0", "port"]), Record::Int(80));
        assert_eq!(e.attribute(&["metadata", "name"]), Record::from("svc"));
        assert!(e.attribute(&["nothing"]).is_absent());
        assert_eq!(Entity::label("a", "b").attribute(&["value"]), Record::from("b"));
        assert!(Entity::Host("h".into()).attribute(&["value"]).is_absent());
    }
}
