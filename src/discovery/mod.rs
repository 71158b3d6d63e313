//! Relation discovery.
//!
//! Once every manifest is in the graph, [`discover`] runs a fixed, ordered list of rules that
//! derive new nodes (labels, namespaces, applications, images, hosts) and the edges that
//! connect them to resources. Later rules read what earlier ones produced: `selectors` and
//! `applications` walk the `Label` nodes created by `labels`, so the order is part of the
//! contract.
//!
//! Rules never fail. A resource that lacks the fields a rule looks for simply contributes no
//! edges. Each rule collects its work from a read-only pass over the graph before mutating it.
use std::collections::HashSet;

use crate::graph::entity::{INGRESS_KIND, LABEL_KIND, POD_KIND, SERVICE_KIND};
use crate::graph::{Edge, Entity, Record, Relation, ResourceGraph};

/// Label key whose values name applications.
pub const APP_NAME_LABEL: &str = "app.kubernetes.io/name";

/// One inference pass over the graph.
pub trait DiscoveryRule {
    /// Name used to exclude the rule.
    fn name(&self) -> &'static str;
    /// Apply the rule and return the number of edges written.
    fn apply(&self, graph: &mut ResourceGraph) -> usize;
}

// Write queued edges, counting the ones whose endpoints exist
fn connect(graph: &mut ResourceGraph, edges: Vec<(String, String, Edge)>) -> usize {
    edges.into_iter().filter(|(s, t, e)| graph.add_edge(s, t, e.clone())).count()
}

/// `resource -in-> Namespace:<ns>` for every resource with a declared namespace.
pub struct NamespaceRule;

impl DiscoveryRule for NamespaceRule {
    fn name(&self) -> &'static str {
        "namespace"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let work: Vec<(String, String)> = graph
            .resources()
            .filter_map(|(node, r)| r.declared_namespace().map(|ns| (node.id.clone(), ns.to_string())))
            .collect();
        let mut edges = Vec::with_capacity(work.len());
        for (id, ns) in work {
            let ns_id = graph.add_entity(Entity::Namespace(ns));
            edges.push((id, ns_id, Edge::new(Relation::In)));
        }
        connect(graph, edges)
    }
}

/// `Label:<k>:<v> -labels-> resource` for every label pair.
pub struct LabelsRule;

impl DiscoveryRule for LabelsRule {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let work: Vec<(String, Vec<(String, String)>)> = graph
            .resources()
            .filter(|(_, r)| !r.labels.is_empty())
            .map(|(node, r)| (node.id.clone(), r.labels.clone()))
            .collect();
        let mut edges = Vec::new();
        for (id, labels) in work {
            for (k, v) in labels {
                let label = graph.add_entity(Entity::label(&k, &v));
                edges.push((label, id.clone(), Edge::new(Relation::Labels)));
            }
        }
        connect(graph, edges)
    }
}

/// `Label:<k>:<v> -annotates-> resource` for every annotation pair. Annotation pairs share
/// the label nodes, so selectors and applications see them too.
pub struct AnnotationsRule;

impl DiscoveryRule for AnnotationsRule {
    fn name(&self) -> &'static str {
        "annotations"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let work: Vec<(String, Vec<(String, String)>)> = graph
            .resources()
            .filter(|(_, r)| !r.annotations.is_empty())
            .map(|(node, r)| (node.id.clone(), r.annotations.clone()))
            .collect();
        let mut edges = Vec::new();
        for (id, annotations) in work {
            for (k, v) in annotations {
                let label = graph.add_entity(Entity::label(&k, &v));
                edges.push((label, id.clone(), Edge::new(Relation::Annotates)));
            }
        }
        connect(graph, edges)
    }
}

/// `resource -selects-> Pod` for every Pod carrying all labels of the resource's selector.
pub struct SelectorsRule;

impl SelectorsRule {
    /// Selector entries: `matchLabels` when present, otherwise the selector map itself.
    fn selector_pairs(selector: &Record) -> Vec<(String, String)> {
        match selector.get("matchLabels") {
            m if m.as_map().is_some() => m.string_pairs(),
            _ => selector.string_pairs(),
        }
    }

    /// Pods labeled by every pair, in the order the first label reaches them.
    #[must_use]
    pub fn matching_pods(graph: &ResourceGraph, pairs: &[(String, String)]) -> Vec<String> {
        let mut sets = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            let label_id = Entity::label(k, v).id();
            if !graph.contains(&label_id) {
                return Vec::new();
            }
            let pods: Vec<String> = graph
                .successors(&label_id)
                .into_iter()
                .filter(|(n, _)| n.kind == POD_KIND)
                .map(|(n, _)| n.id.clone())
                .collect();
            sets.push(pods);
        }
        let Some((first, rest)) = sets.split_first() else {
            return Vec::new();
        };
        let rest: Vec<HashSet<&String>> = rest.iter().map(|s| s.iter().collect()).collect();
        first.iter().filter(|pod| rest.iter().all(|s| s.contains(pod))).cloned().collect()
    }
}

impl DiscoveryRule for SelectorsRule {
    fn name(&self) -> &'static str {
        "selectors"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let mut edges = Vec::new();
        for (node, r) in graph.resources() {
            let selector = r.spec().get("selector");
            if !selector.is_present() {
                continue;
            }
            let pairs = Self::selector_pairs(selector);
            for pod in Self::matching_pods(graph, &pairs) {
                edges.push((node.id.clone(), pod, Edge::new(Relation::Selects)));
            }
        }
        connect(graph, edges)
    }
}

/// `Application:<v> -contains-> x` for every `x` labeled `app.kubernetes.io/name=<v>`.
pub struct ApplicationsRule;

impl DiscoveryRule for ApplicationsRule {
    fn name(&self) -> &'static str {
        "applications"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let work: Vec<(String, Vec<String>)> = graph
            .nodes_of_kind(LABEL_KIND)
            .filter_map(|n| n.entity.as_key_value().filter(|kv| kv.key == APP_NAME_LABEL).map(|kv| (n, kv)))
            .map(|(n, kv)| {
                let targets = graph.successors(&n.id).into_iter().map(|(t, _)| t.id.clone()).collect();
                (kv.value.clone(), targets)
            })
            .collect();
        let mut edges = Vec::new();
        for (app, targets) in work {
            let app_id = graph.add_entity(Entity::Application(app));
            edges.extend(targets.into_iter().map(|t| (app_id.clone(), t, Edge::new(Relation::Contains))));
        }
        connect(graph, edges)
    }
}

/// `Pod -runs-> ContainerImage:<image>` for every container, with named ports.
pub struct ContainerImagesRule;

impl ContainerImagesRule {
    fn ports(container: &Record) -> Record {
        let mut ports = Record::Absent;
        for port in container.get("ports").as_seq().unwrap_or_default() {
            let (Some(name), number) = (port.get("name").scalar_string(), port.get("containerPort")) else {
                continue;
            };
            if number.is_present() {
                ports.insert(&name, number.clone());
            }
        }
        ports
    }
}

impl DiscoveryRule for ContainerImagesRule {
    fn name(&self) -> &'static str {
        "containerimages"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let mut work: Vec<(String, String, Record)> = Vec::new();
        for (node, r) in graph.resources().filter(|(n, _)| n.kind == POD_KIND) {
            for container in r.spec().get("containers").as_seq().unwrap_or_default() {
                if let Some(image) = container.get("image").as_str().filter(|i| !i.is_empty()) {
                    work.push((node.id.clone(), image.to_string(), Self::ports(container)));
                }
            }
        }
        let mut edges = Vec::with_capacity(work.len());
        for (pod, image, ports) in work {
            let image_id = graph.add_entity(Entity::ContainerImage(image));
            let mut edge = Edge::new(Relation::Runs);
            if ports.is_present() {
                edge = edge.with_attribute("ports", ports);
            }
            edges.push((pod, image_id, edge));
        }
        connect(graph, edges)
    }
}

/// `Ingress -hosts-> Host:<host>` per rule host, and `Service -serves-> Ingress` per backend
/// naming a known Service.
pub struct IngressBackendsRule;

impl IngressBackendsRule {
    fn backend_service(backend: &Record) -> Option<&str> {
        backend
            .path(&["service", "name"])
            .as_str()
            .or_else(|| backend.get("serviceName").as_str())
            .filter(|s| !s.is_empty())
    }
}

impl DiscoveryRule for IngressBackendsRule {
    fn name(&self) -> &'static str {
        "ingressbackends"
    }

    fn apply(&self, graph: &mut ResourceGraph) -> usize {
        let mut hosts: Vec<(String, String)> = Vec::new();
        let mut edges = Vec::new();
        for (node, r) in graph.resources().filter(|(n, _)| n.kind == INGRESS_KIND) {
            let spec = r.spec();
            // Default backend first so an explicit path to the same Service takes precedence
            let default_backend = match spec.get("defaultBackend") {
                b if b.is_present() => b,
                _ => spec.get("backend"),
            };
            if let Some(service) = Self::backend_service(default_backend) {
                let service_id = format!("{SERVICE_KIND}:{service}");
                if graph.contains(&service_id) {
                    edges.push((service_id, node.id.clone(), Edge::new(Relation::Serves)));
                }
            }
            for rule in spec.get("rules").as_seq().unwrap_or_default() {
                if let Some(host) = rule.get("host").as_str().filter(|h| !h.is_empty()) {
                    hosts.push((node.id.clone(), host.to_string()));
                }
                for path in rule.path(&["http", "paths"]).as_seq().unwrap_or_default() {
                    let Some(service) = Self::backend_service(path.get("backend")) else {
                        continue;
                    };
                    let service_id = format!("{SERVICE_KIND}:{service}");
                    if !graph.contains(&service_id) {
                        tracing::debug!(ingress = %node.id, service = service, "unresolved ingress backend");
                        continue;
                    }
                    let mut edge = Edge::new(Relation::Serves);
                    if let Some(p) = path.get("path").as_str() {
                        edge = edge.with_attribute("path", Record::from(p));
                    }
                    edges.push((service_id, node.id.clone(), edge));
                }
            }
        }
        let mut host_edges = Vec::with_capacity(hosts.len());
        for (ingress, host) in hosts {
            let host_id = graph.add_entity(Entity::Host(host));
            host_edges.push((ingress, host_id, Edge::new(Relation::Hosts)));
        }
        connect(graph, host_edges) + connect(graph, edges)
    }
}

/// The canonical rule list, in application order.
#[must_use]
pub fn default_rules() -> Vec<Box<dyn DiscoveryRule>> {
    vec![
        Box::new(NamespaceRule),
        Box::new(LabelsRule),
        Box::new(AnnotationsRule),
        Box::new(SelectorsRule),
        Box::new(ApplicationsRule),
        Box::new(ContainerImagesRule),
        Box::new(IngressBackendsRule),
    ]
}

/// Names of the canonical rules, in order.
#[must_use]
pub fn rule_names() -> Vec<&'static str> {
    default_rules().iter().map(|r| r.name()).collect()
}

/// Per-rule outcome of a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub applied: Vec<(&'static str, usize)>,
    pub skipped: Vec<&'static str>,
}

impl DiscoverySummary {
    #[must_use]
    pub fn edges_added(&self) -> usize {
        self.applied.iter().map(|(_, n)| n).sum()
    }
}

/// Run every canonical rule not named in `excluded`. Unknown names are ignored.
///
/// Must run once, after all manifests are in the graph.
pub fn discover<S: AsRef<str>>(graph: &mut ResourceGraph, excluded: &[S]) -> DiscoverySummary {
    let mut summary = DiscoverySummary::default();
    for rule in default_rules() {
        if excluded.iter().any(|e| e.as_ref() == rule.name()) {
            tracing::debug!(rule = rule.name(), "relation rule excluded");
            summary.skipped.push(rule.name());
            continue;
        }
        let added = rule.apply(graph);
        tracing::debug!(rule = rule.name(), edges = added, "applied relation rule");
        summary.applied.push((rule.name(), added));
    }
    tracing::info!(
        edges = summary.edges_added(),
        nodes = graph.node_count(),
        "relation discovery finished"
    );
    summary
}
