//! Graph model and builder for the crate.
//!
//! This module defines the entity graph (`ResourceGraph`, `Node`, `Edge`, `Relation`) and the
//! entry points that populate it from manifests. Nodes are keyed by a deterministic string
//! identity (see [`Entity::id`]); a node is inserted at most once and the first write wins.
//!
//! You typically construct a graph via `ResourceGraph::build_from_directory*`, run
//! [`crate::discovery::discover`] once, and then pass it to queries in `crate::query`.
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::errors::{ExplorerError, LoadError};
use crate::parser::ManifestParser;

pub mod entity;
pub mod record;

pub use entity::{Entity, KeyValue, Resource};
pub use record::Record;

/// Relation label carried by every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    In,
    Labels,
    Annotates,
    Selects,
    Contains,
    Runs,
    Hosts,
    Serves,
}

impl Relation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::In => "in",
            Relation::Labels => "labels",
            Relation::Annotates => "annotates",
            Relation::Selects => "selects",
            Relation::Contains => "contains",
            Relation::Runs => "runs",
            Relation::Hosts => "hosts",
            Relation::Serves => "serves",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub kind: String,
    pub entity: Entity,
}

impl Node {
    /// Attribute lookup for query filters: `id` and `kind` first, then the entity.
    #[must_use]
    pub fn attribute<S: AsRef<str>>(&self, path: &[S]) -> Record {
        match path {
            [single] if single.as_ref() == "id" => Record::from(self.id.as_str()),
            [single] if single.as_ref() == "kind" => Record::from(self.kind.as_str()),
            _ => self.entity.attribute(path),
        }
    }

    #[must_use]
    pub fn resource(&self) -> Option<&Resource> {
        self.entity.as_resource()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub relation: Relation,
    /// `Record::Absent` when the edge carries no attributes, otherwise a map.
    #[serde(skip_serializing_if = "Record::is_absent")]
    pub attributes: Record,
}

impl Edge {
    #[must_use]
    pub fn new(relation: Relation) -> Self {
        Self { relation, attributes: Record::Absent }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: Record) -> Self {
        self.attributes.insert(key, value);
        self
    }

    #[must_use]
    pub fn attribute<S: AsRef<str>>(&self, path: &[S]) -> Record {
        match path {
            [single] if single.as_ref() == "relation" => Record::from(self.relation.as_str()),
            _ => self.attributes.path(path).clone(),
        }
    }
}

/// Directed entity graph. Iteration follows insertion order for nodes and edges.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: DiGraph<Node, Edge>,
    index: HashMap<String, NodeIndex>,
}

/// Serializable view used for JSON export.
#[derive(Debug, Serialize)]
pub struct GraphSnapshot<'a> {
    pub nodes: Vec<&'a Node>,
    pub edges: Vec<EdgeSnapshot<'a>>,
}

#[derive(Debug, Serialize)]
pub struct EdgeSnapshot<'a> {
    pub source: &'a str,
    pub target: &'a str,
    #[serde(flatten)]
    pub edge: &'a Edge,
}

impl ResourceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from already parsed manifest documents.
    ///
    /// # Errors
    /// Returns `ExplorerError::Validation` for the first document without a `kind`.
    pub fn from_manifests<I: IntoIterator<Item = Record>>(documents: I) -> Result<Self, ExplorerError> {
        let mut graph = Self::new();
        for document in documents {
            graph.add_manifest(document)?;
        }
        Ok(graph)
    }

    /// Build a graph from every `*.yaml`/`*.yml` file under `path`, honoring ignore rules.
    ///
    /// # Errors
    /// Returns `LoadError` when no manifest is found or a file cannot be read or parsed, and
    /// `ExplorerError::Validation` when a document has no `kind`.
    pub fn build_from_directory(path: &Path) -> Result<Self, ExplorerError> {
        Self::build_from_directory_opts(path, false)
    }

    /// Like [`ResourceGraph::build_from_directory`], with an explicit ignore-rule bypass.
    ///
    /// # Errors
    /// See [`ResourceGraph::build_from_directory`].
    pub fn build_from_directory_opts(path: &Path, no_ignore: bool) -> Result<Self, ExplorerError> {
        let documents = ManifestParser::new().load_directory(path, no_ignore)?;
        if documents.is_empty() {
            return Err(LoadError::NoManifests { path: path.to_path_buf() }.into());
        }
        let graph = Self::from_manifests(documents)?;
        tracing::info!(
            path = %path.display(),
            nodes = graph.node_count(),
            "built resource graph"
        );
        Ok(graph)
    }

    /// Add one parsed manifest (and the pods its template describes).
    ///
    /// # Errors
    /// Returns `ExplorerError::Validation` when the document has no `kind`.
    pub fn add_manifest(&mut self, document: Record) -> Result<String, ExplorerError> {
        let resource = Resource::from_record(document)?;
        Ok(self.add_resource(resource))
    }

    /// Parse a raw YAML string (one or more documents) and add every manifest in it.
    ///
    /// # Errors
    /// Returns `LoadError::Parse` for invalid YAML and `ExplorerError::Validation` for a
    /// document without `kind`.
    pub fn add_manifest_str(&mut self, raw: &str) -> Result<Vec<String>, ExplorerError> {
        let documents = ManifestParser::new().parse_str(raw, Path::new("<memory>"))?;
        documents.into_iter().map(|d| self.add_manifest(d)).collect()
    }

    /// Insert a resource. Pods synthesized from its template go in first.
    pub fn add_resource(&mut self, resource: Resource) -> String {
        for pod in resource.synthesize_pods() {
            self.add_entity(Entity::Resource(pod));
        }
        self.add_entity(Entity::Resource(resource))
    }

    /// Insert an entity unless its identity is already known. Returns the identity.
    pub fn add_entity(&mut self, entity: Entity) -> String {
        let id = entity.id();
        if !self.index.contains_key(&id) {
            let kind = entity.kind().to_string();
            let ix = self.graph.add_node(Node { id: id.clone(), kind, entity });
            self.index.insert(id.clone(), ix);
        }
        id
    }

    /// Connect two known nodes. A second edge between the same ordered pair replaces the
    /// first one's data. Returns false when either endpoint is unknown.
    pub fn add_edge(&mut self, source: &str, target: &str, edge: Edge) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => {
                self.graph.update_edge(s, t, edge);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&ix| &self.graph[ix])
    }

    /// Read accessor for a node that must exist.
    ///
    /// # Errors
    /// Returns `ExplorerError::Lookup` for unknown identities.
    pub fn node(&self, id: &str) -> Result<&Node, ExplorerError> {
        self.get(id).ok_or_else(|| ExplorerError::lookup("node", id))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    pub fn nodes_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes().filter(move |n| n.kind == kind)
    }

    /// Resource nodes together with their resource data.
    pub fn resources(&self) -> impl Iterator<Item = (&Node, &Resource)> + '_ {
        self.nodes().filter_map(|n| n.resource().map(|r| (n, r)))
    }

    /// All edges as `(source, target, edge)`, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, &Edge)> + '_ {
        self.graph
            .edge_references()
            .map(move |e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    /// Out-neighbors of `id` with the connecting edge, in edge insertion order.
    #[must_use]
    pub fn successors(&self, id: &str) -> Vec<(&Node, &Edge)> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// In-neighbors of `id` with the connecting edge, in edge insertion order.
    #[must_use]
    pub fn predecessors(&self, id: &str) -> Vec<(&Node, &Edge)> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<(&Node, &Edge)> {
        let Some(&ix) = self.index.get(id) else {
            return Vec::new();
        };
        // petgraph walks adjacency lists newest-first
        let mut edges: Vec<(EdgeIndex, NodeIndex)> = self
            .graph
            .edges_directed(ix, dir)
            .map(|e| (e.id(), if dir == Direction::Outgoing { e.target() } else { e.source() }))
            .collect();
        edges.sort_by_key(|(e, _)| *e);
        edges.into_iter().map(|(e, n)| (&self.graph[n], &self.graph[e])).collect()
    }

    /// Subgraph made of the given nodes, their direct predecessors and successors, and every
    /// edge among those nodes.
    ///
    /// # Errors
    /// Returns `ExplorerError::Lookup` when one of the identities is not in the graph.
    pub fn neighborhood_subgraph<S: AsRef<str>>(&self, ids: &[S]) -> Result<Self, ExplorerError> {
        let mut keep: HashSet<NodeIndex> = HashSet::new();
        for id in ids {
            let id = id.as_ref();
            let ix = *self.index.get(id).ok_or_else(|| ExplorerError::lookup("node", id))?;
            keep.insert(ix);
            keep.extend(self.graph.neighbors_directed(ix, Direction::Outgoing));
            keep.extend(self.graph.neighbors_directed(ix, Direction::Incoming));
        }
        Ok(self.induced(&keep))
    }

    /// Copy of the graph without nodes of the given kinds (and their edges).
    #[must_use]
    pub fn without_kinds<S: AsRef<str>>(&self, kinds: &[S]) -> Self {
        let keep: HashSet<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&ix| !kinds.iter().any(|k| k.as_ref() == self.graph[ix].kind))
            .collect();
        self.induced(&keep)
    }

    // Induced subgraph preserving node and edge insertion order
    fn induced(&self, keep: &HashSet<NodeIndex>) -> Self {
        let mut out = Self::new();
        let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(keep.len());
        for ix in self.graph.node_indices().filter(|ix| keep.contains(ix)) {
            let node = self.graph[ix].clone();
            let new_ix = out.graph.add_node(node);
            out.index.insert(out.graph[new_ix].id.clone(), new_ix);
            remap.insert(ix, new_ix);
        }
        for e in self.graph.edge_references() {
            if let (Some(&s), Some(&t)) = (remap.get(&e.source()), remap.get(&e.target())) {
                out.graph.add_edge(s, t, e.weight().clone());
            }
        }
        out
    }

    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot {
            nodes: self.nodes().collect(),
            edges: self
                .edges()
                .map(|(s, t, edge)| EdgeSnapshot { source: &s.id, target: &t.id, edge })
                .collect(),
        }
    }

    /// Export the graph as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ExplorerError::Io` if serialization or writing the file fails.
    pub fn save_json(&self, path: &Path) -> Result<(), ExplorerError> {
        let data = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| ExplorerError::Io(std::io::Error::other(e.to_string())))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
