//! Declarative queries over a finished graph.
//!
//! A query descriptor is a small JSON document:
//!
//! ```json
//! {"func": "search_direct_relationships",
//!  "args": ["service"],
//!  "params": {"source": {"and": [{"eq": ["kind", "Service"]}, {"eq": ["name", "<service>"]}]},
//!             "edge": {"eq": ["relation", "selects"]},
//!             "target": {"eq": ["kind", "Pod"]}},
//!  "flatten": 2}
//! ```
//!
//! Execution binds arguments into `"<name>"` placeholders, resolves `source`/`target`
//! subqueries into a scoping subgraph, evaluates the predicate and optionally projects each
//! result tuple to one field.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use crate::errors::ExplorerError;
use crate::graph::ResourceGraph;

pub mod filter;
pub mod library;

pub use filter::{Attributes, Condition, Filter};
pub use library::QueryLibrary;

/// Query trait implemented by all query types.
///
/// Given an immutable reference to a `ResourceGraph`, returns a result of type `R`.
pub trait Query<R> {
    fn run(&self, graph: &ResourceGraph) -> R;
}

/// Values bound to placeholder names.
pub type Arguments = BTreeMap<String, Value>;

/// The closed set of graph predicates a descriptor can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Nodes matching `query`. Rows are node identities.
    SearchNodes,
    /// Edges matching `query` whose endpoints match `source`/`target`. Rows are
    /// `[source, target]`.
    SearchEdges,
    /// `source -edge-> target` patterns. Rows are `[source, relation, target]`.
    SearchDirectRelationships,
}

impl Predicate {
    fn allowed_params(self) -> &'static [&'static str] {
        match self {
            Predicate::SearchNodes => &["query", "source"],
            Predicate::SearchEdges => &["query", "source", "target"],
            Predicate::SearchDirectRelationships => &["source", "edge", "target"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryDescriptor {
    pub func: Predicate,
    /// Declared argument names. When present, callers must bind exactly these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub params: Value,
    /// Project each row to this tuple index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten: Option<usize>,
    /// Drop repeated rows, keeping the first occurrence.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub distinct: bool,
}

impl QueryDescriptor {
    /// Parse a descriptor from JSON text; `name` is only used in the error message.
    ///
    /// # Errors
    /// Returns `ExplorerError::QueryShape` for malformed descriptors or unknown predicates.
    pub fn from_json(name: &str, text: &str) -> Result<Self, ExplorerError> {
        serde_json::from_str(text)
            .map_err(|e| ExplorerError::QueryShape(format!("invalid query descriptor `{name}`: {e}")))
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Row {
    Node(String),
    Tuple(Vec<String>),
}

impl Row {
    #[must_use]
    pub fn as_node(&self) -> Option<&str> {
        match self {
            Row::Node(id) => Some(id),
            Row::Tuple(_) => None,
        }
    }

    /// Row fields as strings; a node row has one field.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        match self {
            Row::Node(id) => vec![id.clone()],
            Row::Tuple(items) => items.clone(),
        }
    }

    fn project(self, index: usize) -> Option<Row> {
        match self {
            Row::Node(id) if index == 0 => Some(Row::Node(id)),
            Row::Node(_) => None,
            Row::Tuple(mut items) => (index < items.len()).then(|| Row::Node(items.swap_remove(index))),
        }
    }
}

/// Check the supplied argument names against the declared ones.
///
/// # Errors
/// Returns `ExplorerError::Argument` listing missing and unexpected names.
pub fn bind_arguments(query: &str, declared: Option<&[String]>, supplied: &Arguments) -> Result<(), ExplorerError> {
    let Some(declared) = declared else {
        return Ok(());
    };
    let missing: Vec<String> = declared.iter().filter(|d| !supplied.contains_key(*d)).cloned().collect();
    let unexpected: Vec<String> =
        supplied.keys().filter(|k| !declared.contains(k)).cloned().collect();
    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(ExplorerError::Argument { query: query.to_string(), missing, unexpected })
    }
}

/// Replace every string equal to `"<name>"` with the value bound to `name`, recursively.
#[must_use]
pub fn substitute_placeholders(value: &Value, args: &Arguments) -> Value {
    match value {
        Value::String(s) => s
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .and_then(|name| args.get(name))
            .cloned()
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_placeholders(v, args)).collect()),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), substitute_placeholders(v, args))).collect::<Map<_, _>>(),
        ),
        other => other.clone(),
    }
}

/// A node endpoint: a plain filter, or a subquery scoping the graph plus an optional filter.
enum Endpoint {
    Filter(Filter),
    Subquery { descriptor: QueryDescriptor, filter: Filter },
}

impl Endpoint {
    fn parse(query: &str, key: &str, value: &Value) -> Result<Self, ExplorerError> {
        let shape = |e: &dyn std::fmt::Display| ExplorerError::QueryShape(format!("query `{query}`: `{key}`: {e}"));
        match value {
            Value::Object(map) if map.contains_key("query") => {
                if let Some(extra) = map.keys().find(|k| *k != "query" && *k != "filter") {
                    return Err(shape(&format!("unknown subquery key `{extra}`")));
                }
                let descriptor = QueryDescriptor::deserialize(&map["query"]).map_err(|e| shape(&e))?;
                let filter = match map.get("filter") {
                    Some(f) => Filter::from_json(f).map_err(|e| shape(&e))?,
                    None => Filter::all(),
                };
                Ok(Endpoint::Subquery { descriptor, filter })
            }
            other => Filter::from_json(other).map(Endpoint::Filter).map_err(|e| shape(&e)),
        }
    }

    fn filter(&self) -> &Filter {
        match self {
            Endpoint::Filter(f) | Endpoint::Subquery { filter: f, .. } => f,
        }
    }
}

/// Run a descriptor against `graph`.
///
/// # Errors
/// Returns `ExplorerError::Argument` on an argument mismatch and `ExplorerError::QueryShape`
/// for malformed parameters, non-node subquery results or a bad `flatten` index.
pub fn execute(graph: &ResourceGraph, descriptor: &QueryDescriptor, args: &Arguments) -> Result<Vec<Row>, ExplorerError> {
    execute_named(graph, "<inline>", descriptor, args)
}

fn execute_named(
    graph: &ResourceGraph,
    name: &str,
    descriptor: &QueryDescriptor,
    args: &Arguments,
) -> Result<Vec<Row>, ExplorerError> {
    bind_arguments(name, descriptor.args.as_deref(), args)?;
    let params = substitute_placeholders(&descriptor.params, args);
    let params = match params {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => return Err(ExplorerError::QueryShape(format!("query `{name}`: `params` must be an object"))),
    };
    let allowed = descriptor.func.allowed_params();
    if let Some(key) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ExplorerError::QueryShape(format!(
            "query `{name}`: unknown parameter `{key}` for {:?}",
            descriptor.func
        )));
    }

    let endpoint = |key: &str| -> Result<Endpoint, ExplorerError> {
        params.get(key).map_or(Ok(Endpoint::Filter(Filter::all())), |v| Endpoint::parse(name, key, v))
    };
    let plain = |key: &str| -> Result<Filter, ExplorerError> {
        params.get(key).map_or(Ok(Filter::all()), |v| {
            Filter::from_json(v).map_err(|e| ExplorerError::QueryShape(format!("query `{name}`: `{key}`: {e}")))
        })
    };
    let source = endpoint("source")?;
    let target = endpoint("target")?;
    let query = plain("query")?;
    let edge = plain("edge")?;

    // Subqueries scope the graph to the neighborhood of what they return
    let mut scope_ids: Vec<String> = Vec::new();
    let mut scoped = false;
    for ep in [&source, &target] {
        if let Endpoint::Subquery { descriptor: nested, .. } = ep {
            scoped = true;
            for row in execute_named(graph, name, nested, args)? {
                match row {
                    Row::Node(id) => scope_ids.push(id),
                    Row::Tuple(_) => {
                        return Err(ExplorerError::QueryShape(format!(
                            "query `{name}`: subquery must return node identities, got tuples"
                        )))
                    }
                }
            }
        }
    }
    let scope: Cow<'_, ResourceGraph> = if scoped {
        Cow::Owned(graph.neighborhood_subgraph(&scope_ids)?)
    } else {
        Cow::Borrowed(graph)
    };

    let rows: Vec<Row> = match descriptor.func {
        Predicate::SearchNodes => scope
            .nodes()
            .filter(|n| query.matches(*n) && source.filter().matches(*n))
            .map(|n| Row::Node(n.id.clone()))
            .collect(),
        Predicate::SearchEdges => scope
            .edges()
            .filter(|(s, t, e)| query.matches(*e) && source.filter().matches(*s) && target.filter().matches(*t))
            .map(|(s, t, _)| Row::Tuple(vec![s.id.clone(), t.id.clone()]))
            .collect(),
        Predicate::SearchDirectRelationships => scope
            .edges()
            .filter(|(s, t, e)| source.filter().matches(*s) && edge.matches(*e) && target.filter().matches(*t))
            .map(|(s, t, e)| Row::Tuple(vec![s.id.clone(), e.relation.to_string(), t.id.clone()]))
            .collect(),
    };

    let mut rows = match descriptor.flatten {
        Some(index) => rows
            .into_iter()
            .map(|r| {
                r.project(index).ok_or_else(|| {
                    ExplorerError::QueryShape(format!("query `{name}`: flatten index {index} out of range"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => rows,
    };
    if descriptor.distinct {
        let mut seen = HashSet::new();
        rows.retain(|r| seen.insert(r.clone()));
    }
    tracing::debug!(query = name, rows = rows.len(), scoped, "query executed");
    Ok(rows)
}

/// A library query by name, with its bound arguments.
pub struct NamedQuery<'a> {
    library: &'a QueryLibrary,
    name: String,
    args: Arguments,
}

impl<'a> NamedQuery<'a> {
    #[must_use]
    pub fn new(library: &'a QueryLibrary, name: &str) -> Self {
        Self { library, name: name.to_string(), args: Arguments::new() }
    }

    #[must_use]
    pub fn with_args(mut self, args: Arguments) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }
}

impl Query<Result<Vec<Row>, ExplorerError>> for NamedQuery<'_> {
    fn run(&self, graph: &ResourceGraph) -> Result<Vec<Row>, ExplorerError> {
        let descriptor = self.library.load(&self.name)?;
        execute_named(graph, &self.name, &descriptor, &self.args)
    }
}

/// Node identities of a result, failing on tuple rows.
///
/// # Errors
/// Returns `ExplorerError::QueryShape` when a row is a tuple.
pub fn node_ids(rows: Vec<Row>) -> Result<Vec<String>, ExplorerError> {
    rows.into_iter()
        .map(|r| match r {
            Row::Node(id) => Ok(id),
            Row::Tuple(t) => Err(ExplorerError::QueryShape(format!("expected node identities, got {t:?}"))),
        })
        .collect()
}
