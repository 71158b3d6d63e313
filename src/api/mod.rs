//! Inspection functions over a finished graph.
//!
//! These are the questions the CLI `run` command answers: which applications, images,
//! services, config maps, secrets, ingresses and hosts exist and what they connect to, plus
//! the CPU/memory request totals from [`aggregate`]. Every function has a flat form (just the
//! names) and a grouped form (each entity with its related nodes).
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::errors::ExplorerError;
use crate::graph::entity::{
    APPLICATION_KIND, CONTAINER_IMAGE_KIND, HOST_KIND, INGRESS_KIND, POD_KIND, SERVICE_KIND,
};
use crate::graph::{Node, ResourceGraph};
use crate::query::QueryLibrary;
use crate::utils::units::MemoryUnit;

pub mod aggregate;

pub use aggregate::{sum_cpu_requests, sum_memory_requests};

/// An entity and the nodes related to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
}

/// A Service routed to by an ingress, with the Pods it selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceBackend {
    pub service: String,
    pub pods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRoute {
    pub ingress: String,
    pub services: Vec<ServiceBackend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    Flat(Vec<String>),
    Grouped(Vec<Group>),
    Routes(Vec<IngressRoute>),
}

impl Listing {
    /// Table rows: one cell per flat entry, `[name, members]` per group.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        match self {
            Listing::Flat(items) => items.iter().map(|i| vec![i.clone()]).collect(),
            Listing::Grouped(groups) => {
                groups.iter().map(|g| vec![g.name.clone(), g.members.join(", ")]).collect()
            }
            Listing::Routes(routes) => routes
                .iter()
                .flat_map(|r| {
                    if r.services.is_empty() {
                        return vec![vec![r.ingress.clone(), String::new(), String::new()]];
                    }
                    r.services
                        .iter()
                        .map(|s| vec![r.ingress.clone(), s.service.clone(), s.pods.join(", ")])
                        .collect()
                })
                .collect(),
        }
    }
}

fn ids(nodes: Vec<(&Node, &crate::graph::Edge)>, kind: Option<&str>) -> Vec<String> {
    nodes
        .into_iter()
        .filter(|(n, _)| kind.map_or(true, |k| n.kind == k))
        .map(|(n, _)| n.id.clone())
        .collect()
}

fn key_of(node: &Node) -> String {
    node.entity.key().map_or_else(|| node.id.clone(), str::to_string)
}

/// Applications, each with the resources it contains.
#[must_use]
pub fn list_applications(graph: &ResourceGraph, flat: bool) -> Listing {
    let apps = graph.nodes_of_kind(APPLICATION_KIND);
    if flat {
        return Listing::Flat(apps.map(key_of).collect());
    }
    Listing::Grouped(
        apps.map(|n| Group { name: key_of(n), members: ids(graph.successors(&n.id), None) }).collect(),
    )
}

/// Container images, each with the Pods running it.
#[must_use]
pub fn list_container_images(graph: &ResourceGraph, flat: bool) -> Listing {
    let images = graph.nodes_of_kind(CONTAINER_IMAGE_KIND);
    if flat {
        return Listing::Flat(images.map(key_of).collect());
    }
    Listing::Grouped(
        images.map(|n| Group { name: key_of(n), members: ids(graph.predecessors(&n.id), None) }).collect(),
    )
}

/// Service names, or each Service identity with the Pods it selects.
#[must_use]
pub fn list_services(graph: &ResourceGraph, flat: bool) -> Listing {
    let services = graph.resources().filter(|(n, _)| n.kind == SERVICE_KIND);
    if flat {
        return Listing::Flat(services.map(|(_, r)| r.name.clone()).collect());
    }
    Listing::Grouped(
        services
            .map(|(n, _)| Group { name: n.id.clone(), members: ids(graph.successors(&n.id), Some(POD_KIND)) })
            .collect(),
    )
}

/// Pods selected by a Service, given by name or by identity (`Service:<name>`).
///
/// # Errors
/// Returns `ExplorerError::Lookup` when the Service is not in the graph.
pub fn service_pods(graph: &ResourceGraph, service: &str) -> Result<Vec<String>, ExplorerError> {
    let id = if service.starts_with("Service:") { service.to_string() } else { format!("{SERVICE_KIND}:{service}") };
    let node = graph.get(&id).ok_or_else(|| ExplorerError::lookup("service", service))?;
    Ok(ids(graph.successors(&node.id), Some(POD_KIND)))
}

// Resources of `kind` with the keys of their `data` section
fn with_data_keys(graph: &ResourceGraph, kind: &str, flat: bool) -> Listing {
    let nodes = graph.resources().filter(|(n, _)| n.kind == kind);
    if flat {
        return Listing::Flat(nodes.map(|(n, _)| n.id.clone()).collect());
    }
    Listing::Grouped(
        nodes
            .filter(|(_, r)| r.specification.get("data").is_present())
            .map(|(n, r)| Group { name: n.id.clone(), members: r.specification.get("data").keys() })
            .collect(),
    )
}

/// ConfigMaps, each with its data keys.
#[must_use]
pub fn list_configmaps(graph: &ResourceGraph, flat: bool) -> Listing {
    with_data_keys(graph, "ConfigMap", flat)
}

/// Secrets, each with its data keys.
#[must_use]
pub fn list_secrets(graph: &ResourceGraph, flat: bool) -> Listing {
    with_data_keys(graph, "Secret", flat)
}

/// Ingresses, each with the Services routed to it and the Pods behind them.
#[must_use]
pub fn list_ingresses(graph: &ResourceGraph, flat: bool) -> Listing {
    let ingresses = graph.nodes_of_kind(INGRESS_KIND);
    if flat {
        return Listing::Flat(ingresses.map(|n| n.id.clone()).collect());
    }
    Listing::Routes(
        ingresses
            .map(|n| IngressRoute {
                ingress: n.id.clone(),
                services: graph
                    .predecessors(&n.id)
                    .into_iter()
                    .filter(|(s, _)| s.kind == SERVICE_KIND)
                    .map(|(s, _)| ServiceBackend {
                        service: s.id.clone(),
                        pods: ids(graph.successors(&s.id), Some(POD_KIND)),
                    })
                    .collect(),
            })
            .collect(),
    )
}

/// Hosts served by ingresses: unique host identities, or each ingress with its hosts.
#[must_use]
pub fn list_hosts(graph: &ResourceGraph, flat: bool) -> Listing {
    let ingresses = graph.nodes_of_kind(INGRESS_KIND);
    if flat {
        let mut seen = HashSet::new();
        return Listing::Flat(
            ingresses
                .flat_map(|n| ids(graph.successors(&n.id), Some(HOST_KIND)))
                .filter(|h| seen.insert(h.clone()))
                .collect(),
        );
    }
    Listing::Grouped(
        ingresses
            .map(|n| Group { name: n.id.clone(), members: ids(graph.successors(&n.id), Some(HOST_KIND)) })
            .collect(),
    )
}

/// Defaults for aggregate functions, overridable per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDefaults {
    pub cpu: String,
    pub memory: String,
    pub unit: String,
}

impl Default for AggregateDefaults {
    fn default() -> Self {
        Self { cpu: "0".to_string(), memory: "0".to_string(), unit: MemoryUnit::default().to_string() }
    }
}

/// The named functions the CLI can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    ListApplications,
    ListContainerImages,
    ListServices,
    GetServicePods,
    ListConfigmaps,
    ListSecrets,
    ListIngress,
    ListHosts,
    SumCpuRequests,
    SumMemoryRequests,
}

impl Function {
    pub const ALL: [Function; 10] = [
        Function::ListApplications,
        Function::ListContainerImages,
        Function::ListServices,
        Function::GetServicePods,
        Function::ListConfigmaps,
        Function::ListSecrets,
        Function::ListIngress,
        Function::ListHosts,
        Function::SumCpuRequests,
        Function::SumMemoryRequests,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Function::ListApplications => "list_applications",
            Function::ListContainerImages => "list_containerimages",
            Function::ListServices => "list_services",
            Function::GetServicePods => "get_service_pods",
            Function::ListConfigmaps => "list_configmaps",
            Function::ListSecrets => "list_secrets",
            Function::ListIngress => "list_ingress",
            Function::ListHosts => "list_hosts",
            Function::SumCpuRequests => "sum_cpu_requests",
            Function::SumMemoryRequests => "sum_memory_requests",
        }
    }

    /// Argument names accepted by the function.
    #[must_use]
    pub fn accepted_args(self) -> &'static [&'static str] {
        match self {
            Function::GetServicePods => &["service"],
            Function::SumCpuRequests => &["default"],
            Function::SumMemoryRequests => &["default", "unit"],
            _ => &["flat"],
        }
    }

    /// Run the function.
    ///
    /// # Errors
    /// Returns `ExplorerError::Argument` for unknown or missing arguments,
    /// `ExplorerError::InvalidValue` for a malformed `flat`, and whatever the function itself
    /// reports.
    pub fn call(
        self,
        graph: &ResourceGraph,
        library: &QueryLibrary,
        args: &BTreeMap<String, String>,
        defaults: &AggregateDefaults,
    ) -> Result<FunctionOutput, ExplorerError> {
        let accepted = self.accepted_args();
        let unexpected: Vec<String> = args.keys().filter(|k| !accepted.contains(&k.as_str())).cloned().collect();
        let missing: Vec<String> = match self {
            Function::GetServicePods if !args.contains_key("service") => vec!["service".to_string()],
            _ => Vec::new(),
        };
        if !unexpected.is_empty() || !missing.is_empty() {
            return Err(ExplorerError::Argument { query: self.name().to_string(), missing, unexpected });
        }
        let flat = match args.get("flat").map(String::as_str) {
            None => false,
            Some("true" | "yes" | "1") => true,
            Some("false" | "no" | "0") => false,
            Some(other) => {
                return Err(ExplorerError::InvalidValue { name: "flat".to_string(), value: other.to_string() })
            }
        };
        let arg = |key: &str, fallback: &str| args.get(key).cloned().unwrap_or_else(|| fallback.to_string());

        Ok(match self {
            Function::ListApplications => FunctionOutput::Listing(list_applications(graph, flat)),
            Function::ListContainerImages => FunctionOutput::Listing(list_container_images(graph, flat)),
            Function::ListServices => FunctionOutput::Listing(list_services(graph, flat)),
            Function::GetServicePods => FunctionOutput::Nodes(service_pods(graph, &arg("service", ""))?),
            Function::ListConfigmaps => FunctionOutput::Listing(list_configmaps(graph, flat)),
            Function::ListSecrets => FunctionOutput::Listing(list_secrets(graph, flat)),
            Function::ListIngress => FunctionOutput::Listing(list_ingresses(graph, flat)),
            Function::ListHosts => FunctionOutput::Listing(list_hosts(graph, flat)),
            Function::SumCpuRequests => {
                FunctionOutput::Cpu(sum_cpu_requests(graph, library, &arg("default", &defaults.cpu))?)
            }
            Function::SumMemoryRequests => {
                let unit: MemoryUnit = arg("unit", &defaults.unit).parse()?;
                FunctionOutput::Memory(sum_memory_requests(graph, library, &arg("default", &defaults.memory), unit)?)
            }
        })
    }
}

impl FromStr for Function {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Function::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| ExplorerError::lookup("function", s))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FunctionOutput {
    Listing(Listing),
    Nodes(Vec<String>),
    Cpu(f64),
    Memory(String),
}

impl FunctionOutput {
    /// Column headers and rows for table output.
    #[must_use]
    pub fn table(&self) -> (Vec<&'static str>, Vec<Vec<String>>) {
        match self {
            FunctionOutput::Listing(l @ Listing::Flat(_)) => (vec!["name"], l.rows()),
            FunctionOutput::Listing(l @ Listing::Grouped(_)) => (vec!["name", "related"], l.rows()),
            FunctionOutput::Listing(l @ Listing::Routes(_)) => (vec!["ingress", "service", "pods"], l.rows()),
            FunctionOutput::Nodes(ids) => (vec!["node"], ids.iter().map(|i| vec![i.clone()]).collect()),
            FunctionOutput::Cpu(v) => (vec!["cpu"], vec![vec![format!("{v:.2}")]]),
            FunctionOutput::Memory(m) => (vec!["memory"], vec![vec![m.clone()]]),
        }
    }
}
