//! Resource request totals over every Pod in the graph.
use crate::errors::ExplorerError;
use crate::graph::{Record, ResourceGraph};
use crate::query::{node_ids, NamedQuery, Query, QueryLibrary};
use crate::utils::units::{normalize_cpu, normalize_memory_to_bytes, MemoryUnit};

const ALL_PODS: &str = "all_pods";

// Sum one request field over all pods, substituting `default` per missing container value and
// once per pod without a usable container list
fn sum_requests(
    graph: &ResourceGraph,
    library: &QueryLibrary,
    field: &str,
    default: f64,
    normalize: fn(&str) -> Option<f64>,
) -> Result<f64, ExplorerError> {
    let pods = node_ids(NamedQuery::new(library, ALL_PODS).run(graph)?)?;
    let mut total = 0.0;
    for id in &pods {
        let Some(pod) = graph.node(id)?.resource() else {
            continue;
        };
        match pod.spec().get("containers").as_seq() {
            Some(containers) if !containers.is_empty() => {
                for container in containers {
                    let value = container_request(container, field)
                        .scalar_string()
                        .and_then(|raw| normalize(&raw));
                    total += value.unwrap_or(default);
                }
            }
            _ => total += default,
        }
    }
    tracing::debug!(field, pods = pods.len(), total, "summed resource requests");
    Ok(total)
}

/// Total requested CPU cores, rounded to 2 decimals.
///
/// # Errors
/// Returns `ExplorerError::Unit` when `default` is not a CPU quantity, and propagates query
/// errors from the `all_pods` query.
pub fn sum_cpu_requests(graph: &ResourceGraph, library: &QueryLibrary, default: &str) -> Result<f64, ExplorerError> {
    let default = normalize_cpu(default).ok_or_else(|| ExplorerError::Unit(default.to_string()))?;
    let total = sum_requests(graph, library, "cpu", default, normalize_cpu)?;
    Ok((total * 100.0).round() / 100.0)
}

/// Total requested memory rendered as `"<value with 2 decimals><unit>"`, e.g. `"256.00M"`.
///
/// # Errors
/// Returns `ExplorerError::Unit` when `default` is not a memory quantity, and propagates query
/// errors from the `all_pods` query.
pub fn sum_memory_requests(
    graph: &ResourceGraph,
    library: &QueryLibrary,
    default: &str,
    unit: MemoryUnit,
) -> Result<String, ExplorerError> {
    let default = normalize_memory_to_bytes(default).ok_or_else(|| ExplorerError::Unit(default.to_string()))?;
    let bytes = sum_requests(graph, library, "memory", default, normalize_memory_to_bytes)?;
    Ok(format!("{:.2}{unit}", bytes / unit.divisor()))
}

fn container_request<'a>(container: &'a Record, field: &str) -> &'a Record {
    container.path(&["resources", "requests", field])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(yaml: &str) -> ResourceGraph {
        let mut g = ResourceGraph::new();
        g.add_manifest_str(yaml).unwrap();
        g
    }

    #[test]
    fn cpu_sums_requests_and_defaults() {
        let g = graph(
            r#"
kind: Pod
metadata: {name: a}
spec:
  containers:
    - resources: {requests: {cpu: 500m}}
    - resources: {requests: {cpu: "1"}}
    - image: sidecar
---
kind: Pod
metadata: {name: b}
spec: {}
"#,
        );
        let total = sum_cpu_requests(&g, &QueryLibrary::builtin(), "100m").unwrap();
        assert!((total - 1.7).abs() < 1e-9, "{total}");
    }

    #[test]
    fn memory_uses_default_for_pods_without_containers() {
        let g = graph("kind: Pod\nmetadata: {name: a}\n---\nkind: Pod\nmetadata: {name: b}\nspec: {containers: []}\n");
        let total = sum_memory_requests(&g, &QueryLibrary::builtin(), "128M", MemoryUnit::M).unwrap();
        assert_eq!(total, "256.00M");
    }

    #[test]
    fn malformed_defaults_are_unit_errors() {
        let g = graph("kind: Pod\nmetadata: {name: a}\n");
        assert!(matches!(sum_cpu_requests(&g, &QueryLibrary::builtin(), "lots"), Err(ExplorerError::Unit(_))));
        assert!(matches!(
            sum_memory_requests(&g, &QueryLibrary::builtin(), "12Q", MemoryUnit::G),
            Err(ExplorerError::Unit(_))
        ));
    }
}
