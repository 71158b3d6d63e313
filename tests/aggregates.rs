use kube_relations_explorer::api::{sum_cpu_requests, sum_memory_requests, AggregateDefaults, Function, FunctionOutput};
use kube_relations_explorer::graph::ResourceGraph;
use kube_relations_explorer::query::QueryLibrary;
use kube_relations_explorer::utils::units::MemoryUnit;
use std::collections::BTreeMap;

const PODS: &str = r#"
kind: Deployment
metadata: {name: api}
spec:
  replicas: 3
  template:
    spec:
      containers:
        - image: api:2
          resources:
            requests: {cpu: 250m, memory: 256Mi}
---
kind: Pod
metadata: {name: batch}
spec:
  containers:
    - image: batch:1
      resources:
        requests: {cpu: "1", memory: 1Gi}
    - image: sidecar:1
"#;

fn graph() -> ResourceGraph {
    let mut g = ResourceGraph::new();
    g.add_manifest_str(PODS).unwrap();
    g
}

#[test]
fn cpu_counts_every_replica() {
    let total = sum_cpu_requests(&graph(), &QueryLibrary::builtin(), "0").unwrap();
    assert!((total - 1.75).abs() < 1e-9, "{total}");
}

#[test]
fn cpu_default_fills_missing_requests() {
    let total = sum_cpu_requests(&graph(), &QueryLibrary::builtin(), "500m").unwrap();
    assert!((total - 2.25).abs() < 1e-9, "{total}");
}

#[test]
fn memory_in_requested_unit() {
    let g = graph();
    let lib = QueryLibrary::builtin();
    assert_eq!(sum_memory_requests(&g, &lib, "0", MemoryUnit::M).unwrap(), "1792.00M");
    assert_eq!(sum_memory_requests(&g, &lib, "0", MemoryUnit::G).unwrap(), "1.75G");
}

#[test]
fn empty_graph_sums_to_zero() {
    let g = ResourceGraph::new();
    let lib = QueryLibrary::builtin();
    assert_eq!(sum_cpu_requests(&g, &lib, "1").unwrap(), 0.0);
    assert_eq!(sum_memory_requests(&g, &lib, "1G", MemoryUnit::M).unwrap(), "0.00M");
}

#[test]
fn function_arguments_override_defaults() {
    let g = graph();
    let lib = QueryLibrary::builtin();
    let defaults = AggregateDefaults { cpu: "0".into(), memory: "0".into(), unit: "G".into() };

    let mut args = BTreeMap::new();
    let out = Function::SumMemoryRequests.call(&g, &lib, &args, &defaults).unwrap();
    assert_eq!(out, FunctionOutput::Memory("1.75G".into()));

    args.insert("unit".to_string(), "Mi".to_string());
    let out = Function::SumMemoryRequests.call(&g, &lib, &args, &defaults).unwrap();
    assert_eq!(out, FunctionOutput::Memory("1792.00M".into()));

    args.insert("unit".to_string(), "bogus".to_string());
    assert!(Function::SumMemoryRequests.call(&g, &lib, &args, &defaults).is_err());
}

#[test]
fn unknown_arguments_are_rejected() {
    let g = graph();
    let mut args = BTreeMap::new();
    args.insert("colour".to_string(), "blue".to_string());
    let err = Function::SumCpuRequests
        .call(&g, &QueryLibrary::builtin(), &args, &AggregateDefaults::default())
        .unwrap_err();
    assert!(err.to_string().contains("colour"));
}
