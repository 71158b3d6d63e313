use kube_relations_explorer::discovery::discover;
use kube_relations_explorer::graph::ResourceGraph;
use kube_relations_explorer::visualization::{DotGenerator, DotOptions, DotTheme, EdgeStyle, RankDir};

const MANIFESTS: &str = r#"
kind: Pod
metadata:
  name: api
  namespace: prod
  labels: {app: api}
---
kind: Service
metadata:
  name: api
  namespace: prod
spec:
  selector: {app: api}
---
kind: ConfigMap
metadata: {name: settings}
"#;

fn graph() -> ResourceGraph {
    let mut g = ResourceGraph::new();
    g.add_manifest_str(MANIFESTS).unwrap();
    discover(&mut g, &[] as &[&str]);
    g
}

#[test]
fn default_dot_has_clusters_legend_and_edges() {
    let dot = DotGenerator::new().generate_dot(&graph()).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("rankdir=LR"));
    assert!(dot.contains("splines=curved"));
    assert!(dot.contains("label=\"namespace: prod\""));
    assert!(dot.contains("cluster_legend"));
    assert!(dot.contains("label=\"selects\""));
    assert!(dot.trim_end().ends_with('}'));
}

#[test]
fn options_change_layout() {
    let opts = DotOptions {
        clusters: false,
        legend: false,
        theme: DotTheme::Dark,
        rankdir: RankDir::TB,
        splines: EdgeStyle::Ortho,
        rounded: false,
        exclude_kinds: Vec::new(),
    };
    let dot = DotGenerator::new().generate_dot_with_options(&graph(), &opts).unwrap();
    assert!(dot.contains("rankdir=TB"));
    assert!(dot.contains("splines=ortho"));
    assert!(dot.contains("style=filled]"));
    assert!(!dot.contains("subgraph"));
}

#[test]
fn excluded_kinds_drop_nodes_and_edges() {
    let opts = DotOptions { exclude_kinds: vec!["Label".into(), "Namespace".into()], ..DotOptions::default() };
    let dot = DotGenerator::new().generate_dot_with_options(&graph(), &opts).unwrap();
    assert!(!dot.contains("\"Label:app:api\""));
    assert!(!dot.contains("label=\"labels\""));
    assert!(!dot.contains("label=\"in\""));
    assert!(dot.contains("label=\"selects\""));
}
