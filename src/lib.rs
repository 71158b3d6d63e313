//! kube-relations-explorer: relation graph over Kubernetes manifests
//!
//! Load a directory of manifests into a graph, discover how the resources relate to each other
//! and query the result.
//!
//! # Features
//! - Manifest discovery with `.gitignore`/`.ignore` support (deterministic ordering)
//! - Relation discovery: namespaces, labels, annotations, selectors, applications,
//!   container images, ingress routing
//! - Declarative JSON queries with placeholders, subqueries and flattening
//! - Listings and CPU/memory request totals
//! - DOT and SVG visualization
//!
//! # Quickstart (Library)
//! ```no_run
//! use kube_relations_explorer::discovery::discover;
//! use kube_relations_explorer::graph::ResourceGraph;
//! use kube_relations_explorer::query::{NamedQuery, Query, QueryLibrary};
//!
//! let mut graph = ResourceGraph::build_from_directory(std::path::Path::new("manifests"))
//!     .expect("load manifests");
//! discover(&mut graph, &[] as &[&str]);
//! let library = QueryLibrary::builtin();
//! let pods = NamedQuery::new(&library, "service_pods").arg("service", "web").run(&graph);
//! println!("{pods:?}");
//! ```
//!
//! # Quickstart (CLI)
//! ```text
//! kube-relations-explorer build -m manifests --dot graph.dot
//! kube-relations-explorer run list_applications -m manifests --args flat:true
//! kube-relations-explorer query service_pods -m manifests --args service:web --format json
//! ```
pub mod api;
pub mod app;
pub mod cli;
pub mod discovery;
pub mod errors;
pub mod graph;
pub mod parser;
pub mod query;
pub mod utils;
pub mod visualization;
