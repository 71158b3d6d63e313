use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kube_relations_explorer::api::{self, AggregateDefaults, Function};
use kube_relations_explorer::discovery::discover;
use kube_relations_explorer::graph::ResourceGraph;
use kube_relations_explorer::query::{NamedQuery, Query, QueryLibrary};
use std::collections::BTreeMap;
use std::fmt::Write as _;

fn build_graph_once(apps: usize) -> ResourceGraph {
    let mut manifests = String::new();
    for i in 0..apps {
        let _ = write!(
            manifests,
            "---\nkind: Deployment\nmetadata: {{name: app-{i}, namespace: ns-{ns}}}\nspec:\n  replicas: 3\n  template:\n    metadata: {{labels: {{app: app-{i}}}}}\n    spec:\n      containers:\n        - image: registry/app-{img}:1.0\n          resources: {{requests: {{cpu: 250m, memory: 128Mi}}}}\n---\nkind: Service\nmetadata: {{name: app-{i}, namespace: ns-{ns}}}\nspec: {{selector: {{app: app-{i}}}}}\n",
            ns = i % 5,
            img = i % 7,
        );
    }
    let mut graph = ResourceGraph::new();
    graph.add_manifest_str(&manifests).expect("load manifests");
    discover(&mut graph, &[] as &[&str]);
    graph
}

fn bench_queries(c: &mut Criterion) {
    // Setup outside of iter
    let graph = build_graph_once(200);
    let library = QueryLibrary::builtin();

    let mut group = c.benchmark_group("queries");

    group.bench_function("all_pods", |b| {
        b.iter(|| {
            let rows = NamedQuery::new(&library, "all_pods").run(black_box(&graph)).expect("query");
            black_box(rows.len())
        })
    });

    for service in ["app-0", "app-199"] {
        group.bench_function(BenchmarkId::new("service_pods", service), |b| {
            b.iter(|| {
                let rows = NamedQuery::new(&library, "service_pods").arg("service", service).run(&graph).expect("query");
                black_box(rows.len())
            })
        });
    }

    // Subquery scoping plus distinct
    group.bench_function("images_in_namespace", |b| {
        b.iter(|| {
            let rows =
                NamedQuery::new(&library, "images_in_namespace").arg("namespace", "ns-1").run(&graph).expect("query");
            black_box(rows.len())
        })
    });

    group.bench_function("list_container_images_grouped", |b| {
        b.iter(|| black_box(api::list_container_images(&graph, false)))
    });

    let args = BTreeMap::new();
    let defaults = AggregateDefaults::default();
    group.bench_function("sum_memory_requests", |b| {
        b.iter(|| {
            let out = Function::SumMemoryRequests.call(&graph, &library, &args, &defaults).expect("aggregate");
            black_box(out)
        })
    });

    group.finish();
}

criterion_group!(name = benches; config = Criterion::default(); targets = bench_queries);
criterion_main!(benches);
