use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kube_relations_explorer::discovery::discover;
use kube_relations_explorer::graph::ResourceGraph;
use std::fmt::Write as _;
use std::fs;

// One Deployment, Service and Ingress per app; every Deployment runs `replicas` pods
fn synthetic_manifests(apps: usize, replicas: usize) -> String {
    let mut out = String::new();
    for i in 0..apps {
        let ns = format!("team-{}", i % 4);
        let _ = write!(
            out,
            "---\nkind: Deployment\nmetadata:\n  name: app-{i}\n  namespace: {ns}\n  labels: {{app.kubernetes.io/name: app-{i}}}\nspec:\n  replicas: {replicas}\n  selector: {{matchLabels: {{app: app-{i}}}}}\n  template:\n    metadata:\n      labels: {{app: app-{i}, tier: web}}\n    spec:\n      containers:\n        - image: registry/app-{i}:1.0\n          ports: [{{name: http, containerPort: 8080}}]\n          resources: {{requests: {{cpu: 100m, memory: 64Mi}}}}\n"
        );
        let _ = write!(
            out,
            "---\nkind: Service\nmetadata:\n  name: app-{i}\n  namespace: {ns}\nspec:\n  selector: {{app: app-{i}}}\n---\nkind: Ingress\nmetadata:\n  name: app-{i}\n  namespace: {ns}\nspec:\n  rules:\n    - host: app-{i}.example.com\n      http:\n        paths:\n          - path: /\n            backend: {{service: {{name: app-{i}}}}}\n"
        );
    }
    out
}

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for apps in [10usize, 100] {
        let manifests = synthetic_manifests(apps, 3);
        group.bench_function(BenchmarkId::new("add_manifest_str", apps), |b| {
            b.iter(|| {
                let mut graph = ResourceGraph::new();
                graph.add_manifest_str(black_box(&manifests)).expect("load manifests");
                black_box(graph.node_count())
            })
        });
        group.bench_function(BenchmarkId::new("discover", apps), |b| {
            b.iter(|| {
                let mut graph = ResourceGraph::new();
                graph.add_manifest_str(&manifests).expect("load manifests");
                let summary = discover(&mut graph, &[] as &[&str]);
                black_box(summary.edges_added())
            })
        });
    }

    let dir = tempfile::tempdir().expect("temp dir");
    for i in 0..20 {
        fs::write(dir.path().join(format!("app-{i}.yaml")), synthetic_manifests(5, 2)).expect("write manifest");
    }
    group.bench_function("build_from_directory", |b| {
        b.iter(|| {
            let graph = ResourceGraph::build_from_directory(black_box(dir.path())).expect("build graph");
            black_box(graph.node_count())
        })
    });

    group.finish();
}

criterion_group!(name = benches; config = Criterion::default(); targets = bench_build_graph);
criterion_main!(benches);
