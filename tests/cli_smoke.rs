use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const APP: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  labels: {app.kubernetes.io/name: shop}
spec:
  replicas: 2
  selector:
    matchLabels: {app: web}
  template:
    metadata:
      labels: {app: web}
    spec:
      containers:
        - image: nginx:1.25
          resources:
            requests: {cpu: 250m, memory: 128Mi}
---
apiVersion: v1
kind: Service
metadata: {name: web}
spec:
  selector: {app: web}
"#;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    fs::write(path, content).unwrap();
}

fn bin() -> Command {
    Command::cargo_bin("kube-relations-explorer").unwrap()
}

// Bottom-up: simple CLI smoke test for build and a query
#[test]
fn cli_build_and_query_smoke() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(&root.join("manifests/app.yaml"), APP);
    let manifests = root.join("manifests");

    let json_path = root.join("graph.json");
    bin()
        .arg("build")
        .arg("--manifests")
        .arg(&manifests)
        .arg("--json")
        .arg(&json_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Built graph"));
    let content = fs::read_to_string(&json_path).unwrap();
    assert!(content.contains("Service:web"));

    bin()
        .arg("query")
        .arg("service_pods")
        .arg("-m")
        .arg(&manifests)
        .arg("--args")
        .arg("service:web")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pod:web-1").and(predicate::str::contains("Pod:web-2")));
}

#[test]
fn cli_run_functions() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("app.yaml"), APP);

    bin()
        .arg("run")
        .arg("sum_cpu_requests")
        .arg("-m")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0.50"));

    bin()
        .arg("run")
        .arg("sum_memory_requests")
        .arg("-m")
        .arg(dir.path())
        .arg("--args")
        .arg("unit:M")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"256.00M\""));

    bin()
        .arg("run")
        .arg("list_applications")
        .arg("-m")
        .arg(dir.path())
        .arg("--args")
        .arg("flat:true")
        .assert()
        .success()
        .stdout(predicate::str::contains("shop"));
}

#[test]
fn cli_plot_prints_dot() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("app.yaml"), APP);
    bin()
        .args(["build", "--plot", "--dot-clusters", "off", "-m"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph").and(predicate::str::contains("Built graph").not()));
}

#[test]
fn cli_failures_exit_non_zero() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("app.yaml"), APP);

    bin()
        .args(["run", "no_such_function", "-m"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown function"));

    bin()
        .args(["query", "service_pods", "-m"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing: [service]"));

    let empty = tempdir().unwrap();
    bin()
        .args(["build", "-m"])
        .arg(empty.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No manifest found"));
}

#[test]
fn cli_rejects_invalid_enum_values() {
    bin().args(["build", "--dot-theme", "neon"]).assert().failure();
    bin().args(["query", "all_pods", "--format", "yaml"]).assert().failure();
}

#[test]
fn cli_lists_queries_and_completions() {
    let dir = tempdir().unwrap();
    bin()
        .args(["query", "--list", "-m"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("service_pods").and(predicate::str::contains("all_hosts")));

    bin()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kube-relations-explorer"));
}

#[test]
fn cli_quiet_suppresses_summary() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("app.yaml"), APP);
    bin()
        .args(["build", "-q", "-m"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
