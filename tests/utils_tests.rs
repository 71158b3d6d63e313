use kube_relations_explorer::graph::ResourceGraph;
use kube_relations_explorer::utils::file_walker;
use kube_relations_explorer::utils::table;
use std::fs;
use std::path::{Path, PathBuf};

fn make_manifest_dir(entries: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, body) in entries {
        let p = dir.path().join(rel);
        if let Some(par) = p.parent() {
            fs::create_dir_all(par).unwrap();
        }
        fs::write(p, body).unwrap();
    }
    dir
}

fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn table_render_pads_and_fills_missing_cells() {
    let rows = vec![vec!["Pod:web-1".to_string(), "x".to_string()], vec!["Pod:a".to_string()]];
    let out = table::render(&["node", "extra"], &rows);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "+-----------+-------+");
    assert_eq!(lines[1], "| node      | extra |");
    assert_eq!(lines[3], "| Pod:web-1 | x     |");
    assert_eq!(lines[4], "| Pod:a     |       |");
}

#[test]
fn walker_keeps_yaml_sorted() {
    let dir = make_manifest_dir(&[
        ("b.yaml", "kind: Pod\nmetadata: {name: b}\n"),
        ("a/z.yml", "kind: Pod\nmetadata: {name: z}\n"),
        ("notes.txt", "ignored"),
        ("chart/values.json", "{}"),
    ]);
    let files = file_walker::manifest_files(dir.path());
    assert_eq!(names(dir.path(), &files), vec!["a/z.yml", "b.yaml"]);
}

#[test]
fn ignore_files_are_honored_unless_bypassed() {
    let dir = make_manifest_dir(&[
        (".ignore", "generated/\n*.tmp.yaml\n"),
        ("app.yaml", "kind: Pod\nmetadata: {name: app}\n"),
        ("scratch.tmp.yaml", "kind: Pod\nmetadata: {name: scratch}\n"),
        ("generated/out.yaml", "kind: Pod\nmetadata: {name: generated}\n"),
    ]);
    let honored = file_walker::manifest_files_with_options(dir.path(), false);
    assert_eq!(names(dir.path(), &honored), vec!["app.yaml"]);

    let all = file_walker::manifest_files_with_options(dir.path(), true);
    assert_eq!(all.len(), 3);

    let graph = ResourceGraph::build_from_directory(dir.path()).expect("build graph");
    assert!(graph.contains("Pod:app"));
    assert!(!graph.contains("Pod:generated"));
    let graph = ResourceGraph::build_from_directory_opts(dir.path(), true).expect("build graph");
    assert!(graph.contains("Pod:generated"));
}

#[test]
fn gitignore_negation_reincludes_files() {
    let dir = make_manifest_dir(&[
        (".gitignore", "*.yaml\n!keep.yaml\n"),
        ("keep.yaml", "kind: Pod\nmetadata: {name: keep}\n"),
        ("gone.yaml", "kind: Pod\nmetadata: {name: gone}\n"),
    ]);
    let files = file_walker::manifest_files(dir.path());
    assert_eq!(names(dir.path(), &files), vec!["keep.yaml"]);
}
