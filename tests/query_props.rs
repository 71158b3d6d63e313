use kube_relations_explorer::discovery::{discover, SelectorsRule};
use kube_relations_explorer::graph::ResourceGraph;
use kube_relations_explorer::parser::ManifestParser;
use kube_relations_explorer::query::{substitute_placeholders, Arguments};
use kube_relations_explorer::utils::units::{normalize_cpu, normalize_memory_to_bytes};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

fn labeled_pods(pods: &[BTreeMap<String, String>]) -> ResourceGraph {
    let mut yaml = String::new();
    for (i, labels) in pods.iter().enumerate() {
        yaml.push_str(&format!("---\nkind: Pod\nmetadata:\n  name: p{i}\n  labels: {{"));
        let pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}: \"{v}\"")).collect();
        yaml.push_str(&pairs.join(", "));
        yaml.push_str("}\n");
    }
    let mut g = ResourceGraph::new();
    g.add_manifest_str(&yaml).unwrap();
    discover(&mut g, &[] as &[&str]);
    g
}

fn label_maps() -> impl Strategy<Value = Vec<BTreeMap<String, String>>> {
    prop::collection::vec(prop::collection::btree_map("[abc]", "[12]", 0..3), 1..8)
}

fn selector() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[abc]", "[12]"), 1..3)
}

// Bottom-up property-based tests: selector matching, placeholders, quantities, parser robustness
proptest! {
    // A selected pod carries every selector pair
    #[test]
    fn selected_pods_carry_all_pairs(pods in label_maps(), pairs in selector()) {
        let g = labeled_pods(&pods);
        for id in SelectorsRule::matching_pods(&g, &pairs) {
            let index: usize = id.trim_start_matches("Pod:p").parse().unwrap();
            for (k, v) in &pairs {
                prop_assert_eq!(pods[index].get(k), Some(v));
            }
        }
    }

    // Adding a pair never widens the match
    #[test]
    fn more_pairs_never_match_more(pods in label_maps(), pairs in selector(), extra in ("[abc]", "[12]")) {
        let g = labeled_pods(&pods);
        let base = SelectorsRule::matching_pods(&g, &pairs);
        let mut narrowed_pairs = pairs.clone();
        narrowed_pairs.push(extra);
        let narrowed = SelectorsRule::matching_pods(&g, &narrowed_pairs);
        prop_assert!(narrowed.iter().all(|p| base.contains(p)));
    }

    // Strings that are not placeholders survive substitution untouched
    #[test]
    fn substitution_keeps_plain_strings(s in "[a-z0-9 ._-]{0,16}", v in "[a-z]{1,8}") {
        let mut args = Arguments::new();
        args.insert("name".to_string(), Value::String(v));
        let value = json!({"eq": ["name", s.clone()], "nested": [s.clone(), {"k": s.clone()}]});
        prop_assert_eq!(substitute_placeholders(&value, &args), value);
    }

    // A bound placeholder is replaced by the bound value wherever it appears
    #[test]
    fn substitution_replaces_bound_placeholders(v in "[a-z0-9:./-]{1,24}") {
        let mut args = Arguments::new();
        args.insert("image".to_string(), Value::String(v.clone()));
        let value = json!({"and": [{"eq": ["name", "<image>"]}, {"eq": ["kind", "<other>"]}]});
        let expected = json!({"and": [{"eq": ["name", v]}, {"eq": ["kind", "<other>"]}]});
        prop_assert_eq!(substitute_placeholders(&value, &args), expected);
    }

    #[test]
    fn millicores_are_thousandths(n in 0u32..100_000) {
        let cores = normalize_cpu(&format!("{n}m")).unwrap();
        let expected = (f64::from(n) / 1000.0 * 100.0).round() / 100.0;
        prop_assert!((cores - expected).abs() < 1e-9);
    }

    #[test]
    fn binary_suffix_is_optional(n in 0u32..10_000, suffix in "[KMGT]") {
        prop_assert_eq!(
            normalize_memory_to_bytes(&format!("{n}{suffix}")),
            normalize_memory_to_bytes(&format!("{n}{suffix}i"))
        );
    }

    // The parser should never panic on arbitrary UTF-8 input
    #[test]
    fn parser_never_panics_on_arbitrary_input(s in ".*") {
        let _ = ManifestParser::new().parse_str(&s, Path::new("/prop.yaml"));
    }
}
