use crate::errors::ExplorerError;
use crate::graph::{Node, Relation, ResourceGraph};
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotTheme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDir {
    LR,
    TB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Curved,
    Ortho,
    Polyline,
}

#[derive(Debug, Clone)]
pub struct DotOptions {
    /// Group resources into one cluster per namespace.
    pub clusters: bool,
    pub legend: bool,
    pub theme: DotTheme,
    pub rankdir: RankDir,
    pub splines: EdgeStyle,
    pub rounded: bool,
    /// Node kinds left out of the drawing, with their edges.
    pub exclude_kinds: Vec<String>,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self {
            clusters: true,
            legend: true,
            theme: DotTheme::Light,
            rankdir: RankDir::LR,
            splines: EdgeStyle::Curved,
            rounded: true,
            exclude_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SvgOptions {
    pub dot: DotOptions,
    pub interactive: bool,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self { dot: DotOptions::default(), interactive: true }
    }
}

#[derive(Debug, Default)]
pub struct SvgGenerator;

impl SvgGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    /// Render the graph to SVG through Graphviz `dot`.
    ///
    /// # Errors
    /// Returns `ExplorerError::Visualization` when `dot` cannot be started, exits with an
    /// error, or produces output that is not UTF-8.
    pub fn generate_svg_with_options(&self, graph: &ResourceGraph, opts: &SvgOptions) -> Result<String, ExplorerError> {
        let dot = DotGenerator::new().generate_dot_with_options(graph, &opts.dot)?;
        let svg = run_graphviz(&dot)?;
        Ok(if opts.interactive { enhance_svg(&svg) } else { svg })
    }
}

fn run_graphviz(dot: &str) -> Result<String, ExplorerError> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let output = Command::new("dot")
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(dot.as_bytes())?;
            }
            child.wait_with_output()
        })
        .map_err(|e| ExplorerError::Visualization(format!("cannot run graphviz `dot`: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExplorerError::Visualization(format!(
            "graphviz `dot` exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout).map_err(|e| ExplorerError::Visualization(format!("non UTF-8 SVG from `dot`: {e}")))
}

// Clicking a node keeps its own relations lit and dims the rest; clicking the background resets.
// Graphviz titles edges as `source->target` using the node identities.
const SVG_INTERACTION: &str = r"
<style>
svg g.node, svg g.edge { transition: opacity 0.15s; }
svg g.node:hover polygon, svg g.node:hover ellipse, svg g.node:hover path { stroke-width: 2; }
svg.focused g.node, svg.focused g.edge { opacity: 0.15; }
svg.focused g.lit { opacity: 1; }
</style>
<script><![CDATA[
(function(){
  var root = document.querySelector('svg');
  if (!root) { return; }
  function title(g){ var t = g.querySelector('title'); return t ? t.textContent : ''; }
  function reset(){
    root.classList.remove('focused');
    root.querySelectorAll('.lit').forEach(function(g){ g.classList.remove('lit'); });
  }
  root.querySelectorAll('g.node').forEach(function(node){
    node.addEventListener('click', function(ev){
      ev.stopPropagation();
      reset();
      var id = title(node);
      root.classList.add('focused');
      node.classList.add('lit');
      root.querySelectorAll('g.edge').forEach(function(edge){
        var ends = title(edge).split('->');
        if (ends[0] === id || ends[1] === id) {
          edge.classList.add('lit');
          root.querySelectorAll('g.node').forEach(function(other){
            var t = title(other);
            if (t === ends[0] || t === ends[1]) { other.classList.add('lit'); }
          });
        }
      });
    });
  });
  root.addEventListener('click', reset);
})();
]]></script>
";

fn enhance_svg(svg: &str) -> String {
    let pos = svg.rfind("</svg>").unwrap_or(svg.len());
    let mut out = String::with_capacity(svg.len() + SVG_INTERACTION.len());
    out.push_str(&svg[..pos]);
    out.push_str(SVG_INTERACTION);
    out.push_str(&svg[pos..]);
    out
}

#[derive(Debug, Default)]
pub struct DotGenerator;

impl DotGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    /// Generate DOT with default options.
    ///
    /// # Errors
    /// Returns an `ExplorerError` if DOT generation fails for any reason.
    pub fn generate_dot(&self, graph: &ResourceGraph) -> Result<String, ExplorerError> {
        self.generate_dot_with_options(graph, &DotOptions::default())
    }

    /// Generate DOT with the given `opts`.
    ///
    /// # Errors
    /// Returns an `ExplorerError` if DOT generation fails for any reason.
    pub fn generate_dot_with_options(&self, graph: &ResourceGraph, opts: &DotOptions) -> Result<String, ExplorerError> {
        let graph = graph.without_kinds(&opts.exclude_kinds);
        let mut s = String::new();
        s.push_str("digraph KubeRelations\n{");
        s.push('\n');
        let rank = match opts.rankdir {
            RankDir::LR => "LR",
            RankDir::TB => "TB",
        };
        let splines = match opts.splines {
            EdgeStyle::Curved => "curved",
            EdgeStyle::Ortho => "ortho",
            EdgeStyle::Polyline => "polyline",
        };
        let node_style = if opts.rounded { "filled,rounded" } else { "filled" };
        let _ = write!(
            s,
            "  rankdir={rank};\n  graph [fontname=Helvetica, splines={splines}] ;\n  node [shape=box, fontsize=10, style={node_style}] ;\n  edge [fontname=Helvetica, fontsize=9];\n"
        );

        if opts.clusters {
            // Resources grouped by namespace; derived nodes stay at the top level
            let mut namespaces: BTreeMap<&str, Vec<&Node>> = BTreeMap::new();
            for node in graph.nodes() {
                match node.resource() {
                    Some(r) => namespaces.entry(r.namespace.as_str()).or_default().push(node),
                    None => write_node(&mut s, "  ", node, opts.theme),
                }
            }
            for (ns, nodes) in namespaces {
                let cluster_id = format!("cluster_{}", escape_label(ns));
                let _ = write!(
                    s,
                    "  subgraph \"{cluster_id}\" {{\n    label=\"namespace: {}\";\n    color=lightgrey;\n",
                    escape_label(ns)
                );
                for node in nodes {
                    write_node(&mut s, "    ", node, opts.theme);
                }
                s.push_str("  }\n");
            }
        } else {
            for node in graph.nodes() {
                write_node(&mut s, "  ", node, opts.theme);
            }
        }

        for (source, target, edge) in graph.edges() {
            let from = escape_label(&source.id);
            let to = escape_label(&target.id);
            let (color, style) = style_for_relation(edge.relation);
            let label = match edge.attribute(&["path"]).as_str() {
                Some(path) => format!("{}:{path}", edge.relation),
                None => edge.relation.to_string(),
            };
            let _ = writeln!(
                s,
                "  \"{from}\" -> \"{to}\" [label=\"{}\", color=\"{color}\", style=\"{style}\"];",
                escape_label(&label)
            );
        }

        if opts.legend {
            s.push_str("  subgraph cluster_legend {\n    label=\"Legend\";\n    color=grey;\n");
            for kind in ["Pod", "Deployment", "Service", "Ingress", "ConfigMap", "Namespace", "Label", "Application", "ContainerImage", "Host"] {
                let (fill, shape) = style_for_kind_with_theme(kind, opts.theme);
                let id = format!("legend_{kind}");
                let _ = writeln!(s, "    \"{id}\" [label=\"{kind}\", fillcolor=\"{fill}\", shape=\"{shape}\"]; ");
            }
            s.push_str("  }\n");
        }

        s.push_str("}\n");
        Ok(s)
    }
}

fn write_node(out: &mut String, indent: &str, node: &Node, theme: DotTheme) {
    let node_id = escape_label(&node.id);
    let (fill, shape) = style_for_kind_with_theme(&node.kind, theme);
    let label = match node.resource() {
        Some(r) => format!("{}\\n{}", escape_label(&r.kind), escape_label(&r.name)),
        None => node_id.clone(),
    };
    let _ = writeln!(
        out,
        "{indent}\"{node_id}\" [label=\"{label}\", fillcolor=\"{fill}\", shape=\"{shape}\", URL=\"node://{node_id}\", tooltip=\"{node_id}\"];"
    );
}

/// Escapes a value for a quoted DOT string. Node identities go through it unchanged otherwise.
fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn style_for_relation(relation: Relation) -> (&'static str, &'static str) {
    match relation {
        Relation::In => ("#7f7f7f", "dotted"),
        Relation::Labels | Relation::Annotates => ("#bcbd22", "dashed"),
        Relation::Selects => ("#1f77b4", "solid"),
        Relation::Contains => ("#9467bd", "dashed"),
        Relation::Runs => ("#2ca02c", "solid"),
        Relation::Hosts => ("#ff7f0e", "solid"),
        Relation::Serves => ("#d62728", "bold"),
    }
}

fn style_for_kind_with_theme(kind: &str, theme: DotTheme) -> (&'static str, &'static str) {
    let workload = matches!(kind, "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Job" | "CronJob");
    match (theme, kind) {
        (DotTheme::Light, "Pod") => ("#e8ffe0", "oval"),
        (DotTheme::Light, _) if workload => ("#e0f3ff", "component"),
        (DotTheme::Light, "Service") => ("#fff4e0", "box"),
        (DotTheme::Light, "Ingress") => ("#ffe0f0", "hexagon"),
        (DotTheme::Light, "ConfigMap" | "Secret") => ("#ffffe0", "note"),
        (DotTheme::Light, "Namespace") => ("#f0ffff", "folder"),
        (DotTheme::Light, "Label") => ("#f5f5f5", "cds"),
        (DotTheme::Light, "Application") => ("#f0e0ff", "box3d"),
        (DotTheme::Light, "ContainerImage") => ("#e0ffe8", "cylinder"),
        (DotTheme::Light, "Host") => ("#fff0e0", "parallelogram"),
        (DotTheme::Light, _) => ("#ffffff", "box"),

        (DotTheme::Dark, "Pod") => ("#0b6e4f", "oval"),
        (DotTheme::Dark, _) if workload => ("#124559", "component"),
        (DotTheme::Dark, "Service") => ("#7a4c00", "box"),
        (DotTheme::Dark, "Ingress") => ("#6a1e44", "hexagon"),
        (DotTheme::Dark, "ConfigMap" | "Secret") => ("#6b6b00", "note"),
        (DotTheme::Dark, "Namespace") => ("#004f4f", "folder"),
        (DotTheme::Dark, "Label") => ("#3a3a3a", "cds"),
        (DotTheme::Dark, "Application") => ("#3c2a5a", "box3d"),
        (DotTheme::Dark, "ContainerImage") => ("#0f5e3a", "cylinder"),
        (DotTheme::Dark, "Host") => ("#5a3a1a", "parallelogram"),
        (DotTheme::Dark, _) => ("#2b2b2b", "box"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similar_identities_stay_distinct() {
        let mut g = ResourceGraph::new();
        g.add_manifest_str("kind: Pod\nmetadata:\n  name: p\n  labels: {a.b: c, a_b: c}\n").unwrap();
        crate::discovery::discover(&mut g, &[] as &[&str]);
        let dot = DotGenerator::new().generate_dot(&g).unwrap();
        assert!(dot.contains("\"Label:a.b:c\" [label="));
        assert!(dot.contains("\"Label:a_b:c\" [label="));
        assert!(dot.contains("\"Label:a.b:c\" -> \"Pod:p\""));
        assert!(dot.contains("\"Label:a_b:c\" -> \"Pod:p\""));
    }

    #[test]
    fn test_escape_label_quotes() {
        assert_eq!(escape_label("a\"b\"c"), "a\\\"b\\\"c");
        assert_eq!(escape_label("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_styles_per_kind_and_theme() {
        assert_eq!(style_for_kind_with_theme("Pod", DotTheme::Light), ("#e8ffe0", "oval"));
        assert_eq!(style_for_kind_with_theme("StatefulSet", DotTheme::Light), ("#e0f3ff", "component"));
        assert_eq!(style_for_kind_with_theme("Secret", DotTheme::Dark), ("#6b6b00", "note"));
        assert_eq!(style_for_kind_with_theme("FancyCrd", DotTheme::Dark), ("#2b2b2b", "box"));
        assert_eq!(style_for_relation(Relation::Serves), ("#d62728", "bold"));
    }

    #[test]
    fn enhanced_svg_keeps_closing_tag_last() {
        let out = enhance_svg("<svg><g class=\"node\"></g></svg>");
        assert!(out.contains("svg.focused"));
        assert!(out.ends_with("</svg>"));
        assert!(enhance_svg("<svg>").ends_with("]]></script>\n"));
    }

    #[test]
    fn test_clusters_follow_namespaces() {
        let mut g = ResourceGraph::new();
        g.add_manifest_str(
            "kind: Service\nmetadata: {name: a, namespace: shop}\n---\nkind: Service\nmetadata: {name: b}\n",
        )
        .unwrap();
        let dot = DotGenerator::new().generate_dot(&g).unwrap();
        assert!(dot.contains("subgraph \"cluster_shop\""));
        assert!(dot.contains("subgraph \"cluster_default\""));
        assert!(dot.contains("\"Service:a\" [label=\"Service\\na\""));
    }
}
