use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "kube-relations-explorer",
    version,
    about = "Kubernetes manifest relation graph",
    long_about = "Load Kubernetes manifests into a graph, discover the relations between resources (namespaces, labels, selectors, applications, container images, ingress routing) and query it. Manifest discovery respects .gitignore and .ignore with parent traversal; use --no-ignore to bypass ignore rules."
)]
pub struct Cli {
    /// Suppress non-essential output
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,
    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Path to a TOML configuration file (default: kube-relations-explorer.toml in the manifests directory)
    #[arg(long, global = true, env = "KUBE_RELATIONS_EXPLORER_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

/// Where manifests come from and how relations are discovered.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Directory containing manifests (*.yaml, *.yml), searched recursively
    #[arg(short, long, default_value = ".")]
    pub manifests: PathBuf,
    /// Bypass ignore rules (.gitignore/.ignore) when discovering files
    #[arg(long, default_value_t = false)]
    pub no_ignore: bool,
    /// Relation rules to skip, comma-separated (namespace, labels, annotations, selectors, applications, containerimages, ingressbackends)
    #[arg(long, value_delimiter = ',')]
    pub exclude_relations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnOffArg {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DotThemeArg {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DotRankDirArg {
    #[value(name = "LR")]
    LR,
    #[value(name = "TB")]
    TB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DotSplinesArg {
    Curved,
    Ortho,
    Polyline,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the relation graph and export or render it
    Build {
        #[command(flatten)]
        source: SourceArgs,
        /// Node kinds to leave out of rendered output, comma-separated (e.g. Label,Host)
        #[arg(long, value_delimiter = ',')]
        exclude_types: Vec<String>,
        /// Print the graph as DOT on stdout (unless --dot or --svg is given)
        #[arg(short, long, default_value_t = false)]
        plot: bool,
        /// Output JSON file path
        #[arg(long)]
        json: Option<PathBuf>,
        /// Output DOT file path
        #[arg(long)]
        dot: Option<PathBuf>,
        /// Output SVG file path (requires Graphviz `dot`)
        #[arg(long)]
        svg: Option<PathBuf>,
        /// DOT: one cluster per namespace (default: on)
        #[arg(long, value_enum)]
        dot_clusters: Option<OnOffArg>,
        /// DOT: include legend (default: on)
        #[arg(long, value_enum)]
        dot_legend: Option<OnOffArg>,
        /// DOT: theme (default: light)
        #[arg(long, value_enum)]
        dot_theme: Option<DotThemeArg>,
        /// DOT: rank direction (default: LR)
        #[arg(long, value_enum)]
        dot_rankdir: Option<DotRankDirArg>,
        /// DOT: edge splines style (default: curved)
        #[arg(long, value_enum)]
        dot_splines: Option<DotSplinesArg>,
        /// DOT: rounded node corners (default: on)
        #[arg(long, value_enum)]
        dot_rounded: Option<OnOffArg>,
        /// SVG: add interactive enhancements (default: on)
        #[arg(long, value_enum)]
        svg_interactive: Option<OnOffArg>,
    },
    /// Run an inspection or aggregate function (e.g. list_applications, sum_cpu_requests)
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Function name
        function: String,
        /// Function arguments as key:value pairs, comma-separated (e.g. flat:true)
        #[arg(long, value_delimiter = ',', value_parser = parse_key_value)]
        args: Vec<(String, String)>,
        /// Output format: text or json (default from config, else text)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Run a named query from the query library
    Query {
        #[command(flatten)]
        source: SourceArgs,
        /// Query name (see --list)
        name: Option<String>,
        /// List available query names and exit
        #[arg(long, default_value_t = false)]
        list: bool,
        /// Query arguments as key:value pairs, comma-separated (e.g. service:web)
        #[arg(long, value_delimiter = ',', value_parser = parse_key_value)]
        args: Vec<(String, String)>,
        /// Output format: text or json (default from config, else text)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Skip the first N rows
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Return at most N rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse `key:value`. The value may itself contain `:`.
///
/// # Errors
/// Returns a message when the separator is missing or the key is empty.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected key:value, got `{raw}`")),
    }
}

#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
