use crate::api::{AggregateDefaults, Function};
use crate::cli::{
    Cli, Commands, DotRankDirArg, DotSplinesArg, DotThemeArg, OnOffArg, OutputFormat, SourceArgs,
};
use crate::discovery::discover;
use crate::errors::ExplorerError;
use crate::graph::ResourceGraph;
use crate::query::{Arguments, NamedQuery, Query, QueryLibrary, Row};
use crate::utils::config::{self, Config};
use crate::visualization::{
    DotGenerator, DotOptions, DotTheme, EdgeStyle, RankDir, SvgGenerator, SvgOptions,
};
use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` wins over the verbosity flags.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second install (e.g. repeated in-process runs) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the CLI logic in-process.
///
/// Returns an exit code: 0 on success, 1 on failure, 2 on invalid usage.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn run_cli(cli: Cli) -> i32 {
    let quiet = cli.quiet;
    let config_path = cli.config;
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = env!("CARGO_PKG_NAME");
            let mut out = io::stdout();
            generate(shell, &mut cmd, bin_name, &mut out);
            0
        }
        Commands::Build {
            source,
            exclude_types,
            plot,
            json,
            dot,
            svg,
            dot_clusters,
            dot_legend,
            dot_theme,
            dot_rankdir,
            dot_splines,
            dot_rounded,
            svg_interactive,
        } => {
            let cfg = load_config(config_path.as_deref(), &source.manifests);
            let graph = match load_graph(&source, cfg.as_ref()) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Build failed: {e}");
                    return 1;
                }
            };
            let mut failed = false;

            if let Some(json_path) = json {
                if let Err(e) = graph.save_json(&json_path) {
                    eprintln!("Failed to write JSON output {}: {e}", json_path.display());
                    failed = true;
                }
            }

            // DOT options: flags, then config, then defaults
            let dot_cfg = cfg.as_ref().and_then(|c| c.dot.clone()).unwrap_or_default();
            let defaults = DotOptions::default();
            let dot_opts = DotOptions {
                clusters: on_off(dot_clusters, dot_cfg.clusters, defaults.clusters),
                legend: on_off(dot_legend, dot_cfg.legend, defaults.legend),
                theme: match dot_theme {
                    Some(DotThemeArg::Dark) => DotTheme::Dark,
                    Some(DotThemeArg::Light) => DotTheme::Light,
                    None => match dot_cfg.theme.as_deref() {
                        Some("dark") => DotTheme::Dark,
                        Some(_) => DotTheme::Light,
                        None => defaults.theme,
                    },
                },
                rankdir: match dot_rankdir {
                    Some(DotRankDirArg::TB) => RankDir::TB,
                    Some(DotRankDirArg::LR) => RankDir::LR,
                    None => match dot_cfg.rankdir.as_deref() {
                        Some("TB") => RankDir::TB,
                        Some(_) => RankDir::LR,
                        None => defaults.rankdir,
                    },
                },
                splines: match dot_splines {
                    Some(DotSplinesArg::Ortho) => EdgeStyle::Ortho,
                    Some(DotSplinesArg::Polyline) => EdgeStyle::Polyline,
                    Some(DotSplinesArg::Curved) => EdgeStyle::Curved,
                    None => match dot_cfg.splines.as_deref() {
                        Some("ortho") => EdgeStyle::Ortho,
                        Some("polyline") => EdgeStyle::Polyline,
                        Some(_) => EdgeStyle::Curved,
                        None => defaults.splines,
                    },
                },
                rounded: on_off(dot_rounded, dot_cfg.rounded, defaults.rounded),
                exclude_kinds: if exclude_types.is_empty() {
                    dot_cfg.exclude_types.unwrap_or_default()
                } else {
                    exclude_types
                },
            };

            if let Some(dot_path) = dot.as_ref() {
                match DotGenerator::new().generate_dot_with_options(&graph, &dot_opts) {
                    Ok(content) => {
                        if let Err(e) = fs::write(dot_path, content) {
                            eprintln!("Failed to write DOT output {}: {e}", dot_path.display());
                            failed = true;
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                        failed = true;
                    }
                }
            }

            if let Some(svg_path) = svg.as_ref() {
                let svg_cfg = cfg.as_ref().and_then(|c| c.svg.as_ref()).and_then(|s| s.interactive);
                let svg_opts = SvgOptions {
                    dot: dot_opts.clone(),
                    interactive: on_off(svg_interactive, svg_cfg, SvgOptions::default().interactive),
                };
                match SvgGenerator::new().generate_svg_with_options(&graph, &svg_opts) {
                    Ok(content) => {
                        if let Err(e) = fs::write(svg_path, content) {
                            eprintln!("Failed to write SVG output {}: {e}", svg_path.display());
                            failed = true;
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                        failed = true;
                    }
                }
            }

            let plot_to_stdout = plot && dot.is_none() && svg.is_none();
            if plot_to_stdout {
                match DotGenerator::new().generate_dot_with_options(&graph, &dot_opts) {
                    Ok(content) => println!("{content}"),
                    Err(e) => {
                        eprintln!("{e}");
                        failed = true;
                    }
                }
            } else if !quiet {
                println!(
                    "Built graph from {}: {} nodes, {} edges",
                    source.manifests.display(),
                    graph.node_count(),
                    graph.edge_count()
                );
            }
            i32::from(failed)
        }
        Commands::Run { source, function, args, format } => {
            let function: Function = match function.parse() {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("{e}");
                    eprintln!(
                        "Available functions: {}",
                        Function::ALL.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
                    );
                    return 2;
                }
            };
            let cfg = load_config(config_path.as_deref(), &source.manifests);
            let graph = match load_graph(&source, cfg.as_ref()) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Build failed: {e}");
                    return 1;
                }
            };
            let library = query_library(cfg.as_ref());
            let defaults = aggregate_defaults(cfg.as_ref());
            let args: BTreeMap<String, String> = args.into_iter().collect();
            let output = match function.call(&graph, &library, &args, &defaults) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("{e}");
                    return 1;
                }
            };
            match resolve_format(format, cfg.as_ref()) {
                OutputFormat::Json => print_json(&output),
                OutputFormat::Text => {
                    let (headers, rows) = output.table();
                    if rows.is_empty() {
                        println!("<no results>");
                    } else {
                        println!("{}", crate::utils::table::render(&headers, &rows));
                    }
                    0
                }
            }
        }
        Commands::Query { source, name, list, args, format, offset, limit } => {
            let cfg = load_config(config_path.as_deref(), &source.manifests);
            let library = query_library(cfg.as_ref());
            let fmt = resolve_format(format, cfg.as_ref());
            if list {
                let names = library.names();
                return match fmt {
                    OutputFormat::Json => print_json(&names),
                    OutputFormat::Text => {
                        for n in names {
                            println!("{n}");
                        }
                        0
                    }
                };
            }
            let Some(name) = name else {
                eprintln!("Missing query name (use --list to see available queries)");
                return 2;
            };
            let graph = match load_graph(&source, cfg.as_ref()) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Build failed: {e}");
                    return 1;
                }
            };
            let args: Arguments = args.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            let rows = match NamedQuery::new(&library, &name).with_args(args).run(&graph) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{e}");
                    return 1;
                }
            };
            let rows: Vec<Row> = rows.into_iter().skip(offset).take(limit.unwrap_or(usize::MAX)).collect();
            match fmt {
                OutputFormat::Json => print_json(&rows),
                OutputFormat::Text => {
                    if rows.is_empty() {
                        println!("<no results>");
                    } else {
                        let width = rows.iter().map(|r| r.fields().len()).max().unwrap_or(1);
                        let headers: &[&str] = match width {
                            1 => &["#", "Node"],
                            2 => &["#", "Source", "Target"],
                            _ => &["#", "Source", "Relation", "Target"],
                        };
                        let body: Vec<Vec<String>> = rows
                            .iter()
                            .enumerate()
                            .map(|(i, r)| {
                                let mut line = vec![format!("{}", offset + i + 1)];
                                line.extend(r.fields());
                                line
                            })
                            .collect();
                        println!("{}", crate::utils::table::render(headers, &body));
                    }
                    0
                }
            }
        }
    }
}

fn on_off(flag: Option<OnOffArg>, configured: Option<bool>, default: bool) -> bool {
    match flag {
        Some(v) => matches!(v, OnOffArg::On),
        None => configured.unwrap_or(default),
    }
}

fn load_config(explicit: Option<&Path>, manifests: &Path) -> Option<Config> {
    match explicit {
        Some(p) => {
            let cfg = config::load_config_at(p);
            if cfg.is_none() {
                tracing::warn!(path = %p.display(), "config file not loaded, using defaults");
            }
            cfg
        }
        None => config::load_config_near(manifests),
    }
}

fn load_graph(source: &SourceArgs, cfg: Option<&Config>) -> Result<ResourceGraph, ExplorerError> {
    let mut graph = ResourceGraph::build_from_directory_opts(&source.manifests, source.no_ignore)?;
    let excluded: Vec<String> = if source.exclude_relations.is_empty() {
        cfg.and_then(|c| c.discovery.as_ref())
            .and_then(|d| d.exclude.clone())
            .unwrap_or_default()
    } else {
        source.exclude_relations.clone()
    };
    let summary = discover(&mut graph, &excluded);
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        discovered = summary.edges_added(),
        "graph ready"
    );
    Ok(graph)
}

fn query_library(cfg: Option<&Config>) -> QueryLibrary {
    match cfg.and_then(|c| c.query.as_ref()).and_then(|q| q.library_dir.as_ref()) {
        Some(dir) => QueryLibrary::with_dir(dir),
        None => QueryLibrary::builtin(),
    }
}

fn aggregate_defaults(cfg: Option<&Config>) -> AggregateDefaults {
    let mut defaults = AggregateDefaults::default();
    if let Some(agg) = cfg.and_then(|c| c.aggregate.as_ref()) {
        if let Some(v) = &agg.default_cpu {
            defaults.cpu.clone_from(v);
        }
        if let Some(v) = &agg.default_memory {
            defaults.memory.clone_from(v);
        }
        if let Some(v) = &agg.memory_unit {
            defaults.unit.clone_from(v);
        }
    }
    defaults
}

fn resolve_format(flag: Option<OutputFormat>, cfg: Option<&Config>) -> OutputFormat {
    if let Some(f) = flag {
        return f;
    }
    match cfg.and_then(|c| c.query.as_ref()).and_then(|q| q.default_format.as_deref()) {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Text,
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            0
        }
        Err(e) => {
            eprintln!("JSON encode error: {e}");
            1
        }
    }
}
