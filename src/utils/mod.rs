// Small helpers shared by the CLI and the library
pub mod units;

pub mod table {
    // Helper to render a separator line
    fn sep(widths: &[usize]) -> String {
        let mut s = String::from("+");
        for w in widths {
            s.push_str(&"-".repeat(w + 2));
            s.push('+');
        }
        s
    }

    // Helper to render a row line
    fn line(cells: &[String], widths: &[usize]) -> String {
        let mut s = String::from("|");
        for (cell, w) in cells.iter().zip(widths) {
            s.push(' ');
            s.push_str(cell);
            let len = cell.chars().count();
            if len < *w {
                s.push_str(&" ".repeat(w - len));
            }
            s.push_str(" |");
        }
        s
    }

    /// Render an ASCII table given headers and rows. Missing cells render empty.
    #[must_use]
    pub fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
        let cols = headers.len();
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (c, w) in widths.iter_mut().enumerate().take(cols) {
                *w = (*w).max(row.get(c).map_or(0, |s| s.chars().count()));
            }
        }

        let mut out = String::new();
        out.push_str(&sep(&widths));
        out.push('\n');
        let header_cells: Vec<String> = headers.iter().map(|s| (*s).to_string()).collect();
        out.push_str(&line(&header_cells, &widths));
        out.push('\n');
        out.push_str(&sep(&widths));
        out.push('\n');
        for row in rows {
            let cells: Vec<String> = (0..cols).map(|i| row.get(i).cloned().unwrap_or_default()).collect();
            out.push_str(&line(&cells, &widths));
            out.push('\n');
        }
        out.push_str(&sep(&widths));
        out
    }
}

pub mod config {
    use serde::Deserialize;
    use std::fs;
    use std::path::{Path, PathBuf};

    pub const CONFIG_FILE_NAME: &str = "kube-relations-explorer.toml";

    #[derive(Debug, Clone, Deserialize, Default)]
    pub struct DiscoveryConfig {
        /// Relation rules to skip by default.
        pub exclude: Option<Vec<String>>,
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    pub struct DotConfig {
        pub clusters: Option<bool>,
        pub legend: Option<bool>,
        pub theme: Option<String>,   // "light" | "dark"
        pub rankdir: Option<String>, // "LR" | "TB"
        pub splines: Option<String>, // "curved" | "ortho" | "polyline"
        pub rounded: Option<bool>,
        /// Node kinds hidden from rendered output.
        pub exclude_types: Option<Vec<String>>,
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    pub struct SvgConfig {
        pub interactive: Option<bool>,
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    pub struct QueryConfig {
        pub default_format: Option<String>, // "text" | "json"
        /// Directory with `<name>.json` query descriptors, searched before the built-in ones.
        pub library_dir: Option<PathBuf>,
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    pub struct AggregateConfig {
        pub default_cpu: Option<String>,
        pub default_memory: Option<String>,
        pub memory_unit: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    pub struct Config {
        pub discovery: Option<DiscoveryConfig>,
        pub dot: Option<DotConfig>,
        pub svg: Option<SvgConfig>,
        pub query: Option<QueryConfig>,
        pub aggregate: Option<AggregateConfig>,
    }

    /// Load a config file. Unreadable or invalid files are logged and treated as absent.
    #[must_use]
    pub fn load_config_at(path: &Path) -> Option<Config> {
        let data = fs::read_to_string(path).ok()?;
        match toml::from_str::<Config>(&data) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    /// Look for the default config file name inside `root`.
    #[must_use]
    pub fn load_config_near(root: &Path) -> Option<Config> {
        let p = root.join(CONFIG_FILE_NAME);
        if p.exists() {
            load_config_at(&p)
        } else {
            None
        }
    }
}

pub mod file_walker {
    use std::path::{Path, PathBuf};

    fn is_manifest(path: &Path) -> bool {
        matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
    }

    /// Discover manifest files (`*.yaml`, `*.yml`) under `root`, sorted by path, with an
    /// option to bypass `.gitignore`/`.ignore` rules.
    #[must_use]
    pub fn manifest_files_with_options(root: &Path, no_ignore: bool) -> Vec<PathBuf> {
        let mut walker = ignore::WalkBuilder::new(root);
        // Global git excludes stay off for determinism
        walker
            .follow_links(false)
            .hidden(false)
            .git_ignore(!no_ignore)
            .git_global(false)
            .git_exclude(false)
            .ignore(!no_ignore)
            .require_git(false)
            .parents(true);
        let mut out: Vec<PathBuf> = walker
            .build()
            .flatten()
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|p| is_manifest(p))
            .collect();
        out.sort();
        out
    }

    /// Discover manifest files honoring ignore rules.
    #[must_use]
    pub fn manifest_files(root: &Path) -> Vec<PathBuf> {
        manifest_files_with_options(root, false)
    }
}
