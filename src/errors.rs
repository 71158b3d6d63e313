use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No manifest found under {path}")]
    NoManifests { path: PathBuf },
    #[error("YAML parse error in {file}: {source}")]
    Parse { file: PathBuf, source: serde_yaml::Error },
    #[error("IO error reading {file}: {source}")]
    Io { file: PathBuf, source: std::io::Error },
}

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Invalid manifest: {0}")]
    Validation(String),

    #[error("Query `{query}` argument mismatch (missing: [{}], unexpected: [{}])", missing.join(", "), unexpected.join(", "))]
    Argument { query: String, missing: Vec<String>, unexpected: Vec<String> },

    #[error("Invalid value `{value}` for argument `{name}`")]
    InvalidValue { name: String, value: String },

    #[error("Unexpected query shape: {0}")]
    QueryShape(String),

    #[error("Unknown {what}: {name}")]
    Lookup { what: &'static str, name: String },

    #[error("Invalid quantity or unit: {0}")]
    Unit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Visualization error: {0}")]
    Visualization(String),
}

impl ExplorerError {
    pub(crate) fn lookup(what: &'static str, name: impl Into<String>) -> Self {
        Self::Lookup { what, name: name.into() }
    }
}
