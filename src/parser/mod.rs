use crate::errors::LoadError;
use crate::graph::Record;
use crate::utils::file_walker;
use serde::Deserialize;
use std::path::Path;

/// Turns YAML text into manifest documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestParser;

impl ManifestParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse every YAML document in `content`. Empty documents are dropped; documents that
    /// are not mappings are reported and skipped.
    ///
    /// # Errors
    /// Returns `LoadError::Parse` if the text is not valid YAML.
    pub fn parse_str(&self, content: &str, origin: &Path) -> Result<Vec<Record>, LoadError> {
        let mut out = Vec::new();
        for (i, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|source| LoadError::Parse { file: origin.to_path_buf(), source })?;
            match Record::from(value) {
                Record::Null => {}
                doc @ Record::Map(_) => out.push(doc),
                _ => {
                    tracing::warn!(
                        file = %origin.display(),
                        document = i,
                        "skipping YAML document that is not a mapping"
                    );
                }
            }
        }
        Ok(out)
    }

    /// Read and parse one file.
    ///
    /// # Errors
    /// Returns `LoadError::Io` if the file cannot be read and `LoadError::Parse` on invalid YAML.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<Record>, LoadError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| LoadError::Io { file: path.to_path_buf(), source })?;
        self.parse_str(&content, path)
    }

    /// Parse all manifest files under `root` in path order. The first failing file aborts the
    /// load after being logged.
    ///
    /// # Errors
    /// Returns the `LoadError` of the first file that cannot be read or parsed.
    pub fn load_directory(&self, root: &Path, no_ignore: bool) -> Result<Vec<Record>, LoadError> {
        let files = file_walker::manifest_files_with_options(root, no_ignore);
        tracing::debug!(root = %root.display(), files = files.len(), "discovered manifest files");
        let mut documents = Vec::new();
        for file in files {
            match self.parse_file(&file) {
                Ok(docs) => documents.extend(docs),
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "failed to load manifest file");
                    return Err(e);
                }
            }
        }
        Ok(documents)
    }
}
