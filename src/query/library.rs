//! Named query descriptors.
//!
//! Built-in descriptors are compiled into the binary. A library may also point at a directory
//! of `<name>.json` files, which is searched first so users can add or override queries.
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::QueryDescriptor;
use crate::errors::ExplorerError;

const BUILTIN: &[(&str, &str)] = &[
    ("all_pods", include_str!("library/all_pods.json")),
    ("all_services", include_str!("library/all_services.json")),
    ("all_ingresses", include_str!("library/all_ingresses.json")),
    ("all_applications", include_str!("library/all_applications.json")),
    ("all_container_images", include_str!("library/all_container_images.json")),
    ("all_hosts", include_str!("library/all_hosts.json")),
    ("all_namespaces", include_str!("library/all_namespaces.json")),
    ("all_configmaps", include_str!("library/all_configmaps.json")),
    ("all_secrets", include_str!("library/all_secrets.json")),
    ("service_pods", include_str!("library/service_pods.json")),
    ("service_routes", include_str!("library/service_routes.json")),
    ("application_members", include_str!("library/application_members.json")),
    ("pods_running_image", include_str!("library/pods_running_image.json")),
    ("namespace_members", include_str!("library/namespace_members.json")),
    ("images_in_namespace", include_str!("library/images_in_namespace.json")),
    ("ingress_hosts", include_str!("library/ingress_hosts.json")),
    ("labeled_with", include_str!("library/labeled_with.json")),
];

#[derive(Debug, Clone, Default)]
pub struct QueryLibrary {
    dir: Option<PathBuf>,
}

impl QueryLibrary {
    /// Only the built-in descriptors.
    #[must_use]
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    /// Built-in descriptors, overridable by `<dir>/<name>.json`.
    #[must_use]
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: Some(dir.as_ref().to_path_buf()) }
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// All known query names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN.iter().map(|(n, _)| (*n).to_string()).collect();
        if let Some(entries) = self.dir.as_ref().and_then(|d| std::fs::read_dir(d).ok()) {
            names.extend(entries.flatten().map(|e| e.path()).filter_map(|p| {
                if p.extension().and_then(|e| e.to_str()) == Some("json") {
                    p.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                } else {
                    None
                }
            }));
        }
        names.sort();
        names.dedup();
        names
    }

    /// Raw descriptor text for `name`.
    ///
    /// # Errors
    /// Returns `ExplorerError::Lookup` for unknown or invalid names and `ExplorerError::Io` if
    /// a user descriptor exists but cannot be read.
    pub fn source(&self, name: &str) -> Result<Cow<'static, str>, ExplorerError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ExplorerError::lookup("query", name));
        }
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{name}.json"));
            if path.is_file() {
                tracing::debug!(query = name, path = %path.display(), "using query from library directory");
                return Ok(Cow::Owned(std::fs::read_to_string(&path)?));
            }
        }
        BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| Cow::Borrowed(*text))
            .ok_or_else(|| ExplorerError::lookup("query", name))
    }

    /// Parsed descriptor for `name`.
    ///
    /// # Errors
    /// Returns `ExplorerError::Lookup` for unknown names and `ExplorerError::QueryShape` for
    /// descriptors that do not parse.
    pub fn load(&self, name: &str) -> Result<QueryDescriptor, ExplorerError> {
        QueryDescriptor::from_json(name, &self.source(name)?)
    }
}
