//! Filesystem loader producing namespace trees.
//!
//! [`load_tree`] walks a directory: subdirectories become nested namespaces,
//! files with a recognized extension are offered to a [`Resolve`]
//! implementation under their file stem. [`Handlers`] is the stock resolver:
//! it pairs a per-file manifest with a function from an in-process table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::function::Function;
use crate::registry::{Namespace, Node};
use crate::{Error, Result};

/// Turns a file found by the loader into a function.
pub trait Resolve {
    /// Returns `Ok(None)` to skip the file.
    fn resolve(&self, file: &Path, name: &str) -> Result<Option<Function>>;
}

/// Build a namespace tree from the directory at `root`.
///
/// Entries are visited in name order. Files and symlinks whose extension is
/// in `extensions` are resolved; everything else is ignored.
pub fn load_tree(root: &Path, extensions: &[String], resolver: &dyn Resolve) -> Result<Namespace> {
    let mut entries = fs::read_dir(root)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut tree = Namespace::new();
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            tree.insert(name, Node::Namespace(load_tree(&path, extensions, resolver)?));
        } else if file_type.is_file() || file_type.is_symlink() {
            let recognized = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x == e));
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !recognized {
                continue;
            }
            match resolver.resolve(&path, stem)? {
                Some(f) => tree.insert(stem, Node::Function(f)),
                None => debug!("Skipped {}: nothing to register", path.display()),
            }
        }
    }
    Ok(tree)
}

/// Metadata declared next to a function on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Name in the handler table; defaults to the file stem.
    pub handler: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub param_types: Option<Vec<Value>>,
    pub return_type: Option<Value>,
    pub http_mapper: Option<Vec<String>>,
}

impl Manifest {
    /// Whether [`read`](Self::read) understands the format of `path`.
    pub fn supports(path: &Path) -> bool {
        matches!(path.extension().and_then(|e| e.to_str()), Some("json" | "toml"))
    }

    /// Parse a JSON or TOML manifest, chosen by the file extension.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let manifest_error = |message: String| Error::Manifest {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))
            }
            Some("toml") => toml::from_str(&content).map_err(|e| manifest_error(e.to_string())),
            other => Err(manifest_error(format!(
                "unsupported manifest format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Apply the declared metadata to `f`.
    pub fn apply(self, f: &mut Function) {
        if let Some(title) = self.title {
            f.set_title(title);
        }
        if let Some(description) = self.description {
            f.set_description(description);
        }
        if let Some(types) = self.param_types {
            f.set_param_types(types);
        }
        if let Some(return_type) = self.return_type {
            f.set_return_type(return_type);
        }
        if let Some(mapper) = self.http_mapper {
            f.set_http_mapper(mapper);
        }
    }
}

/// Table of named functions resolved through on-disk manifests.
#[derive(Debug, Clone, Default)]
pub struct Handlers {
    table: HashMap<String, Function>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function under its own name.
    pub fn with(mut self, f: Function) -> Self {
        self.insert(f);
        self
    }

    pub fn insert(&mut self, f: Function) -> &mut Self {
        self.table.insert(f.name().to_string(), f);
        self
    }
}

impl Resolve for Handlers {
    fn resolve(&self, file: &Path, name: &str) -> Result<Option<Function>> {
        if !Manifest::supports(file) {
            debug!("No manifest reader for {}", file.display());
            return Ok(None);
        }
        let manifest = Manifest::read(file)?;
        let handler = manifest.handler.as_deref().unwrap_or(name);
        let Some(f) = self.table.get(handler) else {
            debug!("No handler named {handler} for {}", file.display());
            return Ok(None);
        };
        let mut f = f.clone();
        manifest.apply(&mut f);
        Ok(Some(f))
    }
}
