//! Project manifest (`toolpin.json`).
//!
//! ```json
//! {
//!   "tools": { "elm": "0.19.1", "elm-format": "0.8.5" },
//!   "bin-dir": "node_modules/.bin"
//! }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::registry::Registry;
use crate::tool::{OsName, Tool};
use crate::{Result, ToolpinError};

pub const DEFAULT_BIN_DIR: &str = "node_modules/.bin";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    tools: Option<IndexMap<String, String>>,
    #[serde(default, rename = "bin-dir")]
    bin_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    /// Pinned versions by tool name; `None` when the field is absent
    pub tools: Option<IndexMap<String, String>>,
    /// Absolute directory receiving tool links
    pub bin_dir: PathBuf,
}

/// Manifest tools split by whether they are already on disk
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    pub existing: Vec<Tool>,
    pub missing: Vec<Tool>,
}

impl ToolSet {
    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.missing.is_empty()
    }

    /// Whether a tool of this name is pinned
    pub fn contains(&self, name: &str) -> bool {
        self.existing.iter().chain(&self.missing).any(|tool| tool.name == name)
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ToolpinError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(path, &contents)
    }

    /// Parse manifest contents; relative paths are resolved against the manifest's directory
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let raw: RawManifest =
            serde_json::from_str(contents).map_err(|e| ToolpinError::InvalidManifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let bin_dir = dir.join(raw.bin_dir.as_deref().unwrap_or(DEFAULT_BIN_DIR));

        Ok(Self {
            path: path.to_path_buf(),
            tools: raw.tools,
            bin_dir,
        })
    }

    /// Resolve every pinned tool against the registry.
    ///
    /// Returns `None` when the manifest has no `tools` field. All invalid
    /// entries are reported together.
    pub fn resolve_tools(
        &self,
        registry: &Registry,
        os: OsName,
        install_home: &Path,
    ) -> Result<Option<ToolSet>> {
        let Some(tools) = &self.tools else {
            return Ok(None);
        };

        let mut set = ToolSet::default();
        let mut errors = Vec::new();

        for (name, version) in tools {
            match registry.resolve(name, version, os, install_home) {
                Ok(tool) => {
                    let path = &tool.absolute_path;
                    if path.is_file() {
                        set.existing.push(tool);
                    } else if path.exists() {
                        errors.push(format!("{}: exists but is not a file: {}", name, path.display()));
                    } else {
                        set.missing.push(tool);
                    }
                }
                Err(e) => errors.push(format!("{}: {}", name, e)),
            }
        }

        if !errors.is_empty() {
            return Err(ToolpinError::InvalidManifest {
                path: self.path.clone(),
                message: format!("\"tools\" field has errors:\n{}", errors.join("\n")),
            });
        }

        Ok(Some(set))
    }
}
