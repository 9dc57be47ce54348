//! Environment-driven configuration.
//!
//! # Configuration Sources
//!
//! - `TOOLPIN_HOME`: install home (default `~/.toolpin`)
//! - `TOOLPIN_MANIFEST`: path to the project manifest, skips the upward search
//! - `TOOLPIN_REGISTRY`: path to the tool registry, skips the upward search
//! - `NO_TOOLPIN_INSTALL`: when present (any value) installs are skipped
//!
//! The environment is passed in explicitly so callers (and tests) can supply
//! their own instead of the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{Result, ToolpinError};

/// Environment variables as seen by one invocation
pub type Env = HashMap<String, String>;

pub const MANIFEST_FILE_NAME: &str = "toolpin.json";
pub const REGISTRY_FILE_NAME: &str = "toolpin-registry.json";

pub const HOME_VAR: &str = "TOOLPIN_HOME";
pub const MANIFEST_VAR: &str = "TOOLPIN_MANIFEST";
pub const REGISTRY_VAR: &str = "TOOLPIN_REGISTRY";
pub const SKIP_INSTALL_VAR: &str = "NO_TOOLPIN_INSTALL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root directory holding `<name>/<version>/<executable>`
    pub install_home: PathBuf,
    pub manifest_path: Option<PathBuf>,
    pub registry_path: Option<PathBuf>,
    pub skip_install: bool,
}

impl Config {
    /// Build configuration from an environment, resolving relative paths against `cwd`
    pub fn from_env(cwd: &Path, env: &Env) -> Self {
        let get = |var: &str| env.get(var).filter(|s| !s.is_empty()).map(|s| cwd.join(s));

        Self {
            install_home: get(HOME_VAR).unwrap_or_else(default_install_home),
            manifest_path: get(MANIFEST_VAR),
            registry_path: get(REGISTRY_VAR),
            skip_install: env.contains_key(SKIP_INSTALL_VAR),
        }
    }

    /// Locate the project manifest, searching upward from `start`
    pub fn find_manifest(&self, start: &Path) -> Result<PathBuf> {
        if let Some(path) = &self.manifest_path {
            return Ok(path.clone());
        }

        find_upward(start, MANIFEST_FILE_NAME).ok_or_else(|| ToolpinError::ManifestNotFound {
            file_name: MANIFEST_FILE_NAME.to_string(),
            start: start.to_path_buf(),
        })
    }

    /// Locate the tool registry, searching upward from `start`
    pub fn find_registry(&self, start: &Path) -> Result<PathBuf> {
        if let Some(path) = &self.registry_path {
            return Ok(path.clone());
        }

        find_upward(start, REGISTRY_FILE_NAME).ok_or_else(|| ToolpinError::RegistryNotFound {
            file_name: REGISTRY_FILE_NAME.to_string(),
        })
    }
}

fn default_install_home() -> PathBuf {
    if let Some(base_dirs) = directories::BaseDirs::new() {
        base_dirs.home_dir().join(".toolpin")
    } else {
        PathBuf::from(".toolpin")
    }
}

/// Find `file_name` in `start` or the closest parent directory containing it
pub fn find_upward(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}
