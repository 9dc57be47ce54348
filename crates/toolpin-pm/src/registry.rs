//! Registry of known tools.
//!
//! The registry is a JSON document mapping tool name to version to OS to
//! asset:
//!
//! ```json
//! {
//!   "elm": {
//!     "0.19.1": {
//!       "linux": { "type": "gz", "url": "https://...", "hash": "e44af5..." }
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

use crate::tool::{Asset, OsName, Tool};
use crate::{Result, ToolpinError};

type Versions = IndexMap<String, IndexMap<String, Asset>>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    tools: IndexMap<String, Versions>,
}

impl Registry {
    /// Load and validate a registry file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ToolpinError::InvalidRegistry {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::parse(path, &contents)
    }

    /// Parse a registry document; `path` is only used in error messages
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let invalid = |message: String| ToolpinError::InvalidRegistry {
            path: path.to_path_buf(),
            message,
        };

        let registry: Registry =
            serde_json::from_str(contents).map_err(|e| invalid(e.to_string()))?;

        for (name, versions) in &registry.tools {
            for (version, assets) in versions {
                for (os, asset) in assets {
                    if !is_sha256_hex(&asset.hash) {
                        return Err(invalid(format!(
                            "{} {} ({}): hash must be 64 hex characters",
                            name, version, os
                        )));
                    }
                }
            }
        }

        Ok(registry)
    }

    /// Names of all known tools, in registry order
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Resolve a pinned tool for the given OS
    pub fn resolve(&self, name: &str, version: &str, os: OsName, install_home: &Path) -> Result<Tool> {
        let versions = self.tools.get(name).ok_or_else(|| ToolpinError::UnknownTool {
            name: name.to_string(),
        })?;

        let assets = versions.get(version).ok_or_else(|| ToolpinError::UnknownVersion {
            name: name.to_string(),
            version: version.to_string(),
            known: versions.keys().cloned().collect::<Vec<_>>().join(", "),
        })?;

        let asset = assets.get(os.as_str()).ok_or_else(|| ToolpinError::NoAssetForPlatform {
            name: name.to_string(),
            version: version.to_string(),
            os: os.to_string(),
        })?;

        Ok(Tool::new(name, version, asset.clone(), install_home, os))
    }

    /// Every version of `name` that has an asset for the given OS
    pub fn all_versions(&self, name: &str, os: OsName, install_home: &Path) -> Vec<Tool> {
        let Some(versions) = self.tools.get(name) else {
            return Vec::new();
        };

        versions
            .iter()
            .filter_map(|(version, assets)| {
                assets
                    .get(os.as_str())
                    .map(|asset| Tool::new(name, version, asset.clone(), install_home, os))
            })
            .collect()
    }
}

fn is_sha256_hex(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::AssetKind;
    use std::path::PathBuf;

    const HASH: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn sample() -> Registry {
        let json = format!(
            r#"{{
                "elm": {{
                    "0.19.0": {{ "linux": {{ "type": "gz", "url": "https://e.com/elm-0.19.0.gz", "hash": "{h}" }} }},
                    "0.19.1": {{
                        "linux": {{ "type": "gz", "url": "https://e.com/elm.gz", "hash": "{h}" }},
                        "windows": {{ "type": "zip", "url": "https://e.com/elm.zip", "hash": "{h}" }}
                    }}
                }},
                "elm-format": {{
                    "0.8.5": {{ "mac": {{ "type": "tgz", "url": "https://e.com/ef.tgz", "hash": "{h}" }} }}
                }}
            }}"#,
            h = HASH
        );
        Registry::parse(Path::new("registry.json"), &json).unwrap()
    }

    #[test]
    fn test_resolve() {
        let registry = sample();
        let tool = registry
            .resolve("elm", "0.19.1", OsName::Windows, Path::new("/home"))
            .unwrap();

        assert_eq!(tool.asset.kind, AssetKind::Zip);
        assert_eq!(tool.absolute_path, PathBuf::from("/home/elm/0.19.1/elm.exe"));
    }

    #[test]
    fn test_resolve_errors() {
        let registry = sample();
        let home = Path::new("/home");

        assert!(matches!(
            registry.resolve("elmo", "1.0.0", OsName::Linux, home),
            Err(ToolpinError::UnknownTool { .. })
        ));

        match registry.resolve("elm", "0.18.0", OsName::Linux, home) {
            Err(ToolpinError::UnknownVersion { known, .. }) => assert_eq!(known, "0.19.0, 0.19.1"),
            other => panic!("Expected UnknownVersion, got {:?}", other),
        }

        assert!(matches!(
            registry.resolve("elm-format", "0.8.5", OsName::Linux, home),
            Err(ToolpinError::NoAssetForPlatform { .. })
        ));
    }

    #[test]
    fn test_all_versions_filters_by_os() {
        let registry = sample();
        let tools = registry.all_versions("elm", OsName::Linux, Path::new("/home"));
        assert_eq!(tools.len(), 2);

        let tools = registry.all_versions("elm", OsName::Windows, Path::new("/home"));
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].version, "0.19.1");

        assert!(registry.all_versions("nope", OsName::Linux, Path::new("/home")).is_empty());
        assert_eq!(registry.tool_names().collect::<Vec<_>>(), vec!["elm", "elm-format"]);
    }

    #[test]
    fn test_rejects_bad_hash() {
        let json = r#"{"elm": {"1": {"linux": {"type": "gz", "url": "u", "hash": "xyz"}}}}"#;
        let result = Registry::parse(Path::new("registry.json"), json);
        assert!(matches!(result, Err(ToolpinError::InvalidRegistry { .. })));
    }
}
