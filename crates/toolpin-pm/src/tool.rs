//! Tool descriptors.
//!
//! A [`Tool`] is built fresh for every install from the manifest and the
//! registry and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Result, ToolpinError};

/// Archive format of a downloadable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A single gzip-compressed executable
    Gz,
    /// A gzip-compressed tarball holding the executable
    Tgz,
    /// A zip archive holding the executable
    Zip,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Gz => "gz",
            AssetKind::Tgz => "tgz",
            AssetKind::Zip => "zip",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The downloadable artifact for one tool version on one operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub url: String,
    /// Expected SHA-256 of the downloaded bytes, hex encoded
    pub hash: String,
}

/// Operating systems the registry carries assets for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Linux,
    Mac,
    Windows,
}

impl OsName {
    /// Detect the operating system this binary runs on
    pub fn current() -> Result<Self> {
        Self::from_consts(std::env::consts::OS)
    }

    pub fn from_consts(os: &str) -> Result<Self> {
        match os {
            "linux" => Ok(OsName::Linux),
            "macos" => Ok(OsName::Mac),
            "windows" => Ok(OsName::Windows),
            other => Err(ToolpinError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Key used for this OS in the registry
    pub fn as_str(&self) -> &'static str {
        match self {
            OsName::Linux => "linux",
            OsName::Mac => "mac",
            OsName::Windows => "windows",
        }
    }

    /// File name of an installed tool executable
    pub fn executable_name(&self, tool_name: &str) -> String {
        match self {
            OsName::Windows => format!("{}.exe", tool_name),
            _ => tool_name.to_string(),
        }
    }
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pinned tool, fully resolved to an asset and an install location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: String,
    pub version: String,
    pub asset: Asset,
    pub absolute_path: PathBuf,
}

impl Tool {
    /// Build a tool that installs under `<install_home>/<name>/<version>/`
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        asset: Asset,
        install_home: &Path,
        os: OsName,
    ) -> Self {
        let name = name.into();
        let version = version.into();
        let absolute_path = install_home
            .join(&name)
            .join(&version)
            .join(os.executable_name(&name));

        Self {
            name,
            version,
            asset,
            absolute_path,
        }
    }

    /// Name and version, e.g. `elm 0.19.1`
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> Asset {
        Asset {
            kind: AssetKind::Gz,
            url: "https://example.com/elm.gz".to_string(),
            hash: "abc".to_string(),
        }
    }

    #[test]
    fn test_asset_kind_from_json() {
        let asset: Asset = serde_json::from_str(
            r#"{"type": "tgz", "url": "https://example.com/x.tgz", "hash": "00"}"#,
        )
        .unwrap();
        assert_eq!(asset.kind, AssetKind::Tgz);
        assert_eq!(asset.kind.to_string(), "tgz");
    }

    #[test]
    fn test_unknown_asset_kind_rejected() {
        let result: std::result::Result<Asset, _> = serde_json::from_str(
            r#"{"type": "rar", "url": "https://example.com/x.rar", "hash": "00"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_os_name_from_consts() {
        assert_eq!(OsName::from_consts("linux").unwrap(), OsName::Linux);
        assert_eq!(OsName::from_consts("macos").unwrap(), OsName::Mac);
        assert_eq!(OsName::from_consts("windows").unwrap(), OsName::Windows);
        assert!(OsName::from_consts("haiku").is_err());
    }

    #[test]
    fn test_tool_path_layout() {
        let tool = Tool::new("elm", "0.19.1", asset(), Path::new("/home/u/.toolpin"), OsName::Linux);
        assert_eq!(tool.absolute_path, PathBuf::from("/home/u/.toolpin/elm/0.19.1/elm"));
        assert_eq!(tool.label(), "elm 0.19.1");

        let tool = Tool::new("elm", "0.19.1", asset(), Path::new("/toolpin"), OsName::Windows);
        assert!(tool.absolute_path.ends_with("elm/0.19.1/elm.exe"));
    }
}
