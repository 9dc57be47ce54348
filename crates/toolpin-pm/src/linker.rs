//! Placement of installed tools into the project's bin directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::tool::Tool;
use crate::{Result, ToolpinError};

/// Links tool executables into a bin directory
pub struct Linker {
    bin_dir: PathBuf,
}

impl Linker {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Path of the link for `tool`
    pub fn link_path(&self, tool: &Tool) -> PathBuf {
        if cfg!(windows) {
            self.bin_dir.join(format!("{}.cmd", tool.name))
        } else {
            self.bin_dir.join(&tool.name)
        }
    }

    /// Point the link at `tool`.
    ///
    /// Returns a message when something changed, `None` when the link was
    /// already correct.
    pub async fn link(&self, tool: &Tool) -> Result<Option<String>> {
        let link = self.link_path(tool);

        if self.points_at(&link, tool).await {
            return Ok(None);
        }

        match tokio::fs::remove_file(&link).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(ToolpinError::Link { path: link, source }),
        }

        create_link(&tool.absolute_path, &link)
            .await
            .map_err(|source| ToolpinError::Link {
                path: link.clone(),
                source,
            })?;

        Ok(Some(format!(
            "{} link created: {} -> {}",
            tool.label(),
            link.display(),
            tool.absolute_path.display()
        )))
    }

    /// Remove the link if, and only if, it points at `tool`
    pub async fn unlink(&self, tool: &Tool) -> Result<Option<String>> {
        let link = self.link_path(tool);

        if !self.points_at(&link, tool).await {
            return Ok(None);
        }

        match tokio::fs::remove_file(&link).await {
            Ok(()) => Ok(Some(format!("{} link removed: {}", tool.label(), link.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ToolpinError::Link { path: link, source }),
        }
    }

    #[cfg(unix)]
    async fn points_at(&self, link: &Path, tool: &Tool) -> bool {
        match tokio::fs::read_link(link).await {
            Ok(target) => target == tool.absolute_path,
            Err(_) => false,
        }
    }

    #[cfg(windows)]
    async fn points_at(&self, link: &Path, tool: &Tool) -> bool {
        match tokio::fs::read_to_string(link).await {
            Ok(content) => content == shim(&tool.absolute_path),
            Err(_) => false,
        }
    }
}

#[cfg(unix)]
async fn create_link(source: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(source, link).await
}

/// Windows has no unprivileged symlinks; use a `.cmd` shim instead
#[cfg(windows)]
async fn create_link(source: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::write(link, shim(source)).await
}

#[cfg(windows)]
fn shim(source: &Path) -> String {
    format!("@ECHO OFF\r\n\"{}\" %*\r\n", source.display())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tool::{Asset, AssetKind, OsName};
    use tempfile::TempDir;

    fn tool(home: &Path, version: &str) -> Tool {
        let asset = Asset {
            kind: AssetKind::Gz,
            url: "https://example.com/elm.gz".to_string(),
            hash: "00".to_string(),
        };
        Tool::new("elm", version, asset, home, OsName::Linux)
    }

    #[test]
    fn test_link_path() {
        let linker = Linker::new("/app/node_modules/.bin");
        let tool = tool(Path::new("/home/u/.toolpin"), "0.19.1");
        assert_eq!(linker.bin_dir(), Path::new("/app/node_modules/.bin"));
        assert_eq!(linker.link_path(&tool), PathBuf::from("/app/node_modules/.bin/elm"));
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let bin_dir = temp_dir.path().join("bin");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let linker = Linker::new(&bin_dir);
        let tool = tool(&temp_dir.path().join("home"), "0.19.1");

        let message = linker.link(&tool).await.unwrap();
        assert!(message.unwrap().starts_with("elm 0.19.1 link created: "));
        assert_eq!(std::fs::read_link(bin_dir.join("elm")).unwrap(), tool.absolute_path);

        assert_eq!(linker.link(&tool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_link_replaces_other_version() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        let linker = Linker::new(temp_dir.path());
        let old = tool(&home, "0.19.0");
        let new = tool(&home, "0.19.1");

        linker.link(&old).await.unwrap();
        assert!(linker.link(&new).await.unwrap().is_some());
        assert_eq!(std::fs::read_link(temp_dir.path().join("elm")).unwrap(), new.absolute_path);
    }

    #[tokio::test]
    async fn test_unlink_only_removes_own_link() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        let linker = Linker::new(temp_dir.path());
        let old = tool(&home, "0.19.0");
        let new = tool(&home, "0.19.1");

        assert_eq!(linker.unlink(&new).await.unwrap(), None);

        linker.link(&new).await.unwrap();
        assert_eq!(linker.unlink(&old).await.unwrap(), None);
        assert!(temp_dir.path().join("elm").symlink_metadata().is_ok());

        let message = linker.unlink(&new).await.unwrap().unwrap();
        assert!(message.starts_with("elm 0.19.1 link removed: "));
        assert!(temp_dir.path().join("elm").symlink_metadata().is_err());
    }
}
