//! Streaming extraction of downloaded assets.
//!
//! An [`Extractor`] receives the same chunks as the hasher and produces a
//! single executable at the target path:
//!
//! - `gz`: decompressed straight into the target, then made executable
//! - `tgz`: piped into `tar zxf -`, which writes the named entry
//! - `zip`: staged to `<target>.zip`, extracted once complete, temp removed

mod gz;
mod tar;
mod zip;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::{CleanupError, ExitReason};
use crate::tool::AssetKind;
use self::gz::GzExtractor;
use self::tar::TarExtractor;
use self::zip::ZipExtractor;

const PATH_VARIABLE: &str = if cfg!(windows) { "%PATH%" } else { "$PATH" };

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decompress into {}: {source}", path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} must be installed on your system and be in {}:\n{source}", PATH_VARIABLE)]
    ArchiverMissing {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start {program}: {source}")]
    ArchiverSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {reason}:\n{stderr}")]
    ArchiverExit {
        program: String,
        reason: ExitReason,
        stderr: String,
    },

    #[error("Failed to read zip archive {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: ::zip::result::ZipError,
    },

    #[error("{name} was not found in the archive")]
    EntryNotFound { name: String },

    #[error(transparent)]
    Cleanup(CleanupError),

    #[error("{error}\n\n{cleanup}")]
    CleanupAfter {
        error: Box<ExtractError>,
        cleanup: CleanupError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Archive program used for `tgz` assets
    pub tar: OsString,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tar: OsString::from("tar"),
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tar(mut self, tar: impl Into<OsString>) -> Self {
        self.tar = tar.into();
        self
    }
}

enum Inner {
    Gz(GzExtractor),
    Tgz(TarExtractor),
    Zip(ZipExtractor),
}

/// A live, cancelable sink writing one executable
pub struct Extractor {
    inner: Inner,
}

impl Extractor {
    /// Create the extractor for `kind`, writing to `target`.
    ///
    /// The target (or the staging file) is created right away; for `tgz` the
    /// archive program is started.
    pub async fn new(kind: AssetKind, target: &Path, config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let inner = match kind {
            AssetKind::Gz => Inner::Gz(GzExtractor::new(target).await?),
            AssetKind::Tgz => Inner::Tgz(TarExtractor::spawn(&config.tar, target)?),
            AssetKind::Zip => Inner::Zip(ZipExtractor::new(target).await?),
        };

        Ok(Self { inner })
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), ExtractError> {
        match &mut self.inner {
            Inner::Gz(gz) => gz.write(chunk).await,
            Inner::Tgz(tar) => tar.write(chunk).await,
            Inner::Zip(zip) => zip.write(chunk).await,
        }
    }

    /// Signal end of input and wait for the executable to be complete
    pub async fn end(&mut self) -> Result<(), ExtractError> {
        match &mut self.inner {
            Inner::Gz(gz) => gz.end().await,
            Inner::Tgz(tar) => tar.end().await,
            Inner::Zip(zip) => zip.end().await,
        }
    }

    /// Abort, discarding temporary files.
    ///
    /// Safe to call after `end()` or more than once. For `tgz` this waits
    /// until tar has exited, so nothing is written afterwards. Only the zip
    /// variant can fail here, when its staging file cannot be removed.
    pub async fn destroy(&mut self) -> Result<(), ExtractError> {
        match &mut self.inner {
            Inner::Gz(gz) => {
                gz.destroy();
                Ok(())
            }
            Inner::Tgz(tar) => {
                tar.destroy().await;
                Ok(())
            }
            Inner::Zip(zip) => zip.destroy().await,
        }
    }
}

/// Split a target path into its directory and file name
fn split_target(target: &Path) -> (PathBuf, String) {
    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    (dir, name)
}

/// Make an extracted file executable
#[cfg(unix)]
async fn make_executable(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
