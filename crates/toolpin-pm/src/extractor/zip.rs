use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use ::zip::result::ZipError;
use ::zip::ZipArchive;
use tokio::io::AsyncWriteExt;

use super::{make_executable, split_target, ExtractError};
use crate::error::CleanupError;

/// Stages the archive next to the target, then extracts the named entry.
///
/// Zip's central directory sits at the end of the file, so nothing can be
/// extracted until the download is complete.
pub(crate) struct ZipExtractor {
    target: PathBuf,
    staging: PathBuf,
    file: Option<tokio::fs::File>,
    cleaned: bool,
}

impl ZipExtractor {
    pub(crate) async fn new(target: &Path) -> Result<Self, ExtractError> {
        let staging = staging_path(target);
        let file = tokio::fs::File::create(&staging)
            .await
            .map_err(|source| ExtractError::Io {
                path: staging.clone(),
                source,
            })?;

        Ok(Self {
            target: target.to_path_buf(),
            staging,
            file: Some(file),
            cleaned: false,
        })
    }

    pub(crate) async fn write(&mut self, chunk: &[u8]) -> Result<(), ExtractError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        file.write_all(chunk).await.map_err(|source| ExtractError::Io {
            path: self.staging.clone(),
            source,
        })
    }

    pub(crate) async fn end(&mut self) -> Result<(), ExtractError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let staged = file.flush().await.map_err(|source| ExtractError::Io {
            path: self.staging.clone(),
            source,
        });
        drop(file);

        let result = match staged {
            Ok(()) => self.extract().await,
            Err(e) => Err(e),
        };

        match (result, self.cleanup().await) {
            (Ok(()), None) => Ok(()),
            (Ok(()), Some(cleanup)) => Err(ExtractError::Cleanup(cleanup)),
            (Err(error), None) => Err(error),
            (Err(error), Some(cleanup)) => Err(ExtractError::CleanupAfter {
                error: Box::new(error),
                cleanup,
            }),
        }
    }

    async fn extract(&self) -> Result<(), ExtractError> {
        let staging = self.staging.clone();
        let target = self.target.clone();
        let mode = tokio::task::spawn_blocking(move || extract_entry(&staging, &target))
            .await
            .unwrap_or_else(|e| {
                Err(ExtractError::Io {
                    path: self.target.clone(),
                    source: std::io::Error::new(ErrorKind::Other, e.to_string()),
                })
            })?;

        make_executable(&self.target, mode)
            .await
            .map_err(|source| ExtractError::Io {
                path: self.target.clone(),
                source,
            })
    }

    pub(crate) async fn destroy(&mut self) -> Result<(), ExtractError> {
        self.file = None;
        match self.cleanup().await {
            Some(cleanup) => Err(ExtractError::Cleanup(cleanup)),
            None => Ok(()),
        }
    }

    /// Remove the staging file, at most once
    async fn cleanup(&mut self) -> Option<CleanupError> {
        if self.cleaned {
            return None;
        }
        self.cleaned = true;

        match tokio::fs::remove_file(&self.staging).await {
            Ok(()) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(source) => Some(CleanupError {
                path: self.staging.clone(),
                source,
            }),
        }
    }
}

/// `<target>.zip`
fn staging_path(target: &Path) -> PathBuf {
    let mut path = target.as_os_str().to_owned();
    path.push(".zip");
    PathBuf::from(path)
}

/// Unix mode for the extracted entry: the archive's permission bits, always
/// executable, never setuid/setgid/sticky
fn entry_mode(stored: Option<u32>) -> u32 {
    stored.map(|m| (m & 0o777) | 0o755).unwrap_or(0o755)
}

/// Write the entry named like `target` out of the archive; returns its mode
fn extract_entry(archive_path: &Path, target: &Path) -> Result<u32, ExtractError> {
    let (_, name) = split_target(target);
    let zip_error = |source| ExtractError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };
    let io_error = |source| ExtractError::Io {
        path: target.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(|source| ExtractError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;

    let mut entry = match archive.by_name(&name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ExtractError::EntryNotFound { name }),
        Err(e) => return Err(zip_error(e)),
    };

    let mut outfile = File::create(target).map_err(io_error)?;
    std::io::copy(&mut entry, &mut outfile).map_err(io_error)?;

    Ok(entry_mode(entry.unix_mode()))
}
