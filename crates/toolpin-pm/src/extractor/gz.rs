use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzDecoder;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::{make_executable, ExtractError};

/// Decompresses a gzip stream straight into the target file
pub(crate) struct GzExtractor {
    target: PathBuf,
    /// Inflates into memory; the output is drained to `file` after every chunk
    decoder: Option<GzDecoder<Vec<u8>>>,
    file: Option<File>,
}

impl GzExtractor {
    pub(crate) async fn new(target: &Path) -> Result<Self, ExtractError> {
        let file = File::create(target).await.map_err(|source| ExtractError::Io {
            path: target.to_path_buf(),
            source,
        })?;

        Ok(Self {
            target: target.to_path_buf(),
            decoder: Some(GzDecoder::new(Vec::new())),
            file: Some(file),
        })
    }

    pub(crate) async fn write(&mut self, chunk: &[u8]) -> Result<(), ExtractError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(());
        };

        decoder.write_all(chunk).map_err(|source| ExtractError::Decompress {
            path: self.target.clone(),
            source,
        })?;
        let inflated = std::mem::take(decoder.get_mut());
        self.write_out(&inflated).await
    }

    pub(crate) async fn end(&mut self) -> Result<(), ExtractError> {
        let Some(decoder) = self.decoder.take() else {
            return Ok(());
        };

        let rest = decoder.finish().map_err(|source| ExtractError::Decompress {
            path: self.target.clone(),
            source,
        })?;
        self.write_out(&rest).await?;

        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|source| ExtractError::Io {
                path: self.target.clone(),
                source,
            })?;
        }

        make_executable(&self.target, 0o755)
            .await
            .map_err(|source| ExtractError::Io {
                path: self.target.clone(),
                source,
            })
    }

    async fn write_out(&mut self, bytes: &[u8]) -> Result<(), ExtractError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        if bytes.is_empty() {
            return Ok(());
        }

        file.write_all(bytes).await.map_err(|source| ExtractError::Io {
            path: self.target.clone(),
            source,
        })
    }

    /// Close the file; removing it is up to the caller
    pub(crate) fn destroy(&mut self) {
        self.decoder = None;
        self.file = None;
    }
}
