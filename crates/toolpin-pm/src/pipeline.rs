//! Download, verify and extract a single tool.
//!
//! Every chunk from the downloader goes to the hasher first and then to the
//! extractor, in order. Once the download finishes the digest is compared
//! against the registry hash; only then is the extractor told to finish.
//! Any failure goes through one rollback that leaves no file at the tool's
//! path.

use std::fmt;
use std::io::ErrorKind;

use thiserror::Error;

use crate::downloader::{Download, DownloadError, Downloader, ProgressCallback};
use crate::error::CleanupError;
use crate::extractor::{ExtractError, Extractor, ExtractorConfig};
use crate::hasher::{digests_match, Hasher};
use crate::tool::Tool;

/// What went wrong first
#[derive(Debug, Error)]
pub enum PipelineErrorKind {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("The downloaded file does not have the expected hash!\nExpected: {expected}\nActual:   {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// A failed pipeline run: the primary failure plus anything rollback could
/// not undo.
#[derive(Debug)]
pub struct PipelineError {
    pub kind: PipelineErrorKind,
    pub cleanup: Vec<CleanupError>,
}

impl PipelineError {
    pub fn new(kind: PipelineErrorKind) -> Self {
        Self {
            kind,
            cleanup: Vec::new(),
        }
    }

    pub fn is_hash_mismatch(&self) -> bool {
        matches!(self.kind, PipelineErrorKind::HashMismatch { .. })
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for cleanup in &self.cleanup {
            write!(f, "\n\n{}", cleanup)?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            PipelineErrorKind::Download(e) => Some(e),
            PipelineErrorKind::HashMismatch { .. } => None,
            PipelineErrorKind::Extract(e) => Some(e),
        }
    }
}

/// Fetch `tool`'s asset, verify it and extract the executable to
/// `tool.absolute_path`.
///
/// The parent directory must already exist. On error nothing is left at the
/// target path (unless removing it failed, which the error then reports).
pub async fn download_and_extract(
    tool: &Tool,
    downloader: &Downloader,
    extractor_config: &ExtractorConfig,
    on_progress: ProgressCallback,
) -> Result<(), PipelineError> {
    let mut run = Run {
        tool,
        hasher: Hasher::new(),
        extractor: None,
        download: None,
    };

    match run.execute(downloader, extractor_config, on_progress).await {
        Ok(()) => Ok(()),
        Err(kind) => Err(run.rollback(kind).await),
    }
}

/// Resources owned by one pipeline run
struct Run<'a> {
    tool: &'a Tool,
    hasher: Hasher,
    extractor: Option<Extractor>,
    download: Option<Download>,
}

impl Run<'_> {
    async fn execute(
        &mut self,
        downloader: &Downloader,
        extractor_config: &ExtractorConfig,
        on_progress: ProgressCallback,
    ) -> Result<(), PipelineErrorKind> {
        let asset = &self.tool.asset;

        let extractor = self.extractor.insert(
            Extractor::new(asset.kind, &self.tool.absolute_path, extractor_config).await?,
        );
        let download = self.download.insert(downloader.start(&asset.url, on_progress)?);

        while let Some(chunk) = download.next_chunk().await? {
            self.hasher.update(&chunk);
            extractor.write(&chunk).await?;
        }

        let actual = self.hasher.digest().unwrap_or_default();
        log::debug!(
            "{}: {} bytes via {}, sha256 {}",
            self.tool.label(),
            self.hasher.bytes(),
            download.backend(),
            actual
        );

        if !digests_match(&actual, &asset.hash) {
            return Err(PipelineErrorKind::HashMismatch {
                expected: asset.hash.clone(),
                actual,
            });
        }

        extractor.end().await?;
        Ok(())
    }

    /// Undo everything; consumes the run so it can only happen once
    async fn rollback(mut self, kind: PipelineErrorKind) -> PipelineError {
        let mut error = PipelineError::new(kind);
        let target = &self.tool.absolute_path;

        log::debug!("{}: rolling back after: {}", self.tool.label(), error.kind);

        self.hasher.destroy();

        if let Some(mut extractor) = self.extractor.take() {
            match extractor.destroy().await {
                Ok(()) => {}
                Err(ExtractError::Cleanup(cleanup)) => error.cleanup.push(cleanup),
                Err(other) => error.cleanup.push(CleanupError {
                    path: target.clone(),
                    source: std::io::Error::new(ErrorKind::Other, other.to_string()),
                }),
            }
        }

        if let Some(mut download) = self.download.take() {
            download.kill();
        }

        match tokio::fs::remove_file(target).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => error.cleanup.push(CleanupError {
                path: target.clone(),
                source,
            }),
        }

        error
    }
}
