use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::downloader::DownloadError;
use crate::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum ToolpinError {
    // Manifest errors
    #[error("No {file_name} found in {} or any of its parent directories", start.display())]
    ManifestNotFound { file_name: String, start: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {}: {message}", path.display())]
    InvalidManifest { path: PathBuf, message: String },

    // Registry errors
    #[error("No tool registry found: set TOOLPIN_REGISTRY or add {file_name} next to your project")]
    RegistryNotFound { file_name: String },

    #[error("Invalid tool registry {}: {message}", path.display())]
    InvalidRegistry { path: PathBuf, message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Unknown version of {name}: {version} (known versions: {known})")]
    UnknownVersion {
        name: String,
        version: String,
        known: String,
    },

    #[error("{name} {version} has no asset for {os}")]
    NoAssetForPlatform {
        name: String,
        version: String,
        os: String,
    },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // Filesystem errors
    #[error("Failed to create {}:\n{source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Exists but is not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("Failed to link {}: {source}", path.display())]
    Link {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Download errors
    #[error("Failed to set up the downloader: {0}")]
    Downloader(#[source] DownloadError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to download:\n< {url}\n> {}\n{source}", path.display())]
    DownloadFailed {
        url: String,
        path: PathBuf,
        #[source]
        source: PipelineError,
    },
}

pub type Result<T> = std::result::Result<T, ToolpinError>;

/// A file that could not be removed while cleaning up after a failure.
#[derive(Error, Debug)]
#[error("Failed to remove {}: {source}", path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Why a child process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Code(i32),
    Signal(i32),
    Unknown,
}

impl From<ExitStatus> for ExitReason {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitReason::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitReason::Signal(signal);
            }
        }

        ExitReason::Unknown
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Code(code) => write!(f, "exit code {}", code),
            ExitReason::Signal(signal) => write!(f, "signal {}", signal),
            ExitReason::Unknown => write!(f, "unknown reason"),
        }
    }
}

/// Placeholder shown when a failing process printed nothing.
pub const EMPTY_STDERR: &str = "(empty stderr)";

/// Trim diagnostic output, falling back to [`EMPTY_STDERR`].
pub(crate) fn stderr_or_placeholder(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        EMPTY_STDERR.to_string()
    } else {
        trimmed.to_string()
    }
}
