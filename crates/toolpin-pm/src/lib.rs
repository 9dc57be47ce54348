//! Pinned tool installer.
//!
//! Tools are declared in a project manifest (`toolpin.json`), resolved
//! against a registry of known assets, downloaded, verified against their
//! SHA-256 hash, extracted into a per-user install home and linked into the
//! project's bin directory.

pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod hasher;
pub mod installer;
pub mod linker;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod tool;

pub use config::{Config, Env};
pub use downloader::{Download, DownloadError, Downloader, DownloaderConfig, ProgressCallback};
pub use error::{CleanupError, ExitReason, Result, ToolpinError};
pub use extractor::{ExtractError, Extractor, ExtractorConfig};
pub use hasher::Hasher;
pub use installer::{get_executable, GetExecutable, InstallReport, Installer, ToolFailure, Validation};
pub use linker::Linker;
pub use manifest::{Manifest, ToolSet};
pub use pipeline::{download_and_extract, PipelineError, PipelineErrorKind};
pub use registry::Registry;
pub use tool::{Asset, AssetKind, OsName, Tool};
