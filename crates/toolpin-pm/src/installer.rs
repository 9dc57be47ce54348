//! Installation driver.
//!
//! Reads the manifest and registry, installs missing tools concurrently,
//! links every pinned tool into the bin directory and unlinks registry tools
//! the manifest no longer pins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;

use crate::cli::{ProgressManager, Slot};
use crate::config::{Config, Env, MANIFEST_FILE_NAME, SKIP_INSTALL_VAR};
use crate::downloader::{Downloader, DownloaderConfig, ProgressCallback};
use crate::extractor::ExtractorConfig;
use crate::linker::Linker;
use crate::manifest::{Manifest, ToolSet};
use crate::pipeline::download_and_extract;
use crate::registry::Registry;
use crate::tool::{OsName, Tool};
use crate::{Result, ToolpinError};

/// A tool that could not be installed, linked or unlinked
#[derive(Debug)]
pub struct ToolFailure {
    pub tool: Tool,
    pub error: ToolpinError,
}

impl ToolFailure {
    pub fn new(tool: &Tool, error: impl Into<ToolpinError>) -> Self {
        Self {
            tool: tool.clone(),
            error: error.into(),
        }
    }
}

/// Outcome of an install run
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Link changes and notices, in the order they were produced
    pub messages: Vec<String>,
    pub failures: Vec<ToolFailure>,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    fn record(&mut self, result: std::result::Result<Option<String>, ToolFailure>) {
        match result {
            Ok(Some(message)) => self.messages.push(message),
            Ok(None) => {}
            Err(failure) => self.failures.push(failure),
        }
    }
}

/// Manifest tools checked against the install home
#[derive(Debug)]
pub struct Validation {
    pub manifest_path: PathBuf,
    pub registry_path: PathBuf,
    pub bin_dir: PathBuf,
    pub installed: Vec<Tool>,
    pub missing: Vec<Tool>,
}

/// Arguments for [`get_executable`]
pub struct GetExecutable<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub cwd: &'a Path,
    pub env: &'a Env,
    /// Receives 0 before the download, fractions during it and 1 after
    pub on_progress: ProgressCallback,
}

pub struct Installer {
    downloader: Downloader,
    extractor_config: ExtractorConfig,
    os: OsName,
    progress: ProgressManager,
}

impl Installer {
    /// Installer for the current OS with default curl/wget/tar settings
    pub fn new() -> Result<Self> {
        Self::with_config(DownloaderConfig::default(), ExtractorConfig::default())
    }

    pub fn with_config(downloader_config: DownloaderConfig, extractor_config: ExtractorConfig) -> Result<Self> {
        let downloader = Downloader::new(downloader_config).map_err(ToolpinError::Downloader)?;

        Ok(Self {
            downloader,
            extractor_config,
            os: OsName::current()?,
            progress: ProgressManager::new(false),
        })
    }

    /// Pick registry assets for another OS
    pub fn with_os(mut self, os: OsName) -> Self {
        self.os = os;
        self
    }

    /// Draw per-tool status lines through `progress`
    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = progress;
        self
    }

    pub fn os(&self) -> OsName {
        self.os
    }

    /// Install and link every tool pinned by the manifest found from `cwd`.
    ///
    /// Per-tool failures are collected in the report; only problems that
    /// affect the whole batch (unreadable manifest, bin dir creation) are
    /// returned as errors.
    pub async fn install(&self, cwd: &Path, env: &Env) -> Result<InstallReport> {
        let config = Config::from_env(cwd, env);
        if config.skip_install {
            log::info!("{} is set, skipping install", SKIP_INSTALL_VAR);
            return Ok(InstallReport::default());
        }

        let (manifest, registry, _) = load_project(cwd, &config)?;
        let linker = Linker::new(&manifest.bin_dir);

        match manifest.resolve_tools(&registry, self.os, &config.install_home)? {
            Some(tools) if !tools.is_empty() => {
                self.install_tools(&tools, &registry, &linker, &config.install_home)
                    .await
            }
            Some(_) => Ok(self
                .remove_all(&registry, &linker, &config.install_home, "empty")
                .await),
            None => Ok(self
                .remove_all(&registry, &linker, &config.install_home, "missing")
                .await),
        }
    }

    async fn install_tools(
        &self,
        tools: &ToolSet,
        registry: &Registry,
        linker: &Linker,
        install_home: &Path,
    ) -> Result<InstallReport> {
        create_dir(linker.bin_dir()).await?;
        for tool in &tools.missing {
            if let Some(parent) = tool.absolute_path.parent() {
                create_dir(parent).await?;
            }
        }

        log::debug!(
            "{} to install, {} already installed",
            tools.missing.len(),
            tools.existing.len()
        );

        let installs = join_all(tools.missing.iter().map(|tool| self.install_tool(tool, linker)));
        let links = join_all(tools.existing.iter().map(|tool| link_tool(tool, linker)));
        let unlinks = self.unlink_unused(registry, linker, install_home, tools);

        let (installs, links, unlinks) = tokio::join!(installs, links, unlinks);

        let mut report = InstallReport::default();
        for result in installs.into_iter().chain(links).chain(unlinks) {
            report.record(result);
        }
        Ok(report)
    }

    async fn install_tool(&self, tool: &Tool, linker: &Linker) -> std::result::Result<Option<String>, ToolFailure> {
        let label = tool.label();
        let bar = self.progress.create_tool_bar(&label);

        let on_progress: ProgressCallback = {
            let bar = bar.clone();
            let label = label.clone();
            Arc::new(move |fraction| ProgressManager::update(&bar, Slot::Progress(fraction), &label))
        };

        match download_and_extract(tool, &self.downloader, &self.extractor_config, on_progress).await {
            Ok(()) => {
                ProgressManager::update(&bar, Slot::Progress(1.0), &label);
                bar.finish();
            }
            Err(error) => {
                ProgressManager::update(&bar, Slot::Error, &label);
                return Err(ToolFailure::new(tool, error));
            }
        }

        link_tool(tool, linker).await
    }

    /// Unlink every registry tool; used when the manifest pins nothing.
    ///
    /// `what` is "missing" or "empty"; the notice only shows when there was
    /// nothing to unlink.
    async fn remove_all(&self, registry: &Registry, linker: &Linker, install_home: &Path, what: &str) -> InstallReport {
        let mut report = InstallReport::default();
        for result in self
            .unlink_unused(registry, linker, install_home, &ToolSet::default())
            .await
        {
            report.record(result);
        }

        if report.messages.is_empty() && report.failures.is_empty() {
            report.messages.push(format!(
                "The \"tools\" field is {}. To add tools: edit {}",
                what, MANIFEST_FILE_NAME
            ));
        }
        report
    }

    /// Remove links for registry tools not in `keep`
    async fn unlink_unused(
        &self,
        registry: &Registry,
        linker: &Linker,
        install_home: &Path,
        keep: &ToolSet,
    ) -> Vec<std::result::Result<Option<String>, ToolFailure>> {
        let stale: Vec<Tool> = registry
            .tool_names()
            .filter(|name| !keep.contains(name))
            .flat_map(|name| registry.all_versions(name, self.os, install_home))
            .collect();

        join_all(stale.iter().map(|tool| async move {
            linker
                .unlink(tool)
                .await
                .map_err(|error| ToolFailure::new(tool, error))
        }))
        .await
    }

    /// Check the manifest against the registry and the install home
    pub fn validate(&self, cwd: &Path, env: &Env) -> Result<Validation> {
        let config = Config::from_env(cwd, env);
        let (manifest, registry, registry_path) = load_project(cwd, &config)?;
        let tools = manifest
            .resolve_tools(&registry, self.os, &config.install_home)?
            .unwrap_or_default();

        Ok(Validation {
            manifest_path: manifest.path,
            registry_path,
            bin_dir: manifest.bin_dir,
            installed: tools.existing,
            missing: tools.missing,
        })
    }

    /// Make sure one tool is installed and return its path
    pub async fn get_executable(&self, options: GetExecutable<'_>) -> Result<PathBuf> {
        let config = Config::from_env(options.cwd, options.env);
        let registry = Registry::load(&config.find_registry(options.cwd)?)?;
        let tool = registry.resolve(options.name, options.version, self.os, &config.install_home)?;
        let path = tool.absolute_path.clone();

        if path.exists() {
            return if path.is_file() {
                Ok(path)
            } else {
                Err(ToolpinError::NotAFile { path })
            };
        }

        if let Some(parent) = path.parent() {
            create_dir(parent).await?;
        }

        (options.on_progress)(0.0);
        download_and_extract(&tool, &self.downloader, &self.extractor_config, options.on_progress.clone())
            .await
            .map_err(|source| ToolpinError::DownloadFailed {
                url: tool.asset.url.clone(),
                path: path.clone(),
                source,
            })?;
        (options.on_progress)(1.0);

        Ok(path)
    }
}

/// Make sure one tool is installed, using default settings
pub async fn get_executable(options: GetExecutable<'_>) -> Result<PathBuf> {
    Installer::new()?.get_executable(options).await
}

fn load_project(cwd: &Path, config: &Config) -> Result<(Manifest, Registry, PathBuf)> {
    let manifest = Manifest::load(&config.find_manifest(cwd)?)?;
    let registry_path = config.find_registry(cwd)?;
    let registry = Registry::load(&registry_path)?;
    Ok((manifest, registry, registry_path))
}

async fn link_tool(tool: &Tool, linker: &Linker) -> std::result::Result<Option<String>, ToolFailure> {
    linker
        .link(tool)
        .await
        .map_err(|error| ToolFailure::new(tool, error))
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| ToolpinError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}
