//! Install command - install and link every pinned tool.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use toolpin_pm::cli::{Output, ProgressManager, Verbosity};
use toolpin_pm::Installer;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Working directory
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,

    /// Only print failures
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

pub async fn execute(args: InstallArgs, verbose: u8) -> Result<i32> {
    let working_dir = args
        .working_dir
        .canonicalize()
        .context("Failed to resolve working directory")?;

    let mut output = Output::new();
    output.set_verbosity(if args.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::from_occurrences(verbose)
    });

    let show_progress = !args.no_progress && !args.quiet;
    let installer = Installer::new()?.with_progress(ProgressManager::new(show_progress));

    output.verbose(&format!("Installing tools for {}", working_dir.display()));
    let report = installer.install(&working_dir, &crate::process_env()).await?;

    for message in &report.messages {
        output.writeln(message);
    }
    if report.messages.is_empty() && report.is_success() {
        output.verbose("All tools are up to date.");
    }

    if !report.failures.is_empty() {
        output.writeln("");
        for failure in &report.failures {
            output.failure(
                &failure.tool.label(),
                &failure.tool.asset.url,
                &failure.tool.absolute_path,
                &failure.error.to_string(),
            );
        }
        output.error_count(report.failures.len());
    }

    Ok(report.exit_code())
}
