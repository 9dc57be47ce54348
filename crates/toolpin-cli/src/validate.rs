//! Validate command - check the manifest without installing anything.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use toolpin_pm::Installer;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Working directory
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<i32> {
    let working_dir = args
        .working_dir
        .canonicalize()
        .context("Failed to resolve working directory")?;

    let validation = Installer::new()?.validate(&working_dir, &crate::process_env())?;

    println!("{} {}", style("Manifest:").bold(), validation.manifest_path.display());
    println!("{} {}", style("Registry:").bold(), validation.registry_path.display());
    println!("{} {}", style("Bin dir:").bold(), validation.bin_dir.display());

    if validation.installed.is_empty() && validation.missing.is_empty() {
        println!("\nNo tools pinned.");
        return Ok(0);
    }

    println!();
    for tool in &validation.installed {
        println!("  {} {}", style("installed").green(), tool.label());
    }
    for tool in &validation.missing {
        println!("  {} {}", style("missing").yellow(), tool.label());
    }

    if !validation.missing.is_empty() {
        println!("\nRun `toolpin install` to download missing tools.");
    }

    Ok(0)
}
