//! Which command - print a tool's executable path, installing it on demand.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use toolpin_pm::cli::{ProgressManager, Slot};
use toolpin_pm::{GetExecutable, Installer, ProgressCallback};

#[derive(Args, Debug)]
pub struct WhichArgs {
    /// Tool name as listed in the registry
    pub name: String,

    /// Exact tool version
    pub version: String,

    /// Working directory
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,
}

pub async fn execute(args: WhichArgs) -> Result<i32> {
    let working_dir = args
        .working_dir
        .canonicalize()
        .context("Failed to resolve working directory")?;

    let label = format!("{} {}", args.name, args.version);
    log::debug!("Looking up {} for {}", label, working_dir.display());
    let progress = ProgressManager::new(!args.no_progress);
    let bar = progress.create_tool_bar(&label);

    let on_progress: ProgressCallback = {
        let bar = bar.clone();
        let label = label.clone();
        Arc::new(move |fraction| ProgressManager::update(&bar, Slot::Progress(fraction), &label))
    };

    let env = crate::process_env();
    let result = Installer::new()?
        .get_executable(GetExecutable {
            name: &args.name,
            version: &args.version,
            cwd: &working_dir,
            env: &env,
            on_progress,
        })
        .await;

    match result {
        Ok(path) => {
            bar.finish_and_clear();
            println!("{}", path.display());
            Ok(0)
        }
        Err(e) => {
            ProgressManager::update(&bar, Slot::Error, &label);
            Err(e.into())
        }
    }
}
