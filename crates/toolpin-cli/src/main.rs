mod install;
mod validate;
mod which;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use toolpin_pm::Env;

#[derive(Parser, Debug)]
#[command(name = "toolpin")]
#[command(about = "Install pinned, hash-verified project tools")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download, verify and link every tool in toolpin.json
    Install(install::InstallArgs),

    /// Check toolpin.json against the registry and the install home
    Validate(validate::ValidateArgs),

    /// Print the path of one tool, installing it if needed
    Which(which::WhichArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// The process environment, skipping entries that are not valid UTF-8
pub(crate) fn process_env() -> Env {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;

    match args.command {
        Commands::Install(install_args) => rt.block_on(install::execute(install_args, args.verbose)),
        Commands::Validate(validate_args) => validate::execute(validate_args),
        Commands::Which(which_args) => rt.block_on(which::execute(which_args)),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
