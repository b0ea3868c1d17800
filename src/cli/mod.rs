use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::args::Cli;
use crate::cli::commands::backup::{run_backup_command, BackupOptions};
use crate::config::load::CONFIG_FILE;
use crate::lock::default_lock_path;
use crate::types::RunMode;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const LICENSE_NAME: &str = "GNU GPL v3 or later";

pub mod args;
pub mod commands;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.version {
        println!("rbackup {}", VERSION);
        println!("License: {}", LICENSE_NAME);
        return Ok(());
    }

    let run_mode = RunMode {
        verbose: cli.verbose,
        show_progress: !cli.no_progress && std::io::stdout().is_terminal(),
    };
    let options = BackupOptions {
        config_path: cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE)),
        lock_path: cli.lock_file.unwrap_or_else(default_lock_path),
        print_plan: cli.print_plan,
        run_mode,
    };
    run_backup_command(&options)?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
