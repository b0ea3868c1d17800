use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rbackup", disable_version_flag = true)]
pub struct Cli {
    /// Config file path (default: rbackup.yaml in the working directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Instance lock path (default: /run/rbackup.lock)
    #[arg(long)]
    pub lock_file: Option<PathBuf>,
    /// Print the planned tasks and exit
    #[arg(long)]
    pub print_plan: bool,
    /// Debug logging and echo every external command
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Do not draw the progress bar
    #[arg(long)]
    pub no_progress: bool,
    #[arg(long)]
    pub version: bool,
}
