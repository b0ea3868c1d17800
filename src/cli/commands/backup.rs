use std::path::PathBuf;

use chrono::Local;
use tracing::{info, warn};

use crate::backup::plan::{build_plan, print_plan};
use crate::backup::{run_backup, TaskExecutor};
use crate::config::load::load_config;
use crate::error::Result;
use crate::lock::InstanceLock;
use crate::progress::ProgressReporter;
use crate::signal_handler::signal_handler;
use crate::types::RunMode;
use crate::util::command::SystemRunner;
use crate::util::paths::SystemClock;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub config_path: PathBuf,
    pub lock_path: PathBuf,
    pub print_plan: bool,
    pub run_mode: RunMode,
}

pub fn run_backup_command(options: &BackupOptions) -> Result<()> {
    if options.print_plan {
        let cfg = load_config(&options.config_path)?;
        print_plan(&build_plan(&cfg));
        return Ok(());
    }

    let lock = InstanceLock::acquire(&options.lock_path)?;
    if let Err(err) = signal_handler(lock.path().to_path_buf()) {
        warn!("signal handler setup failed: {}", err);
    }
    println!("backup started {}", Local::now().format(TIME_FORMAT));

    let cfg = load_config(&options.config_path)?;
    let plan = build_plan(&cfg);
    info!(
        "loaded config {} with {} task(s)",
        options.config_path.display(),
        plan.tasks.len()
    );

    let mut progress = ProgressReporter::new(plan.total as u64, options.run_mode.show_progress);
    let mut executor = TaskExecutor::new(
        SystemRunner::new(options.run_mode),
        SystemClock,
        &cfg.tools,
    );
    let outcome = run_backup(&plan, &mut executor, &mut progress);
    progress.finish();
    let report = outcome?;

    report.log_failures();
    println!("{}", report.summary());
    println!("backup finished {}", Local::now().format(TIME_FORMAT));
    drop(lock);
    Ok(())
}
