use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backup::dump::{compress_command, compressed_path, dump_file_name, remote_dump_command};
use crate::backup::plan::{Task, TaskKind, TaskPlan};
use crate::backup::report::{RunReport, TaskResult};
use crate::backup::rsync::{local_copy_command, remote_copy_command};
use crate::config::model::{DatabaseConfig, SshEndpoint, Tools};
use crate::error::{FatalError, Result, TaskError};
use crate::progress::ProgressReporter;
use crate::types::DatabaseEngine;
use crate::util::command::{CommandRunner, StdoutSink};
use crate::util::paths::{dated_destination, source_basename, Clock};

pub mod dump;
pub mod plan;
pub mod report;
pub mod rsync;

/// Outcome of the running phase: an optional post-processing warning on success.
type TaskRun = std::result::Result<Option<String>, TaskError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Preparing,
    Running,
    PostProcess,
    Completed,
    Failed,
}

/// Runs tasks one at a time against the external tools.
///
/// Task-level problems come back as a [`TaskResult`]; only a destination that
/// cannot be created is returned as an error, which aborts the run.
pub struct TaskExecutor<'a, R, C> {
    runner: R,
    clock: C,
    tools: &'a Tools,
}

impl<'a, R: CommandRunner, C: Clock> TaskExecutor<'a, R, C> {
    pub fn new(runner: R, clock: C, tools: &'a Tools) -> Self {
        Self { runner, clock, tools }
    }

    pub fn execute(&mut self, task: &Task, progress: &mut ProgressReporter) -> Result<TaskResult> {
        transition(task, TaskState::Pending);
        let outcome = match &task.kind {
            TaskKind::LocalCopy { source, target } => {
                if !Path::new(source).exists() {
                    let reason = format!("source {} does not exist; skipping", source);
                    warn!("{}: {}", task.id, reason);
                    progress.message(&format!("warning: {}", reason));
                    return Ok(TaskResult::skipped(&task.id, reason));
                }
                self.copy_local(task, source, target, progress)?
            }
            TaskKind::RemoteCopy { ssh, source, target } => {
                self.copy_remote(task, ssh, source, target, progress)?
            }
            TaskKind::RemoteDatabaseDump {
                ssh,
                database,
                db_name,
                target,
            } => self.dump_database(task, ssh, database, db_name, target, progress)?,
        };

        let result = match outcome {
            Ok(warning) => {
                transition(task, TaskState::Completed);
                if let Some(warning) = &warning {
                    progress.message(&format!("warning: {}: {}", task.id, warning));
                }
                progress.message(&format!("done: {}", task.id));
                TaskResult::succeeded(&task.id, warning)
            }
            Err(err) => {
                transition(task, TaskState::Failed);
                progress.message(&format!("failed: {}: {}", task.id, err));
                TaskResult::failed(&task.id, err.to_string())
            }
        };
        Ok(result)
    }

    fn prepare(&self, task: &Task, target: &Path, name: &str) -> Result<PathBuf> {
        transition(task, TaskState::Preparing);
        let dest = dated_destination(target, name, self.clock.now());
        fs::create_dir_all(&dest).map_err(|source| FatalError::CreateDestination {
            path: dest.clone(),
            source,
        })?;
        debug!("{}: destination {}", task.id, dest.display());
        Ok(dest)
    }

    fn copy_local(
        &mut self,
        task: &Task,
        source: &str,
        target: &Path,
        progress: &mut ProgressReporter,
    ) -> Result<TaskRun> {
        let dest = self.prepare(task, target, &source_basename(source))?;
        transition(task, TaskState::Running);
        progress.message(&format!("copying {} -> {}", source, dest.display()));
        let mut cmd = local_copy_command(&self.tools.rsync, source, &dest);
        Ok(self
            .runner
            .run(&mut cmd, StdoutSink::Handler(progress))
            .map(|_| None))
    }

    fn copy_remote(
        &mut self,
        task: &Task,
        ssh: &SshEndpoint,
        source: &str,
        target: &Path,
        progress: &mut ProgressReporter,
    ) -> Result<TaskRun> {
        let dest = self.prepare(task, target, &source_basename(source))?;
        transition(task, TaskState::Running);
        progress.message(&format!(
            "copying {}@{}:{} -> {}",
            ssh.username,
            ssh.host,
            source,
            dest.display()
        ));
        let mut cmd = remote_copy_command(&self.tools.rsync, &self.tools.ssh, ssh, source, &dest);
        Ok(self
            .runner
            .run(&mut cmd, StdoutSink::Handler(progress))
            .map(|_| None))
    }

    fn dump_database(
        &mut self,
        task: &Task,
        ssh: &SshEndpoint,
        database: &DatabaseConfig,
        db_name: &str,
        target: &Path,
        progress: &mut ProgressReporter,
    ) -> Result<TaskRun> {
        let Some(engine) = DatabaseEngine::parse(&database.engine) else {
            return Ok(Err(TaskError::UnsupportedEngine(database.engine.clone())));
        };
        let dest = self.prepare(task, target, db_name)?;
        transition(task, TaskState::Running);
        progress.message(&format!(
            "dumping {} database {} from {} via {}@{}",
            engine, db_name, database.host, ssh.username, ssh.host
        ));

        let dump_path = dest.join(dump_file_name(db_name));
        let file = match File::create(&dump_path) {
            Ok(file) => file,
            Err(err) => return Ok(Err(err.into())),
        };
        let mut cmd = remote_dump_command(&self.tools.ssh, ssh, engine, database, db_name);
        if let Err(err) = self.runner.run(&mut cmd, StdoutSink::File(file)) {
            return Ok(Err(err));
        }

        transition(task, TaskState::PostProcess);
        let mut gzip = compress_command(&self.tools.gzip, &dump_path);
        match self.runner.run(&mut gzip, StdoutSink::Discard) {
            Ok(_) => {
                info!("{}: wrote {}", task.id, compressed_path(&dump_path).display());
                Ok(Ok(None))
            }
            Err(err) => {
                let warning = format!(
                    "compression of {} failed, keeping uncompressed dump: {}",
                    dump_path.display(),
                    err
                );
                warn!("{}: {}", task.id, warning);
                Ok(Ok(Some(warning)))
            }
        }
    }
}

fn transition(task: &Task, state: TaskState) {
    debug!("{}: {:?}", task.id, state);
}

/// Executes every planned task in order. A failing task is recorded and the run
/// moves on; a fatal error stops the loop and is handed back to the caller.
pub fn run_backup<R: CommandRunner, C: Clock>(
    plan: &TaskPlan,
    executor: &mut TaskExecutor<'_, R, C>,
    progress: &mut ProgressReporter,
) -> Result<RunReport> {
    let mut report = RunReport::new();
    for task in &plan.tasks {
        info!("starting task {}", task.id);
        let result = executor.execute(task, progress)?;
        report.record(result);
        progress.advance();
    }
    Ok(report)
}
