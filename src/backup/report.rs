use std::fmt::Write as _;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed,
    Skipped,
}

/// Outcome of one task. `message` holds the error for a failure, the reason for
/// a skip, or a post-processing warning for a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub id: String,
    pub outcome: TaskOutcome,
    pub message: Option<String>,
}

impl TaskResult {
    pub fn succeeded(id: &str, warning: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            outcome: TaskOutcome::Succeeded,
            message: warning,
        }
    }

    pub fn failed(id: &str, error: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            outcome: TaskOutcome::Failed,
            message: Some(error.into()),
        }
    }

    pub fn skipped(id: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            outcome: TaskOutcome::Skipped,
            message: Some(reason.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    results: Vec<TaskResult>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    fn count(&self, outcome: TaskOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(TaskOutcome::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(TaskOutcome::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TaskOutcome::Skipped)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == TaskOutcome::Failed)
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} succeeded, {} failed, {} skipped",
            self.succeeded(),
            self.failed(),
            self.skipped()
        );
        for failure in self.failures() {
            let _ = write!(
                out,
                "\n  failed: {}: {}",
                failure.id,
                failure.message.as_deref().unwrap_or("unknown error")
            );
        }
        out
    }

    pub fn log_failures(&self) {
        for failure in self.failures() {
            warn!(
                "task failed: {}: {}",
                failure.id,
                failure.message.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
