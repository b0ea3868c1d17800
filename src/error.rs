use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("another rbackup run is already in progress (lock {0})")]
    AlreadyRunning(PathBuf),
    #[error("config not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("{0}")]
    Config(ConfigError),
    #[error("lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("create {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

/// Errors isolated to a single task; the run carries on after recording them.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Unsupported database engine: {0}")]
    UnsupportedEngine(String),
    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} reported errors: {stderr}")]
    Stderr { program: String, stderr: String },
    #[error("{0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FatalError>;

impl From<ConfigError> for FatalError {
    fn from(err: ConfigError) -> Self {
        FatalError::Config(err)
    }
}
