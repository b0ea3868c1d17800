use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub const STAMP_FORMAT: &str = "%Y-%m-%d__%H_%M_%S";

/// Wall clock used to stamp destination directories.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Last component of `source`, ignoring trailing slashes. `/` maps to `root`.
pub fn source_basename(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string())
}

pub fn dated_destination(target: &Path, name: &str, at: DateTime<Local>) -> PathBuf {
    target.join(name).join(at.format(STAMP_FORMAT).to_string())
}

/// Appends a trailing slash so rsync copies the directory's contents.
pub fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
