use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg, OFlag};
use tracing::{debug, warn};

use crate::error::{FatalError, Result};

pub const LOCK_FILE: &str = "/run/rbackup.lock";

pub fn default_lock_path() -> PathBuf {
    PathBuf::from(LOCK_FILE)
}

/// Process-wide exclusive lock held for the duration of a run.
///
/// The live `flock` is the source of truth, not the file's existence: a stale
/// file left behind by a killed process is simply locked again. Dropping the
/// guard deletes the file and then closes the handle, which releases the lock.
pub struct InstanceLock {
    path: PathBuf,
    file: Option<Flock<File>>,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        for _ in 0..3 {
            let mut locked = lock_path(path)?;
            // A releasing holder unlinks the file before closing it, so the
            // inode we locked may no longer be the one at `path`.
            if !same_file(&locked, path)? {
                debug!("lock {} was replaced while locking; retrying", path.display());
                continue;
            }
            if let Err(err) = write_pid(&mut locked) {
                warn!("could not record pid in {}: {}", path.display(), err);
            }
            debug!("acquired instance lock {}", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                file: Some(locked),
            });
        }
        Err(FatalError::AlreadyRunning(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_error(path: &Path, source: io::Error) -> FatalError {
    FatalError::Lock {
        path: path.to_path_buf(),
        source,
    }
}

fn lock_path(path: &Path) -> Result<Flock<File>> {
    // O_NOFOLLOW: a planted symlink must not redirect the pid write.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .custom_flags(OFlag::O_NOFOLLOW.bits())
        .mode(0o644)
        .open(path)
        .map_err(|source| lock_error(path, source))?;
    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(locked) => Ok(locked),
        Err((_, Errno::EWOULDBLOCK)) => Err(FatalError::AlreadyRunning(path.to_path_buf())),
        Err((_, errno)) => Err(lock_error(path, io::Error::from(errno))),
    }
}

fn same_file(file: &File, path: &Path) -> Result<bool> {
    let held = file.metadata().map_err(|source| lock_error(path, source))?;
    match fs::symlink_metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(lock_error(path, err)),
    }
}

fn write_pid(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("remove lock {}: {}", self.path.display(), err),
        }
        // Closing the descriptor releases the flock.
        drop(self.file.take());
        debug!("released instance lock {}", self.path.display());
    }
}
