use std::path::PathBuf;
use std::{fs, io, thread};

use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use tracing::warn;

/// Removes the instance lock file when the run is killed by SIGINT or SIGTERM.
///
/// The handlers are installed before this returns. The flock itself dies with
/// the process; only the file needs cleaning up.
pub fn signal_handler(lock_path: PathBuf) -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            warn!("received signal {}; aborting run", signal);
            let _ = fs::remove_file(&lock_path);
            std::process::exit(128 + signal);
        }
    });
    Ok(())
}
