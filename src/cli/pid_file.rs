//! PID file management: one recorder per user

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

use super::socket::runtime_dir;

/// PID file name inside the runtime directory
const PID_FILE_NAME: &str = "canvas-rec.pid";

/// PID file errors
#[derive(Debug, thiserror::Error)]
pub enum PidFileError {
    #[error("Another recorder is already running (PID: {0})")]
    AlreadyRunning(u32),

    #[error("Cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Cannot remove {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// Marks the single running recorder.
///
/// The file is only removed by the instance that wrote it, so a refused
/// second instance leaves the owner's file alone.
pub struct PidFile {
    path: PathBuf,
    held: AtomicBool,
}

impl PidFile {
    /// PID file in the runtime directory
    pub fn new() -> Self {
        Self::with_path(runtime_dir().join(PID_FILE_NAME))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            held: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PID of a live recorder recorded in the file.
    ///
    /// A file naming a process that no longer exists is stale and removed.
    pub fn is_running(&self) -> Option<u32> {
        let pid = read_pid(&self.path)?;
        let raw = i32::try_from(pid).ok()?;

        match kill(Pid::from_raw(raw), None) {
            Ok(()) => Some(pid),
            Err(Errno::ESRCH) => {
                tracing::debug!(pid, path = %self.path.display(), "removing stale pid file");
                let _ = fs::remove_file(&self.path);
                None
            }
            // EPERM: the pid now belongs to another user's process
            Err(_) => None,
        }
    }

    /// Claim the file for this process
    pub fn acquire(&self) -> Result<(), PidFileError> {
        if let Some(pid) = self.is_running() {
            return Err(PidFileError::AlreadyRunning(pid));
        }

        fs::write(&self.path, process::id().to_string()).map_err(|source| {
            PidFileError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Remove the file if this process holds it
    pub fn release(&self) -> Result<(), PidFileError> {
        if !self.held.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(PidFileError::Remove {
                path: self.path.clone(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
