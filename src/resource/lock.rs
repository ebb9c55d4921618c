use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::error::{HarnessError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Exclusive hold on one build identifier, released on drop.
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    pub async fn acquire(path: impl Into<PathBuf>, wait: Duration) -> Result<Self> {
        let path = path.into();
        let deadline = Instant::now() + wait;
        let mut announced = false;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!("Acquired {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(pid) = stale_holder(&path) {
                        warn!("Removing {} left behind by exited process {}", path.display(), pid);
                        match fs::remove_file(&path) {
                            Ok(()) => continue,
                            Err(e) if e.kind() == ErrorKind::NotFound => continue,
                            Err(e) => return Err(e.into()),
                        }
                    }
                    if Instant::now() >= deadline {
                        return Err(HarnessError::Resolution(format!(
                            "Timed out waiting for {}; remove it if no other run is active",
                            path.display()
                        )));
                    }
                    if !announced {
                        info!("Waiting for another run to release {}", path.display());
                        announced = true;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Pid recorded in the lock file, if that process no longer exists.
/// A file without a readable pid is treated as held.
fn stale_holder(path: &Path) -> Option<u32> {
    let pid = fs::read_to_string(path).ok()?.trim().parse::<u32>().ok()?;
    if process_alive(pid) {
        None
    } else {
        Some(pid)
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return true;
    };
    if pid <= 0 {
        return true;
    }
    // Signal 0 checks existence only. EPERM still means the process exists.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
