use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use crate::error::{HarnessError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// A subprocess invocation with an explicit working directory and a hard time limit.
#[derive(Debug, Clone)]
pub struct Subprocess {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl Subprocess {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn timed_out(&self) -> HarnessError {
        HarnessError::Timeout {
            command: self.display(),
            seconds: self.timeout.as_secs(),
        }
    }

    /// Appends the command line, stdout and stderr to `log_path`.
    pub async fn run_logged(&self, log_path: &Path) -> Result<ExitStatus> {
        let mut log = OpenOptions::new().create(true).append(true).open(log_path)?;
        writeln!(log, "$ {}", self.display())?;
        let stderr_log = log.try_clone()?;

        debug!("Running {}", self.display());
        let mut child = self.command()
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr_log))
            .spawn()?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                let _ = child.kill().await;
                Err(self.timed_out())
            }
        }
    }

    pub async fn capture(&self) -> Result<CommandOutput> {
        debug!("Running {}", self.display());
        let child = self.command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timed_out())??;

        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Redirects stdout to `stdout_path`; stderr is captured and returned.
    pub async fn run_to_file(&self, stdout_path: &Path) -> Result<CommandOutput> {
        let outfile = File::create(stdout_path)?;

        debug!("Running {} > {}", self.display(), stdout_path.display());
        let child = self.command()
            .stdout(Stdio::from(outfile))
            .stderr(Stdio::piped())
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timed_out())??;

        Ok(CommandOutput {
            status: output.status,
            stdout: String::new(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
