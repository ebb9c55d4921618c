use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use crate::error::{HarnessError, Result};
use crate::process::Subprocess;

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Full-history clone of `location` into `dest`, including submodules.
    async fn clone_recursive(&self, location: &str, dest: &Path, log: &Path) -> Result<()>;

    /// Checks out `revision` and brings submodules in line with it.
    async fn checkout(&self, repo: &Path, revision: &str, log: &Path) -> Result<()>;

    async fn short_head(&self, repo: &Path) -> Result<String>;
}

pub struct Git {
    executable: String,
    timeout: Duration,
}

impl Git {
    pub fn new(executable: impl Into<String>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    fn command(&self) -> Subprocess {
        Subprocess::new(&self.executable).timeout(self.timeout)
    }

    async fn run_logged(&self, cmd: Subprocess, log: &Path) -> Result<()> {
        let status = cmd.run_logged(log).await?;
        if status.success() {
            Ok(())
        } else {
            Err(HarnessError::Resolution(format!(
                "'{}' failed ({}); see {}",
                cmd.display(),
                status,
                log.display()
            )))
        }
    }
}

#[async_trait]
impl SourceControl for Git {
    async fn clone_recursive(&self, location: &str, dest: &Path, log: &Path) -> Result<()> {
        let cmd = self.command()
            .args(["clone", "--recurse-submodules", location])
            .arg(dest);
        self.run_logged(cmd, log).await
    }

    async fn checkout(&self, repo: &Path, revision: &str, log: &Path) -> Result<()> {
        let checkout = self.command().args(["checkout", revision]).current_dir(repo);
        self.run_logged(checkout, log).await?;

        let submodules = self.command().args(["submodule", "update", "--init"]).current_dir(repo);
        self.run_logged(submodules, log).await
    }

    async fn short_head(&self, repo: &Path) -> Result<String> {
        let cmd = self.command().args(["rev-parse", "--short", "HEAD"]).current_dir(repo);
        let out = cmd.capture().await?;

        let commit = out.stdout.trim();
        if !out.status.success() || commit.is_empty() {
            return Err(HarnessError::Resolution(format!(
                "Unable to read the commit of {}: {}",
                repo.display(),
                out.stderr.trim()
            )));
        }
        Ok(commit.to_string())
    }
}
