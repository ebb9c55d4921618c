use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use crate::error::{HarnessError, Result};
use crate::process::Subprocess;

pub struct InstallContext<'a> {
    pub name: &'a str,
    pub build_dir: &'a Path,
    pub log_path: &'a Path,
    pub timeout: Duration,
}

/// How one named resource is built once its source is checked out.
#[async_trait]
pub trait BuildStrategy: Send + Sync {
    /// Populates `ctx.build_dir`; tool output goes to `ctx.log_path`.
    async fn install(&self, ctx: &InstallContext<'_>) -> Result<()>;

    /// Entry point relative to the build directory, for resources that can be run.
    fn execute(&self) -> Option<&Path>;
}

/// Install steps given as argv lists, run in order inside the build directory.
#[derive(Debug, Clone, Default)]
pub struct CommandBuildStrategy {
    steps: Vec<Vec<String>>,
    execute: Option<PathBuf>,
}

impl CommandBuildStrategy {
    pub fn new(steps: Vec<Vec<String>>, execute: Option<PathBuf>) -> Result<Self> {
        if let Some(pos) = steps.iter().position(|s| s.is_empty() || s[0].trim().is_empty()) {
            return Err(HarnessError::Configuration(format!(
                "Install step {} has no program",
                pos + 1
            )));
        }
        if let Some(path) = &execute {
            if path.is_absolute() {
                return Err(HarnessError::Configuration(format!(
                    "Executable path '{}' must be relative to the build directory",
                    path.display()
                )));
            }
        }
        Ok(Self { steps, execute })
    }

    pub fn steps(&self) -> &[Vec<String>] {
        &self.steps
    }
}

#[async_trait]
impl BuildStrategy for CommandBuildStrategy {
    async fn install(&self, ctx: &InstallContext<'_>) -> Result<()> {
        for step in &self.steps {
            let cmd = Subprocess::new(&step[0])
                .args(&step[1..])
                .current_dir(ctx.build_dir)
                .timeout(ctx.timeout);

            info!("  {}", cmd.display());
            let status = cmd.run_logged(ctx.log_path).await?;
            if !status.success() {
                return Err(HarnessError::Install(format!(
                    "{}: '{}' failed ({}); see {}",
                    ctx.name,
                    cmd.display(),
                    status,
                    ctx.log_path.display()
                )));
            }
        }
        Ok(())
    }

    fn execute(&self) -> Option<&Path> {
        self.execute.as_deref()
    }
}
