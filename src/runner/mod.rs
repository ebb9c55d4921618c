use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use crate::compare::CaptureSource;
use crate::error::{HarnessError, Result};
use crate::process::{Subprocess, DEFAULT_TIMEOUT_SECS};
use crate::resource::ResolvedResource;

#[derive(Debug, Clone)]
pub struct RunCapture {
    pub label: String,
    pub path: PathBuf,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl RunCapture {
    pub fn source(&self) -> CaptureSource {
        CaptureSource::new(&self.label, &self.path)
    }
}

/// Runs built implementations against a test file, one capture file each.
pub struct ImplementationRunner {
    capture_dir: PathBuf,
    timeout: Duration,
}

impl ImplementationRunner {
    pub fn new(capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            capture_dir: capture_dir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn capture_path(&self, label: &str) -> PathBuf {
        self.capture_dir.join(format!("{}.out", label))
    }

    pub async fn run(&self, resource: &ResolvedResource, test_file: &Path, algorithm: &str) -> Result<RunCapture> {
        self.run_as(resource, resource.name(), test_file, algorithm).await
    }

    pub async fn run_as(
        &self,
        resource: &ResolvedResource,
        label: &str,
        test_file: &Path,
        algorithm: &str,
    ) -> Result<RunCapture> {
        info!("Running {}...", label);

        let executable = Self::executable(resource)?;
        let test_file = fs::canonicalize(test_file).map_err(|e| HarnessError::Corpus(format!(
            "Test file {} is not readable: {}",
            test_file.display(),
            e
        )))?;

        fs::create_dir_all(&self.capture_dir)?;
        let path = self.capture_path(label);

        let output = Subprocess::new(executable)
            .arg(algorithm)
            .arg(&test_file)
            .current_dir(resource.build_dir())
            .timeout(self.timeout)
            .run_to_file(&path)
            .await?;

        if !output.stderr.trim().is_empty() {
            warn!("{} wrote to stderr:\n{}", label, output.stderr.trim_end());
        }
        if !output.status.success() {
            warn!("{} exited with {}", label, output.status);
        }

        Ok(RunCapture {
            label: label.to_string(),
            path,
            exit_code: output.status.code(),
            stderr: output.stderr,
        })
    }

    fn executable(resource: &ResolvedResource) -> Result<&Path> {
        if !resource.build_dir().is_dir() {
            return Err(HarnessError::Execution(format!(
                "Implementation {} has not been installed.",
                resource.identifier()
            )));
        }

        let executable = resource.executable().ok_or_else(|| HarnessError::Configuration(format!(
            "Implementation {} is not executable.",
            resource.name()
        )))?;

        if !executable.is_file() {
            return Err(HarnessError::Execution(format!(
                "Executable for {} does not exist: {}",
                resource.name(),
                executable.display()
            )));
        }

        Ok(executable)
    }
}
