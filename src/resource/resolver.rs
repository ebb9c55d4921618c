use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};
use crate::build::{BuildRegistry, InstallContext};
use crate::error::{HarnessError, Result};
use crate::process::DEFAULT_TIMEOUT_SECS;
use super::descriptor::ResourceDescriptor;
use super::lock::BuildLock;
use super::source::SourceControl;

const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 3600;

/// A checked-out, installed resource. Only `ResourceResolver::resolve` creates one.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedResource {
    name: String,
    identifier: String,
    location: String,
    revision: String,
    commit: String,
    build_dir: PathBuf,
    build_log: PathBuf,
    executable: Option<PathBuf>,
    reused: bool,
}

impl ResolvedResource {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>_<short commit>`, the key of the on-disk build cache.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn build_log(&self) -> &Path {
        &self.build_log
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// True when an earlier run had already installed this commit.
    pub fn reused(&self) -> bool {
        self.reused
    }
}

struct StagedCheckout {
    staging: TempDir,
    checkout: PathBuf,
    log: PathBuf,
    commit: String,
}

pub struct ResourceResolver {
    output_root: PathBuf,
    source_control: Arc<dyn SourceControl>,
    registry: BuildRegistry,
    install_timeout: Duration,
    lock_timeout: Duration,
}

impl ResourceResolver {
    pub fn new(
        output_root: impl Into<PathBuf>,
        source_control: Arc<dyn SourceControl>,
        registry: BuildRegistry,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            source_control,
            registry,
            install_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
        }
    }

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &BuildRegistry {
        &self.registry
    }

    pub fn build_root(&self) -> PathBuf {
        self.output_root.join("build")
    }

    fn logs_dir(&self) -> PathBuf {
        self.build_root().join("logs")
    }

    fn stamps_dir(&self) -> PathBuf {
        self.build_root().join("stamps")
    }

    fn locks_dir(&self) -> PathBuf {
        self.build_root().join("locks")
    }

    pub async fn resolve(&self, descriptor: &ResourceDescriptor) -> Result<ResolvedResource> {
        let name = descriptor.name().ok_or_else(|| HarnessError::Configuration(format!(
            "Resource at {} has no name to select its installer",
            descriptor.location()
        )))?;
        let strategy = self.registry.get(name)?;

        info!("Installing {} revision {}.", name, descriptor.revision());

        for dir in [self.build_root(), self.logs_dir(), self.stamps_dir(), self.locks_dir()] {
            fs::create_dir_all(&dir)?;
        }

        let staged = self.stage(name, descriptor).await?;
        let identifier = format!("{}_{}", name, staged.commit);
        let build_dir = self.build_root().join(&identifier);
        let build_log = self.logs_dir().join(format!("{}.txt", identifier));
        let stamp = self.stamps_dir().join(&identifier);

        let _lock = BuildLock::acquire(
            self.locks_dir().join(format!("{}.lock", identifier)),
            self.lock_timeout,
        ).await?;

        let reused = if build_dir.exists() {
            info!("{} already present. Using existing source.", build_dir.display());
            stamp.exists()
        } else {
            fs::rename(&staged.log, &build_log)?;
            fs::rename(&staged.checkout, &build_dir)?;
            false
        };
        let commit = staged.commit.clone();
        staged.staging.close()?;

        if reused {
            info!("{} is already installed.", identifier);
        } else {
            let ctx = InstallContext {
                name,
                build_dir: &build_dir,
                log_path: &build_log,
                timeout: self.install_timeout,
            };
            strategy.install(&ctx).await?;
            fs::write(&stamp, format!("{}\n", commit))?;
            info!("Done installing {}.", identifier);
        }

        Ok(ResolvedResource {
            name: name.to_string(),
            identifier,
            location: descriptor.location().to_string(),
            revision: descriptor.revision().to_string(),
            commit,
            executable: strategy.execute().map(|p| build_dir.join(p)),
            build_dir,
            build_log,
            reused,
        })
    }

    // The commit is unknown until the clone exists, so the clone lands in a
    // staging directory that is removed on every exit path.
    async fn stage(&self, name: &str, descriptor: &ResourceDescriptor) -> Result<StagedCheckout> {
        let staging = tempfile::Builder::new()
            .prefix("tmp-")
            .tempdir_in(self.build_root())?;
        let checkout = staging.path().join(name);
        let log = staging.path().join("clone_log.txt");

        debug!("Staging {} in {}", descriptor.location(), staging.path().display());
        self.source_control.clone_recursive(descriptor.location(), &checkout, &log).await?;
        self.source_control.checkout(&checkout, descriptor.revision(), &log).await?;
        let commit = self.source_control.short_head(&checkout).await?;

        if !commit.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(HarnessError::Resolution(format!(
                "Unexpected commit id '{}' for {}",
                commit,
                descriptor.location()
            )));
        }

        Ok(StagedCheckout { staging, checkout, log, commit })
    }
}
