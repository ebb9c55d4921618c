#![allow(dead_code)]

use async_trait::async_trait;
use hashconform::{BuildStrategy, HarnessError, InstallContext, Result, SourceControl};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const HEAD_FILE: &str = ".fake-head";

/// Stands in for git: "clones" copy the files of a local directory (if the
/// location is one) and each known revision maps to a fixed commit.
pub struct FakeSourceControl {
    commits: HashMap<String, String>,
    clones: AtomicUsize,
    fail_clone: bool,
}

impl FakeSourceControl {
    pub fn new(commits: &[(&str, &str)]) -> Self {
        Self {
            commits: commits.iter().map(|(r, c)| (r.to_string(), c.to_string())).collect(),
            clones: AtomicUsize::new(0),
            fail_clone: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            commits: HashMap::new(),
            clones: AtomicUsize::new(0),
            fail_clone: true,
        }
    }

    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn clone_recursive(&self, location: &str, dest: &Path, log: &Path) -> Result<()> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        if self.fail_clone {
            return Err(HarnessError::Resolution(format!("could not reach {}", location)));
        }

        fs::create_dir_all(dest)?;
        let source = Path::new(location);
        if source.is_dir() {
            for entry in fs::read_dir(source)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::copy(entry.path(), dest.join(entry.file_name()))?;
                }
            }
        }

        let mut log = fs::OpenOptions::new().create(true).append(true).open(log)?;
        writeln!(log, "cloned {}", location)?;
        Ok(())
    }

    async fn checkout(&self, repo: &Path, revision: &str, _log: &Path) -> Result<()> {
        let commit = self.commits.get(revision).ok_or_else(|| {
            HarnessError::Resolution(format!("pathspec '{}' did not match", revision))
        })?;
        fs::write(repo.join(HEAD_FILE), commit)?;
        Ok(())
    }

    async fn short_head(&self, repo: &Path) -> Result<String> {
        Ok(fs::read_to_string(repo.join(HEAD_FILE))?.trim().to_string())
    }
}

/// Counts installs; optionally writes an executable shell script as the entry point.
pub struct ScriptStrategy {
    installs: Arc<AtomicUsize>,
    execute: Option<PathBuf>,
    script: Option<String>,
    fail: bool,
}

impl ScriptStrategy {
    pub fn source_only() -> Self {
        Self {
            installs: Arc::new(AtomicUsize::new(0)),
            execute: None,
            script: None,
            fail: false,
        }
    }

    pub fn executable(script: &str) -> Self {
        Self {
            installs: Arc::new(AtomicUsize::new(0)),
            execute: Some(PathBuf::from("bin/hash")),
            script: Some(script.to_string()),
            fail: false,
        }
    }

    /// Declares an entry point but never builds it.
    pub fn declared_but_missing() -> Self {
        Self {
            installs: Arc::new(AtomicUsize::new(0)),
            execute: Some(PathBuf::from("bin/hash")),
            script: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::source_only()
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.installs)
    }
}

#[async_trait]
impl BuildStrategy for ScriptStrategy {
    async fn install(&self, ctx: &InstallContext<'_>) -> Result<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HarnessError::Install(format!("{}: build failed", ctx.name)));
        }

        if let (Some(execute), Some(script)) = (&self.execute, &self.script) {
            let path = ctx.build_dir.join(execute);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, script)?;
            make_executable(&path)?;
        }
        Ok(())
    }

    fn execute(&self) -> Option<&Path> {
        self.execute.as_deref()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Prints `<algorithm>:<vector>` for every line of the test file.
pub const ECHO_DIGEST: &str = r#"#!/bin/sh
while IFS= read -r line || [ -n "$line" ]; do
  echo "$1:$line"
done < "$2"
"#;

/// Like ECHO_DIGEST, but disagrees on the vector `v2`.
pub const DIVERGENT_DIGEST: &str = r#"#!/bin/sh
while IFS= read -r line || [ -n "$line" ]; do
  if [ "$line" = "v2" ]; then
    echo "other"
  else
    echo "$1:$line"
  fi
done < "$2"
"#;

/// Cannot digest anything.
pub const UNABLE_DIGEST: &str = r#"#!/bin/sh
while IFS= read -r line || [ -n "$line" ]; do
  echo "[unable to digest: unsupported]"
done < "$2"
"#;

/// Digests only the first vector, complains on stderr and fails.
pub const SHORT_DIGEST: &str = r#"#!/bin/sh
head -n 1 "$2" | while IFS= read -r line; do
  echo "$1:$line"
done
echo "crashed after first vector" >&2
exit 1
"#;
