use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use crate::error::{HarnessError, Result};
use crate::process::Subprocess;

const PROBE_TIMEOUT_SECS: u64 = 30;

/// External executables the harness shells out to, keyed by tool name.
#[derive(Debug, Clone, Default)]
pub struct ToolDependencies {
    tools: BTreeMap<String, String>,
}

impl ToolDependencies {
    pub fn new(tools: BTreeMap<String, String>) -> Self {
        Self { tools }
    }

    pub fn with_override(mut self, name: &str, path: Option<String>) -> Self {
        if let Some(path) = path {
            self.tools.insert(name.to_string(), path);
        }
        self
    }

    pub fn path(&self, name: &str) -> Result<&str> {
        self.tools
            .get(name)
            .map(|p| p.as_str())
            .ok_or_else(|| HarnessError::Configuration(format!("Tool '{}' is not declared", name)))
    }

    /// Parses a `NAME=PATH` override as given to `--tool`.
    pub fn parse_override(spec: &str) -> Result<(String, String)> {
        match spec.split_once('=') {
            Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
                Ok((name.trim().to_string(), path.trim().to_string()))
            }
            _ => Err(HarnessError::Configuration(format!(
                "Tool override '{}' must look like NAME=PATH",
                spec
            ))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|k| k.as_str())
    }

    /// Invokes every tool with `--help`, which must exit zero.
    pub async fn check(&self) -> Result<()> {
        for (name, path) in &self.tools {
            let probe = Subprocess::new(path)
                .arg("--help")
                .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                .capture()
                .await;

            match probe {
                Ok(out) if out.status.success() => debug!("{} available at {}", name, path),
                _ => {
                    return Err(HarnessError::ToolUnavailable {
                        tool: name.clone(),
                        path: path.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}
