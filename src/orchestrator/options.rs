use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::report::{ReportFormat, RESULTS_FILE_DEFAULT};

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// `name,location[,revision]` descriptions, tested before the manifest defaults.
    pub implementations: Vec<String>,
    /// `location[,revision]` replacing the manifest's test source.
    pub test_source: Option<String>,
    pub local_only: bool,
    pub output_dir: PathBuf,
    pub results_file: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub tool_overrides: BTreeMap<String, String>,
    pub algorithm: Option<String>,
    pub test_files: Vec<PathBuf>,
    pub timeout: Option<Duration>,
}

impl HarnessOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            implementations: Vec::new(),
            test_source: None,
            local_only: false,
            output_dir: output_dir.into(),
            results_file: None,
            format: None,
            tool_overrides: BTreeMap::new(),
            algorithm: None,
            test_files: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_implementation(mut self, description: impl Into<String>) -> Self {
        self.implementations.push(description.into());
        self
    }

    pub fn with_test_source(mut self, description: impl Into<String>) -> Self {
        self.test_source = Some(description.into());
        self
    }

    pub fn local_only(mut self, local_only: bool) -> Self {
        self.local_only = local_only;
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.tool_overrides.insert(name.into(), path.into());
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn with_test_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.test_files.push(path.into());
        self
    }

    pub fn results_path(&self, output_root: &Path) -> PathBuf {
        self.results_file
            .clone()
            .unwrap_or_else(|| output_root.join(RESULTS_FILE_DEFAULT))
    }

    pub fn report_format(&self, results_path: &Path) -> ReportFormat {
        self.format
            .or_else(|| ReportFormat::from_path(results_path))
            .unwrap_or_default()
    }
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self::new(".")
    }
}
