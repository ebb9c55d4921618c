mod summary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::compare::{Report, RunSummary};
use crate::error::Result;
use crate::resource::ResolvedResource;

pub use summary::{render_summary, SummaryTableRow};

pub const RESULTS_FILE_DEFAULT: &str = "hash-test-driver-results.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationInfo {
    pub label: String,
    pub name: String,
    pub identifier: String,
    pub location: String,
    pub revision: String,
    pub commit: String,
}

impl ImplementationInfo {
    pub fn new(label: impl Into<String>, resource: &ResolvedResource) -> Self {
        Self {
            label: label.into(),
            name: resource.name().to_string(),
            identifier: resource.identifier().to_string(),
            location: resource.location().to_string(),
            revision: resource.revision().to_string(),
            commit: resource.commit().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFileReport {
    pub path: PathBuf,
    pub sha256: String,
    pub report: Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessReport {
    pub algorithm: String,
    pub generated_at: DateTime<Utc>,
    pub implementations: Vec<ImplementationInfo>,
    pub test_files: Vec<TestFileReport>,
    pub summary: RunSummary,
}

impl HarnessReport {
    pub fn new(algorithm: impl Into<String>, implementations: Vec<ImplementationInfo>) -> Self {
        Self {
            algorithm: algorithm.into(),
            generated_at: Utc::now(),
            implementations,
            test_files: Vec::new(),
            summary: RunSummary::new(),
        }
    }

    pub fn add_test_file(&mut self, file: TestFileReport) {
        self.summary.merge(&file.report.summary);
        self.test_files.push(file);
    }

    pub fn is_consistent(&self) -> bool {
        self.summary.is_consistent()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ReportFormat::Json),
            Some("yaml") | Some("yml") => Some(ReportFormat::Yaml),
            _ => None,
        }
    }

    pub fn render(&self, report: &HarnessReport) -> Result<String> {
        match self {
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            ReportFormat::Yaml => Ok(serde_yaml::to_string(report)?),
        }
    }
}

pub fn write_report(report: &HarnessReport, path: &Path, format: ReportFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format.render(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::DigestComparison;

    fn sample_report() -> HarnessReport {
        let mut report = Report::new();
        report.push(DigestComparison::full_match("line1", "abc123"));

        let mut harness = HarnessReport::new("md5", vec![]);
        harness.add_test_file(TestFileReport {
            path: PathBuf::from("tests.txt"),
            sha256: "00".to_string(),
            report,
        });
        harness
    }

    #[test]
    fn test_add_test_file_merges_summary() {
        let mut harness = sample_report();
        let mut second = Report::new();
        second.push(DigestComparison::no_comparison("v"));
        harness.add_test_file(TestFileReport {
            path: PathBuf::from("more.txt"),
            sha256: "01".to_string(),
            report: second,
        });

        assert_eq!(harness.summary.test_count, 2);
        assert_eq!(harness.summary.digest_matches, 1);
        assert_eq!(harness.summary.digest_no_comparison, 1);
        assert!(harness.is_consistent());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ReportFormat::from_path(Path::new("r.yml")), Some(ReportFormat::Yaml));
        assert_eq!(ReportFormat::from_path(Path::new("r.json")), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_path(Path::new("r.ion")), None);
    }

    #[test]
    fn test_write_report_json_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("results.json");

        write_report(&sample_report(), &path, ReportFormat::Json).unwrap();

        let parsed: HarnessReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.algorithm, "md5");
        assert_eq!(parsed.test_files[0].report.comparisons[0].digest.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_render_yaml() {
        let yaml = ReportFormat::Yaml.render(&sample_report()).unwrap();
        assert!(yaml.contains("result: full_match"));
        assert!(yaml.contains("digest_matches: 1"));
    }
}
