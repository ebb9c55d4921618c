use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Value recorded for any output line starting with the "unable to digest" marker.
pub const UNABLE_TO_DIGEST: &str = "[unable to digest]";
const UNABLE_PREFIX: &str = "[unable to digest";

pub fn normalize_digest(line: &str) -> String {
    let line = line.trim_end();
    if line.starts_with(UNABLE_PREFIX) {
        UNABLE_TO_DIGEST.to_string()
    } else {
        line.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestOutcome {
    NoComparison,
    FullMatch,
    Inconsistent,
}

impl DigestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestOutcome::NoComparison => "no_comparison",
            DigestOutcome::FullMatch => "full_match",
            DigestOutcome::Inconsistent => "inconsistent",
        }
    }
}

impl std::fmt::Display for DigestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestComparison {
    #[serde(rename = "result")]
    pub outcome: DigestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub digests: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    pub value: String,
}

impl DigestComparison {
    /// Classifies one test vector from the digests of every participating
    /// implementation, in implementation order.
    pub fn classify(value: impl Into<String>, digests: Vec<(String, String)>) -> Self {
        let distinct: BTreeSet<&str> = digests.iter().map(|(_, d)| d.as_str()).collect();

        match distinct.len() {
            0 => Self::no_comparison(value),
            1 => {
                let digest = distinct.into_iter().next().unwrap_or_default().to_string();
                Self::full_match(value, digest)
            }
            _ => Self::inconsistent(value, digests.into_iter().collect()),
        }
    }

    pub fn no_comparison(value: impl Into<String>) -> Self {
        Self {
            outcome: DigestOutcome::NoComparison,
            digest: None,
            digests: BTreeMap::new(),
            missing: Vec::new(),
            value: value.into(),
        }
    }

    pub fn full_match(value: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            outcome: DigestOutcome::FullMatch,
            digest: Some(digest.into()),
            digests: BTreeMap::new(),
            missing: Vec::new(),
            value: value.into(),
        }
    }

    pub fn inconsistent(value: impl Into<String>, digests: BTreeMap<String, String>) -> Self {
        Self {
            outcome: DigestOutcome::Inconsistent,
            digest: None,
            digests,
            missing: Vec::new(),
            value: value.into(),
        }
    }

    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing = missing;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub test_count: usize,
    pub digest_matches: usize,
    pub digest_inconsistent: usize,
    pub digest_no_comparison: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub short_reads: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, comparison: &DigestComparison) {
        self.test_count += 1;
        match comparison.outcome {
            DigestOutcome::NoComparison => self.digest_no_comparison += 1,
            DigestOutcome::FullMatch => self.digest_matches += 1,
            DigestOutcome::Inconsistent => self.digest_inconsistent += 1,
        }
        for name in &comparison.missing {
            *self.short_reads.entry(name.clone()).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.test_count += other.test_count;
        self.digest_matches += other.digest_matches;
        self.digest_inconsistent += other.digest_inconsistent;
        self.digest_no_comparison += other.digest_no_comparison;
        for (name, count) in &other.short_reads {
            *self.short_reads.entry(name.clone()).or_default() += count;
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.digest_inconsistent == 0 && self.short_reads.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "digests")]
    pub comparisons: Vec<DigestComparison>,
    pub summary: RunSummary,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, comparison: DigestComparison) {
        self.summary.record(&comparison);
        self.comparisons.push(comparison);
    }

    pub fn inconsistencies(&self) -> impl Iterator<Item = &DigestComparison> {
        self.comparisons
            .iter()
            .filter(|c| c.outcome == DigestOutcome::Inconsistent)
    }
}
