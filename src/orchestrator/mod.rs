mod options;

use glob::glob;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use crate::build::BuildRegistry;
use crate::compare::DigestComparator;
use crate::config::HarnessManifest;
use crate::corpus::{count_lines, sha256_file, truncate_head, CorpusGenerator};
use crate::error::{HarnessError, Result};
use crate::report::{write_report, HarnessReport, ImplementationInfo, TestFileReport};
use crate::resource::{DescriptorParser, Git, ResolvedResource, ResourceDescriptor, ResourceResolver, SourceControl};
use crate::runner::ImplementationRunner;
use crate::tool::ToolDependencies;

pub use options::HarnessOptions;

pub const CORPUS_FILE: &str = "tests.txt";

pub struct Orchestrator {
    manifest: HarnessManifest,
    options: HarnessOptions,
    registry: BuildRegistry,
    corpus: Box<dyn CorpusGenerator>,
    source_control: Option<Arc<dyn SourceControl>>,
}

impl Orchestrator {
    pub fn new(manifest: HarnessManifest, options: HarnessOptions) -> Result<Self> {
        let registry = manifest.build_registry()?;
        let corpus = manifest.corpus_generator()?;
        Ok(Self {
            manifest,
            options,
            registry,
            corpus,
            source_control: None,
        })
    }

    pub fn with_registry(mut self, registry: BuildRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_corpus_generator(mut self, corpus: Box<dyn CorpusGenerator>) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn with_source_control(mut self, source_control: Arc<dyn SourceControl>) -> Self {
        self.source_control = Some(source_control);
        self
    }

    /// Names accepted by `--implementation`; the test source is not one of them.
    pub fn list(&self) -> Vec<String> {
        self.registry
            .names()
            .filter(|name| *name != self.manifest.test_source.name)
            .map(|name| name.to_string())
            .collect()
    }

    /// Text printed by `--list`.
    pub fn listing(&self) -> String {
        let names = self.list();
        if names.is_empty() {
            "No implementation builds are configured. Pass --config with a manifest \
             that declares builds (see demos/harness.yaml)."
                .to_string()
        } else {
            names.join("\n")
        }
    }

    pub fn algorithm(&self) -> &str {
        self.options.algorithm.as_deref().unwrap_or(&self.manifest.algorithm)
    }

    fn install_timeout(&self) -> Duration {
        self.options.timeout.unwrap_or_else(|| self.manifest.timeouts.install())
    }

    fn run_timeout(&self) -> Duration {
        self.options.timeout.unwrap_or_else(|| self.manifest.timeouts.run())
    }

    fn tools(&self) -> ToolDependencies {
        self.options
            .tool_overrides
            .iter()
            .fold(self.manifest.tool_dependencies(), |tools, (name, path)| {
                tools.with_override(name, Some(path.clone()))
            })
    }

    /// Runs the whole pipeline and writes the results file.
    pub async fn execute(&self) -> Result<(HarnessReport, PathBuf)> {
        let report = self.run().await?;
        let output_root = self.output_root()?;
        let path = self.options.results_path(&output_root);
        write_report(&report, &path, self.options.report_format(&path))?;
        info!("Results written to {}", path.display());
        Ok((report, path))
    }

    pub async fn run(&self) -> Result<HarnessReport> {
        let output_root = self.output_root()?;
        fs::create_dir_all(&output_root)?;

        let algorithm = self.algorithm().to_string();
        if algorithm.trim().is_empty() || algorithm.contains(char::is_whitespace) {
            return Err(HarnessError::Configuration(format!("Invalid algorithm '{}'", algorithm)));
        }

        let descriptors = self.implementation_descriptors()?;
        let test_source = self.test_source_descriptor()?;

        let tools = self.tools();
        tools.check().await?;

        let source_control: Arc<dyn SourceControl> = match &self.source_control {
            Some(sc) => Arc::clone(sc),
            None => Arc::new(Git::new(tools.path("git")?, self.install_timeout())),
        };
        let resolver = ResourceResolver::new(&output_root, source_control, self.registry.clone())
            .with_install_timeout(self.install_timeout())
            .with_lock_timeout(self.manifest.timeouts.lock());

        let mut implementations = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            implementations.push(resolver.resolve(descriptor).await?);
        }

        let test_files = if self.options.test_files.is_empty() {
            let source = resolver.resolve(&test_source).await?;
            vec![self.generate_corpus(&source, &output_root).await?]
        } else {
            expand_test_files(&self.options.test_files)?
        };

        let pairs: Vec<(&str, &str)> = implementations
            .iter()
            .map(|r| (r.name(), r.identifier()))
            .collect();
        let labels = participant_labels(&pairs);

        let infos = implementations
            .iter()
            .zip(&labels)
            .map(|(r, label)| ImplementationInfo::new(label, r))
            .collect();
        let mut report = HarnessReport::new(&algorithm, infos);

        let capture_dirs = capture_dir_names(&test_files);
        for (test_file, capture_dir) in test_files.iter().zip(capture_dirs) {
            let runner = ImplementationRunner::new(output_root.join("results").join(capture_dir))
                .with_timeout(self.run_timeout());

            let mut captures = Vec::with_capacity(implementations.len());
            for (resource, label) in implementations.iter().zip(&labels) {
                captures.push(runner.run_as(resource, label, test_file, &algorithm).await?.source());
            }

            let file_report = DigestComparator::compare(test_file, &captures)?;
            let s = &file_report.summary;
            info!(
                "{}: {} vectors, {} matched, {} inconsistent, {} not compared",
                test_file.display(),
                s.test_count,
                s.digest_matches,
                s.digest_inconsistent,
                s.digest_no_comparison
            );
            if s.digest_inconsistent > 0 {
                warn!("{} vectors in {} have inconsistent digests", s.digest_inconsistent, test_file.display());
            }

            report.add_test_file(TestFileReport {
                path: test_file.clone(),
                sha256: sha256_file(test_file)?,
                report: file_report,
            });
        }

        Ok(report)
    }

    fn output_root(&self) -> Result<PathBuf> {
        let dir = &self.options.output_dir;
        if dir.is_absolute() {
            Ok(dir.clone())
        } else {
            Ok(std::env::current_dir()?.join(dir))
        }
    }

    fn implementation_descriptors(&self) -> Result<Vec<ResourceDescriptor>> {
        let mut descriptors = DescriptorParser::new().parse_all_named(&self.options.implementations)?;
        if !self.options.local_only {
            descriptors.extend(self.manifest.default_descriptors()?);
        }

        for descriptor in &descriptors {
            let name = descriptor.name().unwrap_or_default();
            if name == self.manifest.test_source.name {
                return Err(HarnessError::Configuration(format!(
                    "{} is the test source, not an implementation",
                    name
                )));
            }
            if self.registry.get(name)?.execute().is_none() {
                return Err(HarnessError::Configuration(format!(
                    "Implementation {} is not executable.",
                    name
                )));
            }
        }
        Ok(descriptors)
    }

    fn test_source_descriptor(&self) -> Result<ResourceDescriptor> {
        let descriptor = match &self.options.test_source {
            Some(description) => DescriptorParser::new()
                .parse_anonymous(description)?
                .with_name(&self.manifest.test_source.name),
            None => self.manifest.test_source_descriptor(),
        };
        self.registry.get(&self.manifest.test_source.name)?;
        Ok(descriptor)
    }

    async fn generate_corpus(&self, source: &ResolvedResource, output_root: &Path) -> Result<PathBuf> {
        let corpus = output_root.join(CORPUS_FILE);
        self.corpus.generate(source.build_dir(), &corpus).await?;

        let corpus = match self.manifest.corpus.max_vectors {
            Some(max) => truncate_head(&corpus, max)?,
            None => corpus,
        };
        info!("Test corpus {} has {} vectors", corpus.display(), count_lines(&corpus)?);
        Ok(corpus)
    }
}

/// Capture labels: the implementation name, or its identifier when the same
/// name is tested more than once.
pub fn participant_labels(resources: &[(&str, &str)]) -> Vec<String> {
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for (name, _) in resources {
        *name_counts.entry(*name).or_default() += 1;
    }

    let mut seen = HashSet::new();
    resources
        .iter()
        .map(|(name, identifier)| {
            let base = if name_counts[name] > 1 { *identifier } else { *name };
            let mut label = base.to_string();
            let mut n = 2;
            while !seen.insert(label.clone()) {
                label = format!("{}-{}", base, n);
                n += 1;
            }
            label
        })
        .collect()
}

fn capture_dir_names(test_files: &[PathBuf]) -> Vec<String> {
    let mut seen = HashSet::new();
    test_files
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("tests-{}", i + 1));
            if seen.insert(base.clone()) {
                base
            } else {
                format!("{}-{}", base, i + 1)
            }
        })
        .collect()
}

fn expand_test_files(patterns: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();
        if !pattern_str.contains(['*', '?', '[']) {
            if !pattern.is_file() {
                return Err(HarnessError::Corpus(format!("Test file {} not found", pattern.display())));
            }
            files.push(pattern.clone());
            continue;
        }

        let mut matched: Vec<PathBuf> = glob(&pattern_str)
            .map_err(|e| HarnessError::Corpus(e.to_string()))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matched.is_empty() {
            return Err(HarnessError::Corpus(format!("No test files match {}", pattern_str)));
        }
        matched.sort();
        files.extend(matched);
    }
    Ok(files)
}
