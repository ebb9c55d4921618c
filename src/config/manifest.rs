use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use crate::build::{BuildRegistry, CommandBuildStrategy};
use crate::corpus::{CommandCorpus, CorpusGenerator, FileCorpus};
use crate::error::{HarnessError, Result};
use crate::resource::{DescriptorParser, ResourceDescriptor};
use crate::tool::ToolDependencies;

const DEFAULT_MANIFEST: &str = include_str!("default_manifest.yaml");

fn default_algorithm() -> String {
    "md5".to_string()
}

fn default_tools() -> BTreeMap<String, String> {
    BTreeMap::from([("git".to_string(), "git".to_string())])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessManifest {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_tools")]
    pub tools: BTreeMap<String, String>,
    #[serde(default)]
    pub timeouts: Timeouts,
    pub test_source: TestSourceDef,
    #[serde(default)]
    pub corpus: CorpusDef,
    #[serde(default)]
    pub default_implementations: Vec<String>,
    #[serde(default)]
    pub builds: BTreeMap<String, BuildDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    #[serde(default = "Timeouts::default_install")]
    pub install_secs: u64,
    #[serde(default = "Timeouts::default_run")]
    pub run_secs: u64,
    #[serde(default = "Timeouts::default_lock")]
    pub lock_secs: u64,
}

impl Timeouts {
    fn default_install() -> u64 {
        1800
    }

    fn default_run() -> u64 {
        600
    }

    fn default_lock() -> u64 {
        3600
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }

    pub fn run(&self) -> Duration {
        Duration::from_secs(self.run_secs)
    }

    pub fn lock(&self) -> Duration {
        Duration::from_secs(self.lock_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            install_secs: Self::default_install(),
            run_secs: Self::default_run(),
            lock_secs: Self::default_lock(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSourceDef {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusDef {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub max_vectors: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDef {
    #[serde(default)]
    pub install: Vec<Vec<String>>,
    #[serde(default)]
    pub execute: Option<PathBuf>,
}

impl HarnessManifest {
    pub fn validate(&self) -> Result<()> {
        let parser = DescriptorParser::new();

        if self.algorithm.trim().is_empty() || self.algorithm.contains(char::is_whitespace) {
            return Err(HarnessError::Configuration(format!(
                "Invalid algorithm '{}'",
                self.algorithm
            )));
        }

        for name in self.builds.keys() {
            parser.validate_name(name, name)?;
        }

        if !self.builds.contains_key(&self.test_source.name) {
            return Err(HarnessError::Configuration(format!(
                "No installer for test source {}.",
                self.test_source.name
            )));
        }

        match (&self.corpus.file, &self.corpus.command) {
            (Some(_), Some(_)) => {
                return Err(HarnessError::Configuration(
                    "corpus: set either 'file' or 'command', not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(HarnessError::Configuration(
                    "corpus: one of 'file' or 'command' is required".to_string(),
                ))
            }
            _ => {}
        }

        if self.corpus.max_vectors == Some(0) {
            return Err(HarnessError::Configuration("corpus.max_vectors must be positive".to_string()));
        }

        for descriptor in self.default_descriptors()? {
            let name = descriptor.name().unwrap_or_default();
            if !self.builds.contains_key(name) {
                return Err(HarnessError::Configuration(format!("No installer for {}.", name)));
            }
        }

        Ok(())
    }

    pub fn default_descriptors(&self) -> Result<Vec<ResourceDescriptor>> {
        DescriptorParser::new().parse_all_named(&self.default_implementations)
    }

    pub fn test_source_descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(
            &self.test_source.name,
            &self.test_source.location,
            self.test_source.revision.clone(),
        )
    }

    pub fn build_registry(&self) -> Result<BuildRegistry> {
        let mut registry = BuildRegistry::new();
        for (name, def) in &self.builds {
            let strategy = CommandBuildStrategy::new(def.install.clone(), def.execute.clone())?;
            registry.register(name.clone(), Arc::new(strategy));
        }
        Ok(registry)
    }

    pub fn corpus_generator(&self) -> Result<Box<dyn CorpusGenerator>> {
        match (&self.corpus.file, &self.corpus.command) {
            (Some(file), None) => Ok(Box::new(FileCorpus::new(file))),
            (None, Some(argv)) => Ok(Box::new(
                CommandCorpus::new(argv.clone())?.with_timeout(self.timeouts.install()),
            )),
            _ => Err(HarnessError::Configuration(
                "corpus: set exactly one of 'file' or 'command'".to_string(),
            )),
        }
    }

    pub fn tool_dependencies(&self) -> ToolDependencies {
        ToolDependencies::new(self.tools.clone())
    }

    /// Implementation names that can be passed to `--implementation`.
    pub fn implementation_names(&self) -> Vec<&str> {
        self.builds
            .keys()
            .map(|k| k.as_str())
            .filter(|name| *name != self.test_source.name)
            .collect()
    }
}

pub struct ManifestLoader;

impl ManifestLoader {
    pub fn load(path: impl AsRef<Path>) -> Result<HarnessManifest> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|_| HarnessError::ManifestNotFound(path.to_path_buf()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<HarnessManifest> {
        let manifest: HarnessManifest = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn embedded() -> Result<HarnessManifest> {
        Self::parse(DEFAULT_MANIFEST)
    }

    pub fn load_or_embedded(path: Option<&Path>) -> Result<HarnessManifest> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
algorithm: sha256
tools:
  git: /usr/bin/git
test_source:
  name: vectors
  location: /srv/vectors
corpus:
  command: ["python3", "gen.py", "{output}"]
  max_vectors: 50
default_implementations:
  - "impl-a,https://example.com/impl-a.git"
builds:
  vectors:
    install: []
  impl-a:
    install:
      - ["make"]
    execute: bin/hash
  impl-b:
    install:
      - ["sh", "build.sh"]
    execute: out/hash
"#;

    #[test]
    fn test_embedded_manifest_is_valid() {
        let manifest = ManifestLoader::embedded().unwrap();
        assert_eq!(manifest.algorithm, "md5");
        assert_eq!(manifest.test_source.name, "ion-hash-test");
        assert!(manifest.implementation_names().is_empty());
        assert_eq!(manifest.tool_dependencies().path("git").unwrap(), "git");
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = ManifestLoader::parse(MANIFEST).unwrap();
        assert_eq!(manifest.algorithm, "sha256");
        assert_eq!(manifest.timeouts.run_secs, 600);
        assert_eq!(manifest.corpus.max_vectors, Some(50));
        assert_eq!(manifest.implementation_names(), vec!["impl-a", "impl-b"]);

        let defaults = manifest.default_descriptors().unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name(), Some("impl-a"));

        let source = manifest.test_source_descriptor();
        assert_eq!(source.name(), Some("vectors"));
        assert_eq!(source.revision(), crate::resource::DEFAULT_REVISION);
    }

    #[test]
    fn test_build_registry_from_manifest() {
        let manifest = ManifestLoader::parse(MANIFEST).unwrap();
        let registry = manifest.build_registry().unwrap();

        assert_eq!(registry.len(), 3);
        let strategy = registry.get("impl-b").unwrap();
        assert_eq!(strategy.execute(), Some(Path::new("out/hash")));
        assert_eq!(registry.get("vectors").unwrap().execute(), None);
    }

    #[test]
    fn test_unknown_default_implementation() {
        let yaml = MANIFEST.replace("impl-a,https", "impl-z,https");
        let err = ManifestLoader::parse(&yaml).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: No installer for impl-z.");
    }

    #[test]
    fn test_test_source_needs_installer() {
        let yaml = MANIFEST.replace("  vectors:\n    install: []\n", "");
        let err = ManifestLoader::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("No installer for test source vectors"));
    }

    #[test]
    fn test_corpus_requires_exactly_one_source() {
        let yaml = MANIFEST.replace(
            "  command: [\"python3\", \"gen.py\", \"{output}\"]\n",
            "  command: [\"gen\"]\n  file: tests.ion\n",
        );
        assert!(ManifestLoader::parse(&yaml).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = format!("{}\nparallel: true\n", MANIFEST);
        assert!(matches!(ManifestLoader::parse(&yaml).unwrap_err(), HarnessError::Yaml(_)));
    }

    #[test]
    fn test_sample_manifest_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/harness.yaml");
        let manifest = ManifestLoader::load(&path).unwrap();
        assert_eq!(manifest.timeouts.install_secs, 2400);
        assert_eq!(manifest.timeouts.lock_secs, 3600);
        assert_eq!(manifest.implementation_names(), vec!["ion-hash-java", "local-script"]);
        assert_eq!(manifest.tool_dependencies().names().count(), 2);
    }

    #[test]
    fn test_missing_manifest_file() {
        let err = ManifestLoader::load("/no/such/harness.yaml").unwrap_err();
        assert!(matches!(err, HarnessError::ManifestNotFound(_)));
    }

    #[test]
    fn test_invalid_algorithm() {
        let yaml = MANIFEST.replace("algorithm: sha256", "algorithm: \"sha 256\"");
        assert!(ManifestLoader::parse(&yaml).is_err());
    }
}
