pub mod error;
pub mod process;
pub mod tool;
pub mod resource;
pub mod build;
pub mod config;
pub mod corpus;
pub mod runner;
pub mod compare;
pub mod report;
pub mod orchestrator;

pub use error::{HarnessError, Result};
pub use tool::ToolDependencies;
pub use resource::{DescriptorParser, Git, ResolvedResource, ResourceDescriptor, ResourceResolver, SourceControl, DEFAULT_REVISION};
pub use build::{BuildRegistry, BuildStrategy, CommandBuildStrategy, InstallContext};
pub use config::{HarnessManifest, ManifestLoader};
pub use corpus::{CommandCorpus, CorpusGenerator, FileCorpus};
pub use runner::{ImplementationRunner, RunCapture};
pub use compare::{CaptureSource, DigestComparator, DigestComparison, DigestOutcome, Report, RunSummary, UNABLE_TO_DIGEST};
pub use report::{HarnessReport, ImplementationInfo, ReportFormat, TestFileReport, render_summary, write_report};
pub use orchestrator::{HarnessOptions, Orchestrator};
