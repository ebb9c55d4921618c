use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hashconform::{
    HarnessError, HarnessOptions, ManifestLoader, Orchestrator, ReportFormat, ToolDependencies, render_summary,
};

#[derive(Parser)]
#[command(name = "hashconform")]
#[command(about = "Builds several hash implementations and checks that they agree on every test vector")]
#[command(version)]
struct Cli {
    /// Test an additional implementation: name,location[,revision]. Name must be one of `--list`;
    /// location is a local path or URL; revision is a branch or commit and defaults to `main`
    #[arg(short, long = "implementation", value_name = "DESCRIPTION")]
    implementations: Vec<String>,

    /// Override the test-vector source: location[,revision]
    #[arg(short = 'I', long = "ion-hash-test", value_name = "DESCRIPTION")]
    ion_hash_test: Option<String>,

    /// Test only the implementations given with --implementation
    #[arg(short = 'L', long)]
    local_only: bool,

    /// List the implementations that can be built
    #[arg(short, long)]
    list: bool,

    /// Path to the git executable
    #[arg(long, value_name = "PATH")]
    git: Option<String>,

    /// Location of any tool declared in the manifest, as NAME=PATH (repeatable)
    #[arg(long = "tool", value_name = "NAME=PATH")]
    tools: Vec<String>,

    /// Root directory for all generated output
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Results file (default: <output-dir>/hash-test-driver-results.json)
    #[arg(short, long)]
    results_file: Option<PathBuf>,

    /// Results format (default: from the results file extension, else json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Harness manifest describing builds, defaults and the test source
    #[arg(short, long, env = "HASHCONFORM_CONFIG")]
    config: Option<PathBuf>,

    /// Hash algorithm passed to every implementation (default: from the manifest)
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Per-subprocess time limit in seconds for installs and runs
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Exit with status 2 when any vector is inconsistent or short
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Test files to use instead of generating the corpus (glob patterns allowed)
    #[arg(value_name = "TEST_FILE")]
    test_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Yaml => ReportFormat::Yaml,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("hashconform=debug,info")
    } else {
        EnvFilter::new("hashconform=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &HarnessError) {
    eprintln!("\x1b[31m✗ Error [{}]:\x1b[0m {}", err.error_code(), err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("\n\x1b[33mSuggestion:\x1b[0m");
        eprintln!("  {}", suggestion);
    }
}

async fn run(cli: Cli) -> Result<ExitCode, HarnessError> {
    let manifest = ManifestLoader::load_or_embedded(cli.config.as_deref())?;

    let mut tool_overrides = BTreeMap::new();
    for spec in &cli.tools {
        let (name, path) = ToolDependencies::parse_override(spec)?;
        tool_overrides.insert(name, path);
    }
    if let Some(git) = cli.git {
        tool_overrides.insert("git".to_string(), git);
    }

    let options = HarnessOptions {
        implementations: cli.implementations,
        test_source: cli.ion_hash_test,
        local_only: cli.local_only,
        output_dir: cli.output_dir,
        results_file: cli.results_file,
        format: cli.format.map(ReportFormat::from),
        tool_overrides,
        algorithm: cli.algorithm,
        test_files: cli.test_files,
        timeout: cli.timeout.map(Duration::from_secs),
    };

    let orchestrator = Orchestrator::new(manifest, options)?;

    if cli.list {
        println!("{}", orchestrator.listing());
        return Ok(ExitCode::SUCCESS);
    }

    info!("Testing with algorithm {}", orchestrator.algorithm());
    let (report, path) = orchestrator.execute().await?;

    println!("{}", render_summary(&report));
    println!("\nResults: {}", path.display());

    if cli.strict && !report.is_consistent() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
