use async_trait::async_trait;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use crate::error::{HarnessError, Result};
use crate::process::{Subprocess, DEFAULT_TIMEOUT_SECS};

/// Produces the test-vector corpus, one vector per line, from the resolved
/// test-source checkout.
#[async_trait]
pub trait CorpusGenerator: Send + Sync {
    async fn generate(&self, source_dir: &Path, output: &Path) -> Result<()>;
}

/// Copies the non-empty lines of a file inside the test source.
#[derive(Debug, Clone)]
pub struct FileCorpus {
    relative_path: PathBuf,
}

impl FileCorpus {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self { relative_path: relative_path.into() }
    }
}

#[async_trait]
impl CorpusGenerator for FileCorpus {
    async fn generate(&self, source_dir: &Path, output: &Path) -> Result<()> {
        let source = source_dir.join(&self.relative_path);
        let input = File::open(&source).map_err(|e| HarnessError::Corpus(format!(
            "Cannot read {}: {}",
            source.display(),
            e
        )))?;

        let mut writer = BufWriter::new(File::create(output)?);
        let mut count = 0usize;
        for line in BufReader::new(input).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            writeln!(writer, "{}", line.trim_end())?;
            count += 1;
        }
        writer.flush()?;

        info!("Wrote {} test vectors to {}", count, output.display());
        Ok(())
    }
}

/// Runs a generator command inside the test source. `{source}` and `{output}`
/// in its arguments are replaced with the checkout and corpus paths.
#[derive(Debug, Clone)]
pub struct CommandCorpus {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandCorpus {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(HarnessError::Configuration("Corpus command has no program".to_string()));
        }
        Ok(Self {
            argv,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn expand(&self, source_dir: &Path, output: &Path) -> Vec<String> {
        let source = source_dir.display().to_string();
        let output = output.display().to_string();
        self.argv
            .iter()
            .map(|a| a.replace("{source}", &source).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl CorpusGenerator for CommandCorpus {
    async fn generate(&self, source_dir: &Path, output: &Path) -> Result<()> {
        let argv = self.expand(source_dir, output);
        let cmd = Subprocess::new(&argv[0])
            .args(&argv[1..])
            .current_dir(source_dir)
            .timeout(self.timeout);

        info!("Generating test vectors: {}", cmd.display());
        let out = cmd.capture().await?;
        if !out.status.success() {
            return Err(HarnessError::Corpus(format!(
                "'{}' failed ({}): {}",
                cmd.display(),
                out.status,
                out.stderr.trim()
            )));
        }
        if !output.is_file() {
            return Err(HarnessError::Corpus(format!(
                "'{}' did not produce {}",
                cmd.display(),
                output.display()
            )));
        }
        Ok(())
    }
}

/// Writes the first `max_vectors` lines of `corpus` to `<corpus>.head`.
pub fn truncate_head(corpus: &Path, max_vectors: usize) -> Result<PathBuf> {
    let mut name = corpus.as_os_str().to_os_string();
    name.push(".head");
    let head = PathBuf::from(name);

    let reader = BufReader::new(File::open(corpus)?);
    let mut writer = BufWriter::new(File::create(&head)?);
    for line in reader.lines().take(max_vectors) {
        writeln!(writer, "{}", line?)?;
    }
    writer.flush()?;

    Ok(head)
}

pub(crate) fn count_lines(path: &Path) -> Result<usize> {
    Ok(BufReader::new(File::open(path)?).lines().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_corpus_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("vectors.ion"), "{a:1}\n\n  \n{b:2}  \n").unwrap();
        let output = dir.path().join("tests.txt");

        tokio_test::block_on(FileCorpus::new("vectors.ion").generate(dir.path(), &output)).unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "{a:1}\n{b:2}\n");
    }

    #[test]
    fn test_file_corpus_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = tokio_test::block_on(
            FileCorpus::new("absent.ion").generate(dir.path(), &dir.path().join("out")),
        ).unwrap_err();
        assert!(matches!(err, HarnessError::Corpus(_)));
    }

    #[test]
    fn test_command_corpus_expands_placeholders() {
        let cmd = CommandCorpus::new(vec![
            "gen".to_string(),
            "--in={source}/vectors".to_string(),
            "{output}".to_string(),
        ]).unwrap();

        let argv = cmd.expand(Path::new("/src"), Path::new("/out/tests.txt"));
        assert_eq!(argv, vec!["gen", "--in=/src/vectors", "/out/tests.txt"]);
    }

    #[test]
    fn test_command_corpus_requires_program() {
        assert!(CommandCorpus::new(vec![]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_corpus_runs_in_source_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("seed"), "v1\nv2\n").unwrap();
        let output = dir.path().join("tests.txt");

        let cmd = CommandCorpus::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "cp seed {output}".to_string(),
        ]).unwrap();
        cmd.generate(dir.path(), &output).await.unwrap();

        assert_eq!(count_lines(&output).unwrap(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_corpus_without_output_fails() {
        let dir = TempDir::new().unwrap();
        let cmd = CommandCorpus::new(vec!["true".to_string()]).unwrap();
        let err = cmd.generate(dir.path(), &dir.path().join("tests.txt")).await.unwrap_err();
        assert!(err.to_string().contains("did not produce"));
    }

    #[test]
    fn test_truncate_head() {
        let dir = TempDir::new().unwrap();
        let corpus = dir.path().join("tests.txt");
        std::fs::write(&corpus, "v1\nv2\nv3\n").unwrap();

        let head = truncate_head(&corpus, 2).unwrap();
        assert_eq!(head, dir.path().join("tests.txt.head"));
        assert_eq!(std::fs::read_to_string(&head).unwrap(), "v1\nv2\n");
    }
}
