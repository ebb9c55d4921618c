use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use crate::error::{HarnessError, Result};
use super::comparison::{normalize_digest, DigestComparison, Report};

/// One implementation's captured output for a test file.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    pub label: String,
    pub path: PathBuf,
}

impl CaptureSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

struct CaptureStream {
    label: String,
    reader: Box<dyn BufRead>,
    exhausted: bool,
}

impl CaptureStream {
    fn next_digest(&mut self) -> Result<Option<String>> {
        if self.exhausted {
            return Ok(None);
        }
        match read_line(&mut self.reader)? {
            Some(line) => Ok(Some(normalize_digest(&line))),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

fn read_line(reader: &mut dyn BufRead) -> Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

pub struct DigestComparator;

impl DigestComparator {
    pub fn compare(test_file: &Path, captures: &[CaptureSource]) -> Result<Report> {
        let corpus = File::open(test_file).map_err(|e| HarnessError::Corpus(format!(
            "Cannot open test file {}: {}",
            test_file.display(),
            e
        )))?;

        let mut streams = Vec::with_capacity(captures.len());
        for capture in captures {
            let file = File::open(&capture.path).map_err(|e| HarnessError::Execution(format!(
                "No output captured for {} at {}: {}",
                capture.label,
                capture.path.display(),
                e
            )))?;
            streams.push((capture.label.clone(), Box::new(BufReader::new(file)) as Box<dyn BufRead>));
        }

        Self::compare_readers(BufReader::new(corpus), streams)
    }

    /// Reads one output line per test vector from every stream, in stream order.
    pub fn compare_readers<R: BufRead>(
        mut corpus: R,
        streams: Vec<(String, Box<dyn BufRead>)>,
    ) -> Result<Report> {
        let mut streams: Vec<CaptureStream> = streams
            .into_iter()
            .map(|(label, reader)| CaptureStream { label, reader, exhausted: false })
            .collect();

        let mut report = Report::new();
        let mut line_number = 0usize;

        while let Some(line) = read_line(&mut corpus)? {
            line_number += 1;
            let value = line.trim_end().to_string();

            let mut digests = Vec::with_capacity(streams.len());
            let mut missing = Vec::new();

            for stream in streams.iter_mut() {
                let was_exhausted = stream.exhausted;
                match stream.next_digest()? {
                    Some(digest) => digests.push((stream.label.clone(), digest)),
                    None => {
                        if !was_exhausted {
                            warn!(
                                "{} produced no output for test vector {} onwards",
                                stream.label, line_number
                            );
                        }
                        missing.push(stream.label.clone());
                    }
                }
            }

            report.push(DigestComparison::classify(value, digests).with_missing(missing));
        }

        for stream in streams.iter_mut() {
            if !stream.exhausted && read_line(&mut stream.reader)?.is_some() {
                debug!("{} produced more lines than the {} test vectors", stream.label, line_number);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{DigestOutcome, UNABLE_TO_DIGEST};
    use std::io::Cursor;

    fn stream(label: &str, content: &str) -> (String, Box<dyn BufRead>) {
        (label.to_string(), Box::new(Cursor::new(content.to_string().into_bytes())))
    }

    #[test]
    fn test_two_implementations_agree() {
        let report = DigestComparator::compare_readers(
            Cursor::new("line1\n"),
            vec![stream("a", "abc123\n"), stream("b", "abc123\n")],
        ).unwrap();

        assert_eq!(report.comparisons.len(), 1);
        let c = &report.comparisons[0];
        assert_eq!(c.outcome, DigestOutcome::FullMatch);
        assert_eq!(c.digest.as_deref(), Some("abc123"));
        assert_eq!(c.value, "line1");
        assert_eq!(report.summary.test_count, 1);
        assert_eq!(report.summary.digest_matches, 1);
        assert_eq!(report.summary.digest_inconsistent, 0);
        assert_eq!(report.summary.digest_no_comparison, 0);
    }

    #[test]
    fn test_unanimous_unable_is_full_match() {
        let report = DigestComparator::compare_readers(
            Cursor::new("bad vector\n"),
            vec![
                stream("a", "[unable to digest: unexpected EOF]\n"),
                stream("b", "[unable to digest]\n"),
            ],
        ).unwrap();

        let c = &report.comparisons[0];
        assert_eq!(c.outcome, DigestOutcome::FullMatch);
        assert_eq!(c.digest.as_deref(), Some(UNABLE_TO_DIGEST));
    }

    #[test]
    fn test_divergent_digests_are_inconsistent() {
        let report = DigestComparator::compare_readers(
            Cursor::new("v\n"),
            vec![stream("A", "d1\n"), stream("B", "d2\n")],
        ).unwrap();

        let c = &report.comparisons[0];
        assert_eq!(c.outcome, DigestOutcome::Inconsistent);
        assert_eq!(c.digests.get("A").map(String::as_str), Some("d1"));
        assert_eq!(c.digests.get("B").map(String::as_str), Some("d2"));
        assert_eq!(report.summary.digest_inconsistent, 1);
    }

    #[test]
    fn test_unable_versus_digest_is_inconsistent() {
        let report = DigestComparator::compare_readers(
            Cursor::new("v\n"),
            vec![stream("a", "[unable to digest]\n"), stream("b", "d1\n")],
        ).unwrap();

        assert_eq!(report.comparisons[0].outcome, DigestOutcome::Inconsistent);
        assert_eq!(report.comparisons[0].digests["a"], UNABLE_TO_DIGEST);
    }

    #[test]
    fn test_zero_implementations() {
        let report = DigestComparator::compare_readers(Cursor::new("v1\nv2\nv3\n"), vec![]).unwrap();

        assert!(report.comparisons.iter().all(|c| c.outcome == DigestOutcome::NoComparison));
        assert_eq!(report.summary.test_count, 3);
        assert_eq!(report.summary.digest_no_comparison, 3);
        assert_eq!(report.summary.digest_matches, 0);
        assert_eq!(report.summary.digest_inconsistent, 0);
    }

    #[test]
    fn test_preserves_corpus_order_and_strips_crlf() {
        let report = DigestComparator::compare_readers(
            Cursor::new("first\r\nsecond\r\nthird\n"),
            vec![stream("a", "x\r\ny\r\nz\n"), stream("b", "x\ny\nq\n")],
        ).unwrap();

        let values: Vec<&str> = report.comparisons.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["first", "second", "third"]);
        assert_eq!(report.summary.digest_matches, 2);
        assert_eq!(report.summary.digest_inconsistent, 1);
    }

    #[test]
    fn test_short_read_drops_implementation() {
        let report = DigestComparator::compare_readers(
            Cursor::new("v1\nv2\nv3\n"),
            vec![stream("a", "d1\nd2\nd3\n"), stream("b", "d1\n")],
        ).unwrap();

        assert_eq!(report.comparisons[0].outcome, DigestOutcome::FullMatch);
        assert!(report.comparisons[0].missing.is_empty());

        for c in &report.comparisons[1..] {
            assert_eq!(c.outcome, DigestOutcome::FullMatch);
            assert_eq!(c.missing, vec!["b".to_string()]);
        }
        assert_eq!(report.summary.short_reads["b"], 2);
        assert!(!report.summary.is_consistent());
    }

    #[test]
    fn test_all_streams_short_is_no_comparison() {
        let report = DigestComparator::compare_readers(
            Cursor::new("v1\nv2\n"),
            vec![stream("a", "d1\n"), stream("b", "d1\n")],
        ).unwrap();

        assert_eq!(report.comparisons[1].outcome, DigestOutcome::NoComparison);
        assert_eq!(report.comparisons[1].missing.len(), 2);
    }

    #[test]
    fn test_extra_output_lines_ignored() {
        let report = DigestComparator::compare_readers(
            Cursor::new("v1\n"),
            vec![stream("a", "d1\nextra\n"), stream("b", "d1\n")],
        ).unwrap();

        assert_eq!(report.comparisons.len(), 1);
        assert!(report.summary.is_consistent());
    }

    #[test]
    fn test_compare_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let corpus = dir.path().join("tests.txt");
        let a = dir.path().join("a.out");
        let b = dir.path().join("b.out");
        std::fs::write(&corpus, "v1\nv2\n").unwrap();
        std::fs::write(&a, "d1\nd2\n").unwrap();
        std::fs::write(&b, "d1\nd3\n").unwrap();

        let report = DigestComparator::compare(
            &corpus,
            &[CaptureSource::new("a", &a), CaptureSource::new("b", &b)],
        ).unwrap();

        assert_eq!(report.summary.digest_matches, 1);
        assert_eq!(report.summary.digest_inconsistent, 1);
        assert_eq!(report.inconsistencies().count(), 1);
    }

    #[test]
    fn test_missing_capture_file_is_execution_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let corpus = dir.path().join("tests.txt");
        std::fs::write(&corpus, "v1\n").unwrap();

        let err = DigestComparator::compare(
            &corpus,
            &[CaptureSource::new("a", dir.path().join("a.out"))],
        ).unwrap_err();
        assert!(matches!(err, HarnessError::Execution(_)));
    }
}
