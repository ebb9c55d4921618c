use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use super::HarnessReport;

#[derive(Debug, Clone, Tabled)]
pub struct SummaryTableRow {
    #[tabled(rename = "Test file")]
    pub file: String,
    #[tabled(rename = "Vectors")]
    pub vectors: usize,
    #[tabled(rename = "Match")]
    pub matches: usize,
    #[tabled(rename = "Inconsistent")]
    pub inconsistent: usize,
    #[tabled(rename = "No comparison")]
    pub no_comparison: usize,
    #[tabled(rename = "Short reads")]
    pub short_reads: String,
}

pub fn render_summary(report: &HarnessReport) -> String {
    let mut output = String::new();

    let names: Vec<&str> = report.implementations.iter().map(|i| i.label.as_str()).collect();
    output.push_str(&format!("Algorithm: {}\n", report.algorithm));
    output.push_str(&format!("Implementations: {}\n\n", if names.is_empty() { "-".to_string() } else { names.join(", ") }));

    let rows: Vec<SummaryTableRow> = report.test_files.iter().map(|f| {
        let s = &f.report.summary;
        let short_reads = if s.short_reads.is_empty() {
            "-".to_string()
        } else {
            s.short_reads
                .iter()
                .map(|(name, n)| format!("{} ({})", name, n))
                .collect::<Vec<_>>()
                .join(", ")
        };
        SummaryTableRow {
            file: f.path.display().to_string(),
            vectors: s.test_count,
            matches: s.digest_matches,
            inconsistent: s.digest_inconsistent,
            no_comparison: s.digest_no_comparison,
            short_reads,
        }
    }).collect();

    let mut table = Table::new(rows);
    table.with(Style::markdown());
    output.push_str(&table.to_string());
    output.push('\n');

    for file in &report.test_files {
        for c in file.report.inconsistencies() {
            output.push_str(&format!("\n{} {}\n", "✗".red(), c.value));
            for (name, digest) in &c.digests {
                output.push_str(&format!("    {:<24} {}\n", name, digest));
            }
        }
    }

    let s = &report.summary;
    let verdict = if s.digest_inconsistent > 0 {
        format!("✗ {} of {} vectors inconsistent", s.digest_inconsistent, s.test_count).red().to_string()
    } else if !s.short_reads.is_empty() {
        format!("⚠ {} vectors consistent, with short output", s.test_count).yellow().to_string()
    } else if s.test_count > 0 && s.digest_no_comparison == s.test_count {
        format!("○ {} vectors, nothing to compare", s.test_count).dimmed().to_string()
    } else {
        format!("✓ {} vectors consistent", s.test_count).green().to_string()
    };
    output.push('\n');
    output.push_str(&verdict);

    output
}
