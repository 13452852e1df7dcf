use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::ReportError;
use crate::core::stress::StressConfig;

/// Outcome of one stress run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressReport {
    pub run_id: u64,
    pub config: StressConfig,
    pub pushed: usize,
    pub popped: usize,
    pub duplicates: usize,      // pops beyond the first for a tag
    pub missing: usize,         // pushed tags never popped
    pub fifo_violations: usize, // same-producer items seen out of order
    pub remaining: usize,       // queue length after all workers joined
    pub elapsed_ms: u64,
    pub verified: bool,
}

impl Display for StressReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run {}: {} producers x {} items, {} consumers | pushed {} popped {} | duplicates {} missing {} fifo_violations {} remaining {} | {} ms | {}",
            self.run_id,
            self.config.producers,
            self.config.items_per_producer,
            self.config.consumers,
            self.pushed,
            self.popped,
            self.duplicates,
            self.missing,
            self.fifo_violations,
            self.remaining,
            self.elapsed_ms,
            if self.verified { "verified" } else { "FAILED" },
        )
    }
}

/// Append reports to `path` as NDJSON, creating the file if needed
pub fn append_reports(reports: &[StressReport], path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;

    for report in reports {
        let json = serde_json::to_string(report)?;
        writeln!(file, "{}", json)?; // one JSON object per line
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(run_id: u64) -> StressReport {
        StressReport {
            run_id,
            config: StressConfig::default(),
            pushed: 40_000,
            popped: 40_000,
            duplicates: 0,
            missing: 0,
            fifo_violations: 0,
            remaining: 0,
            elapsed_ms: 12,
            verified: true,
        }
    }

    #[test]
    fn append_writes_one_line_per_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.ndjson");

        append_reports(&[sample(1)], &path).unwrap();
        append_reports(&[sample(2), sample(3)], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<StressReport> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.iter().map(|r| r.run_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(parsed[0], sample(1));
    }

    #[test]
    fn append_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("runs.ndjson");
        assert!(matches!(append_reports(&[sample(1)], &path), Err(ReportError::Io(_))));
    }

    #[test]
    fn display_marks_failed_runs() {
        let mut report = sample(7);
        report.missing = 1;
        report.verified = false;
        let line = report.to_string();
        assert!(line.starts_with("run 7:"));
        assert!(line.ends_with("FAILED"));
    }
}
