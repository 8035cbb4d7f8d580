// WHY: A machine-readable record of a filing run, so failures can be
// reviewed after a large batch without scraping the logs.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

/// What happened to one file
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Copied,
    Moved,
    Skipped,
    Failed,
}

/// Per-file outcome of a filing run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileOutcome {
    /// Source path as given to the run
    pub path: String,
    pub status: FileStatus,
    /// Document date, when one was found
    pub date: Option<NaiveDate>,
    /// Where the file was (or would have been) placed
    pub destination: Option<String>,
    /// Short machine-readable failure kind
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

/// Summary of a whole run
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Files copied or moved
    pub files_processed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Copied | FileStatus::Moved => self.files_processed += 1,
            FileStatus::Skipped => self.files_skipped += 1,
            FileStatus::Failed => self.files_failed += 1,
        }
        self.files.push(outcome);
    }

    pub fn total(&self) -> u64 {
        self.files_processed + self.files_skipped + self.files_failed
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.status == FileStatus::Failed)
    }
}

/// Write the report as pretty JSON
pub async fn write_run_report(report_path: &Path, report: &RunReport) -> Result<()> {
    let file = tokio::fs::File::create(report_path)
        .await
        .with_context(|| format!("Failed to create report file {}", report_path.display()))?;
    let mut writer = BufWriter::new(file);

    let json = serde_json::to_string_pretty(report)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    info!("Run report written to {}", report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn outcome(status: FileStatus) -> FileOutcome {
        FileOutcome {
            path: "diary/entry.md".to_string(),
            status,
            date: NaiveDate::from_ymd_opt(2023, 10, 15),
            destination: Some("out/2023/10/entry.md".to_string()),
            error_kind: None,
            error: None,
        }
    }

    #[test]
    fn test_record_counts() {
        let mut report = RunReport::default();
        report.record(outcome(FileStatus::Copied));
        report.record(outcome(FileStatus::Moved));
        report.record(outcome(FileStatus::Skipped));
        report.record(outcome(FileStatus::Failed));

        assert_eq!(report.files_processed, 2);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.total(), 4);
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn test_write_run_report() {
        let temp_dir = TempDir::new().unwrap();
        let report_path = temp_dir.path().join("report.json");

        let mut report = RunReport::default();
        report.record(outcome(FileStatus::Copied));
        write_run_report(&report_path, &report).await.unwrap();

        let raw = std::fs::read_to_string(&report_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["files_processed"], 1);
        assert_eq!(json["files"][0]["status"], "copied");
        assert_eq!(json["files"][0]["date"], "2023-10-15");

        let parsed: RunReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, report);
    }
}
