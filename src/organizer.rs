// WHY: Filing policy over the extractor: the first date of a document
// decides its `<root>/<year>/<month>` folder. Existing files are never
// overwritten and sources are removed only after a successful copy.

use chrono::{Datelike, NaiveDate};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::date_extractor::{document_text, DateExtractor};
use crate::discovery::{find_files, DiscoveryConfig};
use crate::reader::read_text;
use crate::report::{FileOutcome, FileStatus, RunReport};

/// Why a single file could not be filed
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("{}: no valid date found in the document", .path.display())]
    NoDate { path: PathBuf },

    #[error("{}: could not read the document: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("{}: failed to {action}: {source}", .path.display())]
    Io {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: path has no file name", .path.display())]
    InvalidPath { path: PathBuf },
}

impl OrganizeError {
    /// Stable short name of the error kind, used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            OrganizeError::NoDate { .. } => "no_date",
            OrganizeError::Read { .. } => "read",
            OrganizeError::Io { .. } => "io",
            OrganizeError::InvalidPath { .. } => "invalid_path",
        }
    }

    fn io(path: &Path, action: &'static str, source: std::io::Error) -> Self {
        OrganizeError::Io {
            path: path.to_path_buf(),
            action,
            source,
        }
    }
}

/// Successful result of filing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeOutcome {
    Copied { date: NaiveDate, destination: PathBuf },
    /// Copied, then the source was removed
    Moved { date: NaiveDate, destination: PathBuf },
    /// A file with the same name already sits at the destination
    Skipped { date: NaiveDate, destination: PathBuf },
}

impl OrganizeOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            OrganizeOutcome::Copied { date, .. }
            | OrganizeOutcome::Moved { date, .. }
            | OrganizeOutcome::Skipped { date, .. } => *date,
        }
    }

    pub fn destination(&self) -> &Path {
        match self {
            OrganizeOutcome::Copied { destination, .. }
            | OrganizeOutcome::Moved { destination, .. }
            | OrganizeOutcome::Skipped { destination, .. } => destination,
        }
    }

    fn status(&self) -> FileStatus {
        match self {
            OrganizeOutcome::Copied { .. } => FileStatus::Copied,
            OrganizeOutcome::Moved { .. } => FileStatus::Moved,
            OrganizeOutcome::Skipped { .. } => FileStatus::Skipped,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizerConfig {
    /// Delete the source after it has been copied
    pub remove_source: bool,
}

/// Files diary documents into date folders
pub struct DiaryOrganizer<'a> {
    extractor: &'a DateExtractor,
    config: OrganizerConfig,
}

/// `root/<year>/<two-digit month>`
pub fn destination_folder(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.year().to_string())
        .join(format!("{:02}", date.month()))
}

impl<'a> DiaryOrganizer<'a> {
    pub fn new(extractor: &'a DateExtractor, config: OrganizerConfig) -> Self {
        Self { extractor, config }
    }

    /// Date of a document: the first date found in its title and body
    pub fn document_date(&self, title: &str, body: &str) -> Option<NaiveDate> {
        self.extractor.first_date(&document_text(title, body))
    }

    /// File one document under `output_root`
    pub async fn organize_file(
        &self,
        source: &Path,
        output_root: &Path,
    ) -> Result<OrganizeOutcome, OrganizeError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| OrganizeError::InvalidPath { path: source.to_path_buf() })?;
        let title = source
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();

        let body = read_text(source).await.map_err(|source_err| OrganizeError::Read {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        let date = self
            .document_date(&title, &body)
            .ok_or_else(|| OrganizeError::NoDate { path: source.to_path_buf() })?;

        let folder = destination_folder(output_root, date);
        let destination = folder.join(file_name);

        if fs::try_exists(&destination)
            .await
            .map_err(|e| OrganizeError::io(&destination, "check destination", e))?
        {
            debug!("{} already exists, skipping", destination.display());
            return Ok(OrganizeOutcome::Skipped { date, destination });
        }

        fs::create_dir_all(&folder)
            .await
            .map_err(|e| OrganizeError::io(&folder, "create folder", e))?;

        fs::copy(source, &destination)
            .await
            .map_err(|e| OrganizeError::io(source, "copy", e))?;

        // WHY: removal strictly follows a completed copy
        if self.config.remove_source {
            fs::remove_file(source)
                .await
                .map_err(|e| OrganizeError::io(source, "remove source", e))?;
            return Ok(OrganizeOutcome::Moved { date, destination });
        }

        Ok(OrganizeOutcome::Copied { date, destination })
    }

    /// File every `*.md` under `input` (recursively) into `output_root`
    ///
    /// Per-file failures are recorded in the report and do not stop the run.
    pub async fn organize_folder(
        &self,
        input: &Path,
        output_root: &Path,
        progress: &ProgressBar,
    ) -> anyhow::Result<RunReport> {
        let files = find_files(input, DiscoveryConfig::for_extension("md")).await?;
        info!("Organizing {} files from {} into {}", files.len(), input.display(), output_root.display());

        progress.set_length(files.len() as u64);
        let mut report = RunReport::default();

        for file in files {
            let path = file.display().to_string();
            let outcome = match self.organize_file(&file, output_root).await {
                Ok(outcome) => {
                    info!("{:?} {} -> {}", outcome.status(), path, outcome.destination().display());
                    FileOutcome {
                        path,
                        status: outcome.status(),
                        date: Some(outcome.date()),
                        destination: Some(outcome.destination().display().to_string()),
                        error_kind: None,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    FileOutcome {
                        path,
                        status: FileStatus::Failed,
                        date: None,
                        destination: None,
                        error_kind: Some(e.kind().to_string()),
                        error: Some(e.to_string()),
                    }
                }
            };
            report.record(outcome);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(report)
    }
}
