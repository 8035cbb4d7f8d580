use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::ProgressBar;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::date_extractor::{document_text, DateExtractor};
use crate::discovery::{find_files, DiscoveryConfig};
use crate::frontmatter;
use crate::reader::read_text;

/// Front-matter key carrying the optional integer mood score
pub const HAPPINESS_KEY: &str = "happiness score";

const SCHEMA: &str = "
    DROP TABLE IF EXISTS entries;
    CREATE TABLE entries (
        id INTEGER PRIMARY KEY,
        date TEXT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        char_count INTEGER NOT NULL,
        happiness_score INTEGER
    );
    CREATE INDEX idx_entries_date ON entries(date);
";

/// One stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedEntry {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub title: String,
    pub content: String,
    pub char_count: i64,
    pub happiness_score: Option<i64>,
}

/// Counts from indexing a folder
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexSummary {
    pub indexed: u64,
    /// Indexed without a date
    pub undated: u64,
    pub failed: Vec<(PathBuf, String)>,
}

/// SQLite-backed index of diary documents
pub struct TextIndex {
    conn: Connection,
}

impl TextIndex {
    /// Open (or create) the database file; the schema is not touched
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open index database {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Drop and recreate the `entries` table
    pub fn rebuild(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to create index schema")?;
        debug!("Index schema recreated");
        Ok(())
    }

    /// Store one document and return its row id
    pub fn index_document(&self, extractor: &DateExtractor, title: &str, content: &str) -> Result<i64> {
        let (id, _date) = insert_entry(&self.conn, extractor, title, content)?;
        Ok(id)
    }

    /// Rebuild the index from every `*.md` under `folder`
    ///
    /// Unreadable files are logged and skipped.
    pub async fn index_folder(
        &mut self,
        extractor: &DateExtractor,
        folder: &Path,
        progress: &ProgressBar,
    ) -> Result<IndexSummary> {
        self.rebuild()?;

        let files = find_files(folder, DiscoveryConfig::for_extension("md")).await?;
        info!("Indexing {} files from {}", files.len(), folder.display());
        progress.set_length(files.len() as u64);

        let mut summary = IndexSummary::default();

        // WHY: one transaction for the whole folder; per-row commits dominate otherwise
        let tx = self.conn.transaction()?;

        for file in files {
            progress.inc(1);

            let content = match read_text(&file).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping {}: {:#}", file.display(), e);
                    summary.failed.push((file, format!("{e:#}")));
                    continue;
                }
            };

            let title = file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();

            let (_id, date) = insert_entry(&tx, extractor, &title, &content)
                .with_context(|| format!("Failed to index {}", file.display()))?;

            summary.indexed += 1;
            if date.is_none() {
                summary.undated += 1;
            }
        }

        tx.commit()?;
        progress.finish_and_clear();

        info!(
            "Indexed {} files ({} undated, {} failed)",
            summary.indexed,
            summary.undated,
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Distinct years with dated entries, newest first
    pub fn years(&self) -> Result<Vec<i32>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT CAST(substr(date, 1, 4) AS INTEGER) AS year
             FROM entries
             WHERE date IS NOT NULL
             ORDER BY year DESC",
        )?;
        let years = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i32>>>()?;
        Ok(years)
    }

    /// Distinct months with entries in `year`, ascending
    pub fn months_in_year(&self, year: i32) -> Result<Vec<u32>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT CAST(substr(date, 6, 2) AS INTEGER) AS month
             FROM entries
             WHERE date LIKE ?1
             ORDER BY month",
        )?;
        let months = stmt
            .query_map(params![format!("{year:04}-%")], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<u32>>>()?;
        Ok(months)
    }

    /// Entries dated in the given month, newest first
    pub fn entries_in_month(&self, year: i32, month: u32) -> Result<Vec<IndexedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, title, content, char_count, happiness_score
             FROM entries
             WHERE date LIKE ?1
             ORDER BY date DESC, id",
        )?;
        let entries = stmt
            .query_map(params![format!("{year:04}-{month:02}-%")], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn entry(&self, id: i64) -> Result<Option<IndexedEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, date, title, content, char_count, happiness_score
                 FROM entries WHERE id = ?1",
                params![id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexedEntry> {
    Ok(IndexedEntry {
        id: row.get(0)?,
        date: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        char_count: row.get(4)?,
        happiness_score: row.get(5)?,
    })
}

/// Integer `happiness score` from the front matter, if any
fn happiness_score(content: &str) -> Option<i64> {
    match frontmatter::parse(content) {
        Ok(fields) => fields.get(HAPPINESS_KEY).and_then(serde_json::Value::as_i64),
        Err(e) => {
            warn!("Ignoring unparsable front matter: {:#}", e);
            None
        }
    }
}

/// Insert one row; returns its id and the date stored with it
fn insert_entry(
    conn: &Connection,
    extractor: &DateExtractor,
    title: &str,
    content: &str,
) -> Result<(i64, Option<NaiveDate>)> {
    let date = extractor.first_date(&document_text(title, content));
    let char_count = content.chars().count() as i64;

    conn.execute(
        "INSERT INTO entries (date, title, content, char_count, happiness_score)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![date, title, content, char_count, happiness_score(content)],
    )?;

    debug!(title, ?date, "Indexed entry");
    Ok((conn.last_insert_rowid(), date))
}
