pub mod config;
pub mod converter;
pub mod date_extractor;
pub mod discovery;
pub mod frontmatter;
pub mod indexer;
pub mod organizer;
pub mod reader;
pub mod report;

// Re-export main types for convenient access
pub use date_extractor::{document_text, DateExtractor, DateMatch, DatePattern, Layout, DATE_PATTERNS};

pub use config::{resolve_texts_dir, Config, TEXTS_DIR_KEY};
pub use converter::{convert_txt_to_md, ConversionReport};
pub use indexer::{IndexSummary, IndexedEntry, TextIndex};
pub use organizer::{DiaryOrganizer, OrganizeError, OrganizeOutcome, OrganizerConfig};
pub use report::{write_run_report, FileOutcome, FileStatus, RunReport};
