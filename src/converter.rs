use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::discovery::{find_files, DiscoveryConfig};
use crate::reader::{AsyncFileReader, ReaderConfig};

/// Result of converting a folder of `.txt` files
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    /// Markdown files written
    pub processed_files: Vec<PathBuf>,
    /// Source files that could not be decoded or written, with the reason
    pub failed_files: Vec<(PathBuf, String)>,
}

/// Convert every top-level `*.txt` in `input_folder` to `<stem>.md`
///
/// Output is always UTF-8, whatever encoding the source was decoded from.
/// A file that fails is recorded and the rest continue.
pub async fn convert_txt_to_md(
    input_folder: impl AsRef<Path>,
    output_folder: impl AsRef<Path>,
) -> Result<ConversionReport> {
    let input_folder = input_folder.as_ref();
    let output_folder = output_folder.as_ref();

    fs::create_dir_all(output_folder)
        .await
        .with_context(|| format!("Failed to create output folder {}", output_folder.display()))?;

    let sources = find_files(input_folder, DiscoveryConfig::for_extension("txt").top_level()).await?;
    let reader = AsyncFileReader::new(ReaderConfig::default());

    let mut report = ConversionReport {
        input_folder: input_folder.to_path_buf(),
        output_folder: output_folder.to_path_buf(),
        processed_files: Vec::new(),
        failed_files: Vec::new(),
    };

    for source in sources {
        let (text, stats) = reader.read_document(&source).await?;
        if let Some(error) = stats.read_error {
            report.failed_files.push((source, error));
            continue;
        }

        let Some(file_name) = source.with_extension("md").file_name().map(|name| name.to_owned()) else {
            continue;
        };
        let target = output_folder.join(file_name);

        match fs::write(&target, text).await {
            Ok(()) => {
                info!(
                    "Converted {} ({}) to {}",
                    source.display(),
                    stats.encoding.unwrap_or("unknown"),
                    target.display()
                );
                report.processed_files.push(target);
            }
            Err(e) => {
                warn!("Failed to write {}: {}", target.display(), e);
                report.failed_files.push((source, e.to_string()));
            }
        }
    }

    Ok(report)
}
