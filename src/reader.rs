use anyhow::Result;
use encoding_rs::{Encoding, EUC_JP, ISO_2022_JP, SHIFT_JIS};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// Configuration for file reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Try legacy Japanese encodings when a file is not valid UTF-8
    pub encoding_fallback: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            encoding_fallback: true,
        }
    }
}

/// Statistics for file reading operations
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub bytes_read: u64,
    pub chars_read: u64,
    /// Name of the encoding the text was decoded from
    pub encoding: Option<&'static str>,
    pub duration_ms: u64,
    pub read_error: Option<String>,
}

/// Legacy encodings tried, in order, after UTF-8
pub fn fallback_encodings() -> [&'static Encoding; 3] {
    [SHIFT_JIS, ISO_2022_JP, EUC_JP]
}

/// Decode raw bytes, UTF-8 first, then each fallback encoding
///
/// Returns the text and the name of the encoding that decoded it cleanly,
/// or `None` when no candidate decodes without replacement characters.
pub fn decode_text(bytes: &[u8], encoding_fallback: bool) -> Option<(String, &'static str)> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        return Some((text.to_string(), encoding_rs::UTF_8.name()));
    }

    if !encoding_fallback {
        return None;
    }

    fallback_encodings().into_iter().find_map(|encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| (text.into_owned(), encoding.name()))
    })
}

/// Async file reader that loads whole documents
pub struct AsyncFileReader {
    config: ReaderConfig,
}

impl AsyncFileReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read and decode a whole document
    ///
    /// Without `fail_fast`, problems are reported through
    /// `ReadStats::read_error` alongside empty text.
    pub async fn read_document<P: AsRef<Path>>(&self, file_path: P) -> Result<(String, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();

        debug!("Starting async read of file: {}", path.display());

        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let error_msg = format!("Failed to read file {}: {}", path.display(), e);
                return self.failed(path, 0, start_time, error_msg);
            }
        };

        let Some((text, encoding)) = decode_text(&bytes, self.config.encoding_fallback) else {
            let error_msg = format!("Could not decode {} as UTF-8 or a supported Japanese encoding", path.display());
            return self.failed(path, bytes.len() as u64, start_time, error_msg);
        };

        let stats = ReadStats {
            file_path: path.display().to_string(),
            bytes_read: bytes.len() as u64,
            chars_read: text.chars().count() as u64,
            encoding: Some(encoding),
            duration_ms: start_time.elapsed().as_millis() as u64,
            read_error: None,
        };

        info!(
            "Read {}: {} bytes as {} in {}ms",
            path.display(),
            stats.bytes_read,
            encoding,
            stats.duration_ms
        );

        Ok((text, stats))
    }

    fn failed(
        &self,
        path: &Path,
        bytes_read: u64,
        start_time: std::time::Instant,
        error_msg: String,
    ) -> Result<(String, ReadStats)> {
        warn!("{}", error_msg);

        if self.config.fail_fast {
            return Err(anyhow::anyhow!(error_msg));
        }

        let stats = ReadStats {
            file_path: path.display().to_string(),
            bytes_read,
            chars_read: 0,
            encoding: None,
            duration_ms: start_time.elapsed().as_millis() as u64,
            read_error: Some(error_msg),
        };
        Ok((String::new(), stats))
    }
}

/// Read a single document, failing on any read or decode problem
pub async fn read_text<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let reader = AsyncFileReader::new(ReaderConfig {
        fail_fast: true,
        ..Default::default()
    });
    let (text, _stats) = reader.read_document(file_path).await?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> Result<std::path::PathBuf> {
        let file_path = dir.join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[tokio::test]
    async fn test_read_utf8_document() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let content = "今日は晴れ。\n2023年10月15日";
        let file_path = create_test_file(temp_dir.path(), "entry.md", content.as_bytes()).await.unwrap();

        let (text, stats) = reader.read_document(&file_path).await.unwrap();

        assert_eq!(text, content);
        assert_eq!(stats.encoding, Some("UTF-8"));
        assert_eq!(stats.chars_read, content.chars().count() as u64);
        assert!(stats.read_error.is_none());
    }

    #[tokio::test]
    async fn test_read_strips_utf8_bom() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let file_path = create_test_file(temp_dir.path(), "bom.md", "\u{FEFF}2023-10-15".as_bytes()).await.unwrap();

        let (text, _stats) = reader.read_document(&file_path).await.unwrap();
        assert_eq!(text, "2023-10-15");
    }

    #[tokio::test]
    async fn test_read_shift_jis_document() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let (encoded, _, had_errors) = SHIFT_JIS.encode("ファイル1");
        assert!(!had_errors);
        let file_path = create_test_file(temp_dir.path(), "sjis.txt", &encoded).await.unwrap();

        let (text, stats) = reader.read_document(&file_path).await.unwrap();

        assert_eq!(text, "ファイル1");
        assert_eq!(stats.encoding, Some("Shift_JIS"));
    }

    #[test]
    fn test_fallback_order() {
        let names: Vec<&str> = fallback_encodings().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["Shift_JIS", "ISO-2022-JP", "EUC-JP"]);
    }

    #[test]
    fn test_decode_text_prefers_utf8() {
        let (text, encoding) = decode_text("2023年10月15日".as_bytes(), true).unwrap();
        assert_eq!(text, "2023年10月15日");
        assert_eq!(encoding, "UTF-8");
    }

    #[tokio::test]
    async fn test_undecodable_document_without_fail_fast() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let file_path = create_test_file(temp_dir.path(), "binary.md", &[0xFF, 0xFE, 0xFD]).await.unwrap();

        let (text, stats) = reader.read_document(&file_path).await.unwrap();
        assert!(text.is_empty());
        assert_eq!(stats.bytes_read, 3);
        assert!(stats.read_error.is_some());
    }

    #[tokio::test]
    async fn test_fallback_disabled_rejects_legacy_encoding() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig {
            fail_fast: true,
            encoding_fallback: false,
        });

        let (encoded, _, _) = SHIFT_JIS.encode("ファイル");
        let file_path = create_test_file(temp_dir.path(), "sjis.md", &encoded).await.unwrap();

        assert!(reader.read_document(&file_path).await.is_err());
    }

    #[tokio::test]
    async fn test_read_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig { fail_fast: false, ..Default::default() });

        let file_path = temp_dir.path().join("nonexistent.md");

        let (text, stats) = reader.read_document(&file_path).await.unwrap();
        assert!(text.is_empty());
        assert!(stats.read_error.is_some());
    }

    #[tokio::test]
    async fn test_read_nonexistent_file_fail_fast() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nonexistent.md");

        assert!(read_text(&file_path).await.is_err());
    }
}
