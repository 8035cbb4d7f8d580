use anyhow::Result;
use futures::stream::{self, Stream, StreamExt};
use glob::glob;
use ignore::{WalkBuilder, WalkState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configuration for file discovery behavior
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// File extension to look for, without the leading dot
    pub extension: String,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            extension: "md".to_string(),
            recursive: true,
        }
    }
}

impl DiscoveryConfig {
    /// Recursive discovery of one extension
    pub fn for_extension(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            ..Default::default()
        }
    }

    /// Only look at the top level of the root directory
    pub fn top_level(mut self) -> Self {
        self.recursive = false;
        self
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

/// Result of file discovery validation
#[derive(Debug, Clone)]
pub struct FileValidation {
    pub path: PathBuf,
    pub error: Option<String>,
}

/// Discovers files with the configured extension under the given root directory.
/// Returns an async stream of validated file paths.
///
/// # Arguments
/// * `root_dir` - Root directory to search
/// * `config` - Discovery configuration (extension, recursion, fail_fast behavior)
pub fn discover_files(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<FileValidation>> {
    let root_path = root_dir.as_ref().to_path_buf();

    // WHY: futures::stream::unfold gives lazy async iteration without another dependency
    stream::unfold(DiscoveryState::new(root_path, config), |mut state| async move {
        state.next_file().await.map(|result| (result, state))
    })
}

/// Parallel directory traversal for large diary trees
/// WHY: the ignore walker can be parallelized while glob is inherently sequential
pub fn discover_files_parallel(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<FileValidation>> {
    let root_path = root_dir.as_ref().to_path_buf();
    let config = Arc::new(config);

    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        info!("Starting directory traversal in: {}", root_path.display());
        let traversal_start = std::time::Instant::now();

        let mut builder = WalkBuilder::new(&root_path);
        builder
            .threads((num_cpus::get() / 2).max(1))
            .follow_links(false)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
        if !config.recursive {
            builder.max_depth(Some(1));
        }
        let walker = builder.build_parallel();

        let (result_tx, result_rx) = std::sync::mpsc::channel();
        let walk_config = Arc::clone(&config);

        // WHY: the walker blocks, so it runs on its own thread
        std::thread::spawn(move || {
            walker.run(|| {
                let result_tx = result_tx.clone();
                let walk_config = Arc::clone(&walk_config);
                Box::new(move |result| {
                    if let Ok(entry) = result {
                        if entry.file_type().is_some_and(|ft| ft.is_file())
                            && walk_config.matches(entry.path())
                        {
                            debug!("Found matching file: {}", entry.path().display());
                            let _ = result_tx.send(entry.path().to_path_buf());
                        }
                    }
                    WalkState::Continue
                })
            });
            drop(result_tx);
        });

        let mut file_count = 0;
        while let Ok(path) = result_rx.recv() {
            file_count += 1;

            match validate_file(path, &config).await {
                Ok(validation) => {
                    if tx.send(Ok(validation)).is_err() {
                        debug!("Receiver dropped, stopping discovery");
                        break;
                    }
                }
                Err(e) => {
                    if tx.send(Err(e)).is_err() {
                        debug!("Receiver dropped, stopping discovery");
                    }
                    break;
                }
            }
        }

        info!(
            "Discovery completed in {}ms, streamed {} files",
            traversal_start.elapsed().as_millis(),
            file_count
        );
    });

    stream::unfold(rx, |mut receiver| async move {
        receiver.recv().await.map(|result| (result, receiver))
    })
}

/// Check that a discovered path is an accessible regular file
///
/// Problems are recorded on the validation; with `fail_fast` an
/// inaccessible file becomes an error instead.
async fn validate_file(path: PathBuf, config: &DiscoveryConfig) -> Result<FileValidation> {
    debug!("Validating file: {}", path.display());

    let error = match fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => None,
        Ok(_) => Some(format!("Path is not a file: {}", path.display())),
        Err(e) => {
            let error = format!("Cannot access file {}: {}", path.display(), e);
            if config.fail_fast {
                warn!("{}", error);
                return Err(anyhow::anyhow!(error));
            }
            Some(error)
        }
    };

    if let Some(ref error) = error {
        warn!("{}", error);
    }

    Ok(FileValidation { path, error })
}

/// Internal state for file discovery iteration
struct DiscoveryState {
    root_dir: PathBuf,
    config: DiscoveryConfig,
    glob_iter: Option<glob::Paths>,
}

impl DiscoveryState {
    fn new(root_dir: PathBuf, config: DiscoveryConfig) -> Self {
        Self {
            root_dir,
            config,
            glob_iter: None,
        }
    }

    fn pattern(&self) -> String {
        // WHY: diary folders often carry brackets or other glob metacharacters
        let root = glob::Pattern::escape(&self.root_dir.display().to_string());
        if self.config.recursive {
            format!("{}/**/*.{}", root, self.config.extension)
        } else {
            format!("{}/*.{}", root, self.config.extension)
        }
    }

    async fn next_file(&mut self) -> Option<Result<FileValidation>> {
        if self.glob_iter.is_none() {
            let pattern = self.pattern();
            debug!("Starting file discovery with pattern: {}", pattern);

            match glob(&pattern) {
                Ok(paths) => {
                    self.glob_iter = Some(paths);
                    info!("File discovery initialized for root: {}", self.root_dir.display());
                }
                Err(e) => {
                    return Some(Err(anyhow::anyhow!("Failed to create glob pattern: {}", e)));
                }
            }
        }

        loop {
            let glob_iter = self.glob_iter.as_mut()?;
            match glob_iter.next() {
                Some(Ok(path)) => {
                    debug!("Found file: {}", path.display());
                    return Some(validate_file(path, &self.config).await);
                }
                Some(Err(e)) => {
                    let error_msg = format!("Glob iteration error: {e}");
                    warn!("{}", error_msg);

                    if self.config.fail_fast {
                        return Some(Err(anyhow::anyhow!(error_msg)));
                    }
                }
                None => {
                    info!("File discovery completed");
                    return None;
                }
            }
        }
    }
}

async fn collect_stream(
    stream: impl Stream<Item = Result<FileValidation>>,
) -> Result<Vec<FileValidation>> {
    let mut stream = Box::pin(stream);
    let mut files = Vec::new();

    while let Some(result) = stream.next().await {
        files.push(result?);
    }

    // WHY: deterministic processing order regardless of traversal strategy
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let valid_count = files.iter().filter(|f| f.error.is_none()).count();
    let invalid_count = files.len() - valid_count;

    if invalid_count > 0 {
        warn!("Found {} files with validation issues", invalid_count);
    }

    info!("File discovery summary: {} valid, {} invalid", valid_count, invalid_count);

    Ok(files)
}

/// Collect all discovered files, sorted by path
pub async fn collect_discovered_files(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> Result<Vec<FileValidation>> {
    collect_stream(discover_files(root_dir, config)).await
}

/// Collect all discovered files using parallel directory traversal, sorted by path
pub async fn collect_discovered_files_parallel(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> Result<Vec<FileValidation>> {
    collect_stream(discover_files_parallel(root_dir, config)).await
}

/// Paths of all valid files, sorted
///
/// Recursive walks use the parallel walker; a top-level listing is a single
/// glob and gains nothing from extra threads.
pub async fn find_files<P: AsRef<Path>>(root_dir: P, config: DiscoveryConfig) -> Result<Vec<PathBuf>> {
    let validations = if config.recursive {
        collect_discovered_files_parallel(root_dir, config).await?
    } else {
        collect_discovered_files(root_dir, config).await?
    };

    Ok(validations
        .into_iter()
        .filter(|v| v.error.is_none())
        .map(|v| v.path)
        .collect())
}
