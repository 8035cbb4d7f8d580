use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{info, warn};

use nikki::reader::read_text;
use nikki::{
    convert_txt_to_md, frontmatter, resolve_texts_dir, write_run_report, Config, DateExtractor,
    DiaryOrganizer, OrganizerConfig, TextIndex,
};

#[derive(Parser, Debug)]
#[command(name = "nikki")]
#[command(about = "Date-aware diary organizer: file notes by date and browse them by month")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suppress console progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dates found in each file
    Dates {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert .txt files in a folder to UTF-8 .md files
    Txt2md {
        /// Folder containing .txt files (not searched recursively)
        #[arg(long)]
        input_folder: PathBuf,

        /// Folder receiving the .md files
        #[arg(long)]
        output_folder: PathBuf,
    },

    /// File .md diaries into year/month folders by their first date
    OrgDiary {
        /// Folder searched recursively for .md files
        #[arg(long)]
        input_folder: PathBuf,

        /// Root of the year/month folders; defaults to the input folder
        #[arg(long)]
        output_folder: Option<PathBuf>,

        /// Remove each source file after it has been copied
        #[arg(long)]
        remove: bool,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Build the SQLite index from a folder of .md files
    CreateDb {
        #[arg(long, default_value = "./texts.db")]
        db_path: PathBuf,

        /// Folder to index; defaults to the `texts.dir` config value
        #[arg(long)]
        folder_path: Option<PathBuf>,
    },

    /// Browse the index by year and month
    Browse {
        #[arg(long, default_value = "./texts.db")]
        db_path: PathBuf,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },

    /// Store a configuration value
    SetConfig { key: String, value: String },

    /// Print the current configuration
    ShowConfig,
}

fn progress_bar(no_progress: bool, message: &'static str) -> ProgressBar {
    if no_progress {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: structured JSON logs on stderr keep stdout for command output
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    info!(?cli, "Parsed CLI arguments");

    match cli.command {
        Command::Dates { files } => print_dates(&files).await,
        Command::Txt2md {
            input_folder,
            output_folder,
        } => {
            ensure_dir(&input_folder)?;
            let report = convert_txt_to_md(&input_folder, &output_folder).await?;
            println!(
                "Converted {} files from {} to {}.",
                report.processed_files.len(),
                input_folder.display(),
                output_folder.display()
            );
            for (path, error) in &report.failed_files {
                println!("Failed to convert {}: {}", path.display(), error);
            }
            Ok(())
        }
        Command::OrgDiary {
            input_folder,
            output_folder,
            remove,
            report,
        } => {
            ensure_dir(&input_folder)?;
            let output_folder = output_folder.unwrap_or_else(|| input_folder.clone());

            let extractor = DateExtractor::new()?;
            let organizer = DiaryOrganizer::new(&extractor, OrganizerConfig { remove_source: remove });
            let progress = progress_bar(cli.no_progress, "Organizing");
            let run = organizer
                .organize_folder(&input_folder, &output_folder, &progress)
                .await?;

            for failure in run.failures() {
                println!("Failed: {}", failure.error.as_deref().unwrap_or(&failure.path));
            }
            println!(
                "Filed {} files into {} ({} skipped, {} failed).",
                run.files_processed,
                output_folder.display(),
                run.files_skipped,
                run.files_failed
            );

            if let Some(report_path) = report {
                write_run_report(&report_path, &run).await?;
            }
            Ok(())
        }
        Command::CreateDb { db_path, folder_path } => {
            let config = Config::load().await?;
            let folder = resolve_texts_dir(folder_path, &config)?;
            ensure_dir(&folder)?;

            let extractor = DateExtractor::new()?;
            let mut index = TextIndex::open(&db_path)?;
            let progress = progress_bar(cli.no_progress, "Indexing");
            let summary = index.index_folder(&extractor, &folder, &progress).await?;

            for (path, error) in &summary.failed {
                println!("Error processing file {}: {}", path.display(), error);
            }
            println!(
                "Database created at {} from {} files in {}.",
                db_path.display(),
                summary.indexed,
                folder.display()
            );
            Ok(())
        }
        Command::Browse { db_path, year, month } => browse(&db_path, year, month),
        Command::SetConfig { key, value } => {
            let mut config = Config::load().await?;
            config.set(key, value);
            let path = config.save().await?;
            info!("Config saved to {}", path.display());
            Ok(())
        }
        Command::ShowConfig => {
            let config = Config::load().await?;
            for (key, value) in config.iter() {
                match value.as_str() {
                    Some(text) => println!("{key}: {text}"),
                    None => println!("{key}: {value}"),
                }
            }
            Ok(())
        }
    }
}

fn ensure_dir(path: &std::path::Path) -> Result<()> {
    // WHY: validate folders early to fail fast with a clear error
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }
    Ok(())
}

async fn print_dates(files: &[PathBuf]) -> Result<()> {
    let extractor = DateExtractor::new()?;

    for path in files {
        // WHY: one unreadable file must not hide the dates of the others
        let text = match read_text(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                println!("Failed to read {}: {:#}", path.display(), e);
                continue;
            }
        };
        let dates: Vec<String> = extractor
            .extract(&text)
            .iter()
            .map(|date| date.to_string())
            .collect();
        println!("{}\t{}", path.display(), dates.join(","));
    }
    Ok(())
}

fn browse(db_path: &std::path::Path, year: Option<i32>, month: Option<u32>) -> Result<()> {
    if !db_path.is_file() {
        anyhow::bail!(
            "Index not found at {}; run `nikki create-db` first",
            db_path.display()
        );
    }
    let index = TextIndex::open(db_path)?;

    match (year, month) {
        (None, _) => {
            for year in index.years()? {
                println!("{year}");
            }
        }
        (Some(year), None) => {
            for month in index.months_in_year(year)? {
                println!("{year}-{month:02}");
            }
        }
        (Some(year), Some(month)) => {
            let entries = index
                .entries_in_month(year, month)
                .with_context(|| format!("Failed to query entries for {year}-{month:02}"))?;
            if entries.is_empty() {
                println!("No entries for {year}-{month:02}.");
            }
            for entry in entries {
                let date = entry.date.map(|d| d.to_string()).unwrap_or_default();
                println!("## {}\n{}\n", entry.title, date);
                println!("{}\n\n---", frontmatter::format_for_display(&entry.content));
            }
        }
    }
    Ok(())
}
