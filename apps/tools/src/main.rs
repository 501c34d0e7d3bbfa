use std::{path::PathBuf, sync::Arc};

use annotation_core::{partition, AnnotationError, AnnotationStore, Dataset, RecordStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::domain::{AnnotatedItem, AnnotatorId};
use storage::Storage;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod review;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/annotations.db")]
    database_url: String,
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show how many items each annotator is assigned.
    Partition,
    /// Show completion for one annotator, or for all of them.
    Progress {
        #[arg(long)]
        annotator: Option<i64>,
    },
    /// Write `annotations/annotator_<id>.json` files under `out_dir`.
    Export {
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Load a previously exported `annotator_<id>.json` file.
    Import {
        #[arg(long)]
        annotator: i64,
        file: PathBuf,
    },
    /// Review items interactively in the terminal.
    Review {
        #[arg(long)]
        annotator: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let dataset = Arc::new(Dataset::load(&cli.data_dir)?);
    let storage = Storage::new(&cli.database_url).await?;
    let records = RecordStore::new(dataset.clone(), storage);

    match cli.command {
        Command::Partition => {
            let views = partition::partition(dataset.items(), dataset.num_annotators())?;
            for (annotator, view) in views {
                println!("annotator {annotator}: {} items", view.len());
            }
        }
        Command::Progress { annotator } => {
            let annotators: Vec<AnnotatorId> = match annotator {
                Some(id) => vec![AnnotatorId(id)],
                None => dataset.annotators().collect(),
            };
            for annotator in annotators {
                let progress = records.progress(annotator).await?;
                println!(
                    "annotator {annotator}: {}/{} ({}%)",
                    progress.completed, progress.total, progress.percentage
                );
            }
        }
        Command::Export { out_dir } => {
            let dir = out_dir.join("annotations");
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("failed to create '{}'", dir.display()))?;
            for annotator in dataset.annotators() {
                let mut annotated: Vec<AnnotatedItem> = records
                    .get(annotator)
                    .await?
                    .into_iter()
                    .filter(AnnotatedItem::is_annotated)
                    .collect();
                annotated.sort_by_key(|entry| entry.item.id.0);
                let path = dir.join(format!("annotator_{annotator}.json"));
                let json = serde_json::to_string_pretty(&annotated)?;
                tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
                println!("wrote {} annotations to {}", annotated.len(), path.display());
            }
        }
        Command::Import { annotator, file } => {
            let annotator = AnnotatorId(annotator);
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let entries: Vec<AnnotatedItem> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse '{}'", file.display()))?;

            let summary = import_entries(&records, annotator, entries).await?;
            println!(
                "imported {} annotations, rejected {}",
                summary.imported, summary.rejected
            );
        }
        Command::Review { annotator } => {
            review::run(records, AnnotatorId(annotator)).await?;
        }
    }

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ImportSummary {
    imported: usize,
    rejected: usize,
}

/// Upserts every annotated entry. Entries that fail validation are skipped
/// and counted; any other failure stops the import.
async fn import_entries<S: AnnotationStore>(
    records: &RecordStore<S>,
    annotator: AnnotatorId,
    entries: Vec<AnnotatedItem>,
) -> annotation_core::Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    for entry in entries {
        let Some(annotation) = entry.annotation else {
            continue;
        };
        match records.upsert(annotator, entry.item.id, annotation).await {
            Ok(_) => summary.imported += 1,
            Err(
                error @ (AnnotationError::UnknownItem { .. }
                | AnnotationError::InvalidEventType(_)
                | AnnotationError::InvalidTokenIndex { .. }),
            ) => {
                warn!(item_id = entry.item.id.0, %error, "skipping entry");
                summary.rejected += 1;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
