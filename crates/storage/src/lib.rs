use anyhow::{Context, Result};
use annotation_core::AnnotationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{AnnotatedItem, Annotation, AnnotatorId, EventTypeId, Item, ItemId};

/// SQLite-backed record collections, one row per (annotator, item).
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `sqlite::memory:` is a separate database.
        let max_connections = if sqlite_path(database_url).is_none() { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn save_record(&self, annotator: AnnotatorId, record: &AnnotatedItem) -> Result<()> {
        let item_json =
            serde_json::to_string(&record.item).context("failed to encode item for storage")?;
        let annotation = record.annotation.as_ref();
        let trigger_indices = annotation
            .map(|a| serde_json::to_string(&a.trigger_indices))
            .transpose()
            .context("failed to encode trigger indices")?;

        sqlx::query(
            "INSERT INTO annotation_records
                 (annotator_id, item_id, item_json, trigger_indices, event_type, not_in_list, annotated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(annotator_id, item_id) DO UPDATE SET
                 item_json=excluded.item_json,
                 trigger_indices=excluded.trigger_indices,
                 event_type=excluded.event_type,
                 not_in_list=excluded.not_in_list,
                 annotated_at=excluded.annotated_at,
                 updated_at=CURRENT_TIMESTAMP",
        )
        .bind(annotator.0)
        .bind(record.item.id.0)
        .bind(item_json)
        .bind(trigger_indices)
        .bind(annotation.and_then(|a| a.event_type.as_ref().map(EventTypeId::as_str)))
        .bind(annotation.is_some_and(|a| a.not_in_list))
        .bind(annotation.map(|a| a.annotated_at))
        .execute(&self.pool)
        .await
        .with_context(|| {
            format!(
                "failed to upsert record for annotator {} item {}",
                annotator.0, record.item.id.0
            )
        })?;
        Ok(())
    }

    /// All stored records for one annotator, ordered by item id.
    pub async fn list_records(&self, annotator: AnnotatorId) -> Result<Vec<AnnotatedItem>> {
        let rows = sqlx::query(
            "SELECT item_id, item_json, trigger_indices, event_type, not_in_list, annotated_at
             FROM annotation_records
             WHERE annotator_id = ?
             ORDER BY item_id ASC",
        )
        .bind(annotator.0)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to load records for annotator {}", annotator.0))?;

        rows.iter().map(decode_record).collect()
    }
}

fn decode_record(row: &SqliteRow) -> Result<AnnotatedItem> {
    let item_id = ItemId(row.try_get::<i64, _>(0)?);
    let item: Item = serde_json::from_str(&row.try_get::<String, _>(1)?)
        .with_context(|| format!("corrupt item payload for item {}", item_id.0))?;

    let annotation = match row.try_get::<Option<DateTime<Utc>>, _>(5)? {
        Some(annotated_at) => {
            let trigger_indices = match row.try_get::<Option<String>, _>(2)? {
                Some(raw) => serde_json::from_str(&raw).with_context(|| {
                    format!("corrupt trigger indices for item {}", item_id.0)
                })?,
                None => Vec::new(),
            };
            Some(Annotation {
                trigger_indices,
                event_type: row.try_get::<Option<String>, _>(3)?.map(EventTypeId),
                not_in_list: row.try_get::<bool, _>(4)?,
                annotated_at,
            })
        }
        None => None,
    };

    Ok(AnnotatedItem { item, annotation })
}

#[async_trait]
impl AnnotationStore for Storage {
    async fn load_records(&self, annotator: AnnotatorId) -> Result<Vec<AnnotatedItem>> {
        self.list_records(annotator).await
    }

    async fn upsert_record(&self, annotator: AnnotatorId, record: &AnnotatedItem) -> Result<()> {
        self.save_record(annotator, record).await
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
