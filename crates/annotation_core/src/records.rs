use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use shared::{
    domain::{AnnotatedItem, Annotation, AnnotatorId, Item, ItemId},
    protocol::Progress,
};
use tracing::{info, warn};

use crate::{
    catalog::EventCatalog,
    dataset::Dataset,
    error::{AnnotationError, Result},
    progress,
};

/// Durable per-annotator collection of records keyed by item id.
///
/// Implementations must overwrite on a repeated item id and must keep
/// annotators' collections independent of each other.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn load_records(&self, annotator: AnnotatorId) -> anyhow::Result<Vec<AnnotatedItem>>;
    async fn upsert_record(&self, annotator: AnnotatorId, record: &AnnotatedItem)
        -> anyhow::Result<()>;
}

#[async_trait]
impl<S: AnnotationStore + ?Sized> AnnotationStore for Arc<S> {
    async fn load_records(&self, annotator: AnnotatorId) -> anyhow::Result<Vec<AnnotatedItem>> {
        (**self).load_records(annotator).await
    }

    async fn upsert_record(
        &self,
        annotator: AnnotatorId,
        record: &AnnotatedItem,
    ) -> anyhow::Result<()> {
        (**self).upsert_record(annotator, record).await
    }
}

/// Joins the partitioned dataset with whatever a backend has persisted.
#[derive(Clone)]
pub struct RecordStore<S> {
    dataset: Arc<Dataset>,
    backend: S,
}

impl<S: AnnotationStore> RecordStore<S> {
    pub fn new(dataset: Arc<Dataset>, backend: S) -> Self {
        Self { dataset, backend }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// The annotator's partition in dataset order, each item carrying its
    /// saved annotation if there is one.
    pub async fn get(&self, annotator: AnnotatorId) -> Result<Vec<AnnotatedItem>> {
        let items = self.dataset.view(annotator)?;
        let saved: HashMap<ItemId, Annotation> = self
            .backend
            .load_records(annotator)
            .await
            .map_err(AnnotationError::Storage)?
            .into_iter()
            .filter_map(|record| record.annotation.map(|annotation| (record.item.id, annotation)))
            .collect();

        Ok(items
            .into_iter()
            .map(|item| AnnotatedItem {
                item: item.clone(),
                annotation: saved.get(&item.id).cloned(),
            })
            .collect())
    }

    pub async fn upsert(
        &self,
        annotator: AnnotatorId,
        item_id: ItemId,
        annotation: Annotation,
    ) -> Result<Annotation> {
        let item = self.dataset.assigned_item(annotator, item_id)?;
        let annotation = normalize_annotation(item, self.dataset.catalog(), annotation)?;
        let record = AnnotatedItem {
            item: item.clone(),
            annotation: Some(annotation.clone()),
        };

        if let Err(error) = self.backend.upsert_record(annotator, &record).await {
            warn!(
                annotator_id = annotator.0,
                item_id = item_id.0,
                error = %format!("{error:#}"),
                "annotation save failed"
            );
            return Err(AnnotationError::Storage(error));
        }
        info!(
            annotator_id = annotator.0,
            item_id = item_id.0,
            not_in_list = annotation.not_in_list,
            "annotation saved"
        );
        Ok(annotation)
    }

    pub async fn progress(&self, annotator: AnnotatorId) -> Result<Progress> {
        let view = self.get(annotator).await?;
        Ok(progress::for_view(&view))
    }
}

/// Sorts and dedups trigger indices, checks them against the item's tokens,
/// checks the event type against the catalog, and drops the event type when
/// `not_in_list` is set.
pub fn normalize_annotation(
    item: &Item,
    catalog: &EventCatalog,
    mut annotation: Annotation,
) -> Result<Annotation> {
    annotation.trigger_indices.sort_unstable();
    annotation.trigger_indices.dedup();
    if let Some(&index) = annotation
        .trigger_indices
        .iter()
        .find(|&&index| index >= item.tokens.len())
    {
        return Err(AnnotationError::InvalidTokenIndex {
            item_id: item.id,
            index,
            token_count: item.tokens.len(),
        });
    }

    if annotation.not_in_list {
        annotation.event_type = None;
    } else if let Some(event_type) = &annotation.event_type {
        catalog.ensure_known(event_type)?;
    }
    Ok(annotation)
}

#[cfg(test)]
#[path = "tests/records_tests.rs"]
mod tests;
