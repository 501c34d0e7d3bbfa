use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use annotation_core::{AnnotationStore, Dataset, RecordStore};
use anyhow::anyhow;
use async_trait::async_trait;
use shared::{
    domain::{AnnotatedItem, AnnotatorId, EventType, EventTypeId, Item, ItemId, ModelPrediction},
    protocol::AppConfig,
};
use tokio::sync::Mutex;

/// Three items, all assigned to annotator 0.
pub(crate) fn records(store: FlakyStore) -> RecordStore<FlakyStore> {
    let event_types = ["kill", "attack"]
        .into_iter()
        .map(|id| EventType {
            id: EventTypeId::from(id),
            name: id.to_uppercase(),
            description: String::new(),
        })
        .collect();
    let items = ["He killed a horse", "Troops attacked", "She died"]
        .into_iter()
        .enumerate()
        .map(|(n, sentence)| Item {
            id: ItemId(n as i64 + 1),
            sentence: sentence.to_string(),
            tokens: sentence.split_whitespace().map(str::to_string).collect(),
            model_prediction: ModelPrediction {
                trigger_indices: vec![1],
                top_event_types: vec![EventTypeId::from("kill")],
            },
        })
        .collect();
    let dataset = Dataset::new(AppConfig::new(1), event_types, items).expect("dataset");
    RecordStore::new(Arc::new(dataset), store)
}

/// In-memory records whose writes can be switched to fail.
#[derive(Clone, Default)]
pub(crate) struct FlakyStore {
    rows: Arc<Mutex<Vec<(AnnotatorId, AnnotatedItem)>>>,
    failing: Arc<AtomicBool>,
}

impl FlakyStore {
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn saved(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl AnnotationStore for FlakyStore {
    async fn load_records(&self, annotator: AnnotatorId) -> anyhow::Result<Vec<AnnotatedItem>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|(owner, _)| *owner == annotator)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn upsert_record(
        &self,
        annotator: AnnotatorId,
        record: &AnnotatedItem,
    ) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("database is read-only"));
        }
        let mut rows = self.rows.lock().await;
        rows.retain(|(owner, existing)| !(*owner == annotator && existing.item.id == record.item.id));
        rows.push((annotator, record.clone()));
        Ok(())
    }
}
