use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::anyhow;
use async_trait::async_trait;
use shared::{
    domain::{AnnotatedItem, AnnotatorId, EventType, EventTypeId, Item, ItemId, ModelPrediction},
    protocol::AppConfig,
};
use tokio::sync::Mutex;

use crate::{dataset::Dataset, records::AnnotationStore};

pub(crate) fn event_types() -> Vec<EventType> {
    [
        ("attack", "Attack", "A violent physical act against a target"),
        ("kill", "Kill", "Someone causes the death of another"),
        ("die", "Die", "Life ends"),
        ("transport", "Transport", "Movement of people or goods"),
    ]
    .into_iter()
    .map(|(id, name, description)| EventType {
        id: EventTypeId::from(id),
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

pub(crate) fn item(id: i64, sentence: &str, triggers: &[usize], top: &[&str]) -> Item {
    Item {
        id: ItemId(id),
        sentence: sentence.to_string(),
        tokens: sentence.split_whitespace().map(str::to_string).collect(),
        model_prediction: ModelPrediction {
            trigger_indices: triggers.to_vec(),
            top_event_types: top.iter().copied().map(EventTypeId::from).collect(),
        },
    }
}

/// Six items over two annotators: annotator 0 gets ids 10, 12, 14.
pub(crate) fn dataset() -> Dataset {
    let items = vec![
        item(10, "He killed a horse", &[1], &["kill", "attack", "die"]),
        item(11, "The troops moved north", &[2], &["transport"]),
        item(12, "She died in 1990", &[1], &["die", "kill"]),
        item(13, "Rebels attacked the base", &[1], &["attack"]),
        item(14, "Nothing happened here", &[], &[]),
        item(15, "Goods were shipped overseas", &[2], &["transport", "attack"]),
    ];
    Dataset::new(AppConfig::new(2), event_types(), items).expect("dataset")
}

/// In-memory backend that can be told to fail writes.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    records: Arc<Mutex<Vec<(AnnotatorId, AnnotatedItem)>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) async fn row_count(&self, annotator: AnnotatorId) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|(owner, _)| *owner == annotator)
            .count()
    }
}

#[async_trait]
impl AnnotationStore for MemoryStore {
    async fn load_records(&self, annotator: AnnotatorId) -> anyhow::Result<Vec<AnnotatedItem>> {
        Ok(self
            .records
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
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk unavailable"));
        }
        let mut records = self.records.lock().await;
        match records
            .iter_mut()
            .find(|(owner, existing)| *owner == annotator && existing.item.id == record.item.id)
        {
            Some((_, existing)) => *existing = record.clone(),
            None => records.push((annotator, record.clone())),
        }
        Ok(())
    }
}
