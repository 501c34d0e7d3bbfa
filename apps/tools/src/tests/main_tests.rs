use super::*;
use crate::test_support::{records, FlakyStore};
use chrono::Utc;
use shared::domain::{Annotation, EventTypeId, Item, ItemId, ModelPrediction};

fn entry(id: i64, event_type: &str, trigger: usize) -> AnnotatedItem {
    AnnotatedItem {
        item: Item {
            id: ItemId(id),
            sentence: String::new(),
            tokens: Vec::new(),
            model_prediction: ModelPrediction::default(),
        },
        annotation: Some(Annotation {
            trigger_indices: vec![trigger],
            event_type: Some(EventTypeId::from(event_type)),
            not_in_list: false,
            annotated_at: Utc::now(),
        }),
    }
}

#[tokio::test]
async fn import_skips_invalid_entries_and_counts_them() {
    let store = FlakyStore::default();
    let records = records(store.clone());
    let entries = vec![
        entry(1, "kill", 1),
        entry(2, "marry", 1),
        entry(3, "kill", 40),
        entry(99, "kill", 0),
        AnnotatedItem::pending(Item {
            id: ItemId(2),
            sentence: String::new(),
            tokens: Vec::new(),
            model_prediction: ModelPrediction::default(),
        }),
    ];

    let summary = import_entries(&records, AnnotatorId(0), entries)
        .await
        .expect("import");
    assert_eq!(
        summary,
        ImportSummary {
            imported: 1,
            rejected: 3
        }
    );
    assert_eq!(store.saved().await, 1);
}

#[tokio::test]
async fn import_stops_on_storage_failure() {
    let store = FlakyStore::default();
    let records = records(store.clone());
    store.fail_writes(true);

    let result = import_entries(
        &records,
        AnnotatorId(0),
        vec![entry(1, "kill", 1), entry(2, "attack", 0)],
    )
    .await;
    assert!(matches!(result, Err(AnnotationError::Storage(_))));
    assert_eq!(store.saved().await, 0);
}

#[tokio::test]
async fn import_for_unknown_annotator_fails_outright() {
    let records = records(FlakyStore::default());
    let result = import_entries(&records, AnnotatorId(5), vec![entry(1, "kill", 1)]).await;
    assert!(matches!(result, Err(AnnotationError::UnknownAnnotator { .. })));
}
