use std::sync::Arc;

use annotation_core::{AnnotationError, AnnotationSession, Dataset, RecordStore};
use chrono::Utc;
use shared::{
    domain::{Annotation, AnnotatorId, EventType, EventTypeId, Item, ItemId, ModelPrediction},
    protocol::AppConfig,
};
use storage::Storage;

fn dataset(num_annotators: i64, size: i64) -> Dataset {
    let event_types = vec![
        EventType {
            id: EventTypeId::from("kill"),
            name: "Kill".to_string(),
            description: "Causing death".to_string(),
        },
        EventType {
            id: EventTypeId::from("attack"),
            name: "Attack".to_string(),
            description: "Violent act".to_string(),
        },
    ];
    let items = (0..size)
        .map(|n| Item {
            id: ItemId(n + 1),
            sentence: "He killed a horse".to_string(),
            tokens: ["He", "killed", "a", "horse"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            model_prediction: ModelPrediction {
                trigger_indices: vec![1],
                top_event_types: vec![EventTypeId::from("kill"), EventTypeId::from("attack")],
            },
        })
        .collect();
    Dataset::new(AppConfig::new(num_annotators), event_types, items).expect("dataset")
}

fn database_url(dir: &std::path::Path, file_name: &str) -> String {
    format!(
        "sqlite://{}",
        dir.join(file_name).to_string_lossy().replace('\\', "/")
    )
}

#[tokio::test]
async fn session_progress_survives_reopen() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let database_url = database_url(temp_root.path(), "annotations.db");
    let dataset = Arc::new(dataset(2, 6));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        let store = RecordStore::new(dataset.clone(), storage);
        let mut session = AnnotationSession::open(store.clone(), AnnotatorId(1))
            .await
            .expect("session");
        assert_eq!(session.current().item.id, ItemId(2));

        session.toggle_token(3, true).expect("range");
        assert!(session.select_prediction(1).expect("prediction"));
        assert!(session.next().await.expect("next"));
        session.toggle_not_in_list();
        assert!(session.next().await.expect("next"));

        let progress = store.progress(AnnotatorId(1)).await.expect("progress");
        assert_eq!((progress.completed, progress.total, progress.percentage), (2, 3, 67));
    }

    let storage = Storage::new(&database_url).await.expect("reopen");
    let store = RecordStore::new(dataset, storage);
    let session = AnnotationSession::open(store.clone(), AnnotatorId(1))
        .await
        .expect("session");
    assert_eq!(session.current().item.id, ItemId(6));

    let view = store.get(AnnotatorId(1)).await.expect("view");
    let first = view[0].annotation.as_ref().expect("first annotated");
    assert_eq!(first.trigger_indices, vec![1, 2, 3]);
    assert_eq!(first.event_type, Some(EventTypeId::from("attack")));
    let second = view[1].annotation.as_ref().expect("second annotated");
    assert!(second.not_in_list);
    assert_eq!(second.event_type, None);
    assert!(view[2].annotation.is_none());

    assert_eq!(
        store.progress(AnnotatorId(0)).await.expect("progress").completed,
        0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_for_different_annotators_do_not_interfere() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let database_url = database_url(temp_root.path(), "concurrent.db");
    let storage = Storage::new(&database_url).await.expect("db");
    let store = RecordStore::new(Arc::new(dataset(4, 40)), storage);

    let mut tasks = Vec::new();
    for annotator in 0..4_i64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let view = store.get(AnnotatorId(annotator)).await?;
            for entry in view {
                store
                    .upsert(
                        AnnotatorId(annotator),
                        entry.item.id,
                        Annotation {
                            trigger_indices: vec![1],
                            event_type: Some(EventTypeId::from("kill")),
                            not_in_list: false,
                            annotated_at: Utc::now(),
                        },
                    )
                    .await?;
            }
            Ok::<_, AnnotationError>(())
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("upserts");
    }

    for annotator in 0..4_i64 {
        let progress = store.progress(AnnotatorId(annotator)).await.expect("progress");
        assert_eq!((progress.completed, progress.total), (10, 10));
        let rows = store
            .backend()
            .list_records(AnnotatorId(annotator))
            .await
            .expect("rows");
        assert_eq!(rows.len(), 10);
    }
}
