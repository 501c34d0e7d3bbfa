use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AnnotatedItem, AnnotatorId, EventTypeId, ItemId};

/// Contents of `config.json`. Keys other than `num_annotators` are carried
/// through untouched so the UI can read its own settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub num_annotators: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppConfig {
    pub fn new(num_annotators: i64) -> Self {
        Self {
            num_annotators,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorViewResponse {
    pub items: Vec<AnnotatedItem>,
    pub total: usize,
}

/// Only the id is read; clients usually echo the whole item back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ItemId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationPayload {
    #[serde(default)]
    pub trigger_indices: Vec<usize>,
    #[serde(default)]
    pub event_type: Option<EventTypeId>,
    #[serde(default)]
    pub not_in_list: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateRequest {
    pub annotator_id: AnnotatorId,
    pub item: ItemRef,
    pub annotation: AnnotationPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateResponse {
    pub success: bool,
    pub progress: Progress,
}
