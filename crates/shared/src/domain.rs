use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(AnnotatorId);
id_newtype!(ItemId);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTypeId(pub String);

impl EventTypeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for EventTypeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub id: EventTypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelPrediction {
    #[serde(default)]
    pub trigger_indices: Vec<usize>,
    #[serde(default)]
    pub top_event_types: Vec<EventTypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sentence: String,
    pub tokens: Vec<String>,
    #[serde(default)]
    pub model_prediction: ModelPrediction,
}

/// A reviewer's decision for one item.
///
/// `not_in_list` and a concrete `event_type` are mutually exclusive; an
/// annotation with neither is a valid partial review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub trigger_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventTypeId>,
    #[serde(default)]
    pub not_in_list: bool,
    pub annotated_at: DateTime<Utc>,
}

/// Persisted and served shape: the item's own fields plus an optional
/// `annotation` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedItem {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl AnnotatedItem {
    pub fn pending(item: Item) -> Self {
        Self {
            item,
            annotation: None,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }
}
