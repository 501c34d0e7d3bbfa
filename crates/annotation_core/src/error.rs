use shared::domain::{AnnotatorId, EventTypeId, ItemId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown event type: {0}")]
    InvalidEventType(EventTypeId),

    #[error("token index {index} out of range for item {item_id} with {token_count} tokens")]
    InvalidTokenIndex {
        item_id: ItemId,
        index: usize,
        token_count: usize,
    },

    #[error("item {item_id} is not assigned to annotator {annotator_id}")]
    UnknownItem {
        annotator_id: AnnotatorId,
        item_id: ItemId,
    },

    #[error("unknown annotator {annotator_id}; {num_annotators} annotators are configured")]
    UnknownAnnotator {
        annotator_id: AnnotatorId,
        num_annotators: i64,
    },

    #[error("annotator {0} has no items to review")]
    EmptyView(AnnotatorId),

    /// The write did not reach the persistence medium; the caller still owns
    /// the unsaved annotation.
    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
