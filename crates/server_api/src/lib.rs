use std::sync::Arc;

use annotation_core::{AnnotationError, Dataset, RecordStore};
use chrono::Utc;
use shared::{
    domain::{Annotation, AnnotatorId, EventType},
    error::{ApiError, ErrorCode},
    protocol::{
        AnnotateRequest, AnnotateResponse, AnnotationPayload, AnnotatorViewResponse, AppConfig,
        Progress,
    },
};
use storage::Storage;
use tracing::error;

#[derive(Clone)]
pub struct ApiContext {
    pub records: RecordStore<Storage>,
}

impl ApiContext {
    pub fn new(dataset: Arc<Dataset>, storage: Storage) -> Self {
        Self {
            records: RecordStore::new(dataset, storage),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        self.records.dataset()
    }

    pub fn storage(&self) -> &Storage {
        self.records.backend()
    }
}

pub fn config_route() -> &'static str {
    "/api/config"
}

pub fn event_types_route() -> &'static str {
    "/api/event-types"
}

pub fn annotator_data_route() -> &'static str {
    "/api/data/:annotator_id"
}

pub fn annotate_route() -> &'static str {
    "/api/annotate"
}

pub fn progress_route() -> &'static str {
    "/api/progress/:annotator_id"
}

pub fn get_config(ctx: &ApiContext) -> AppConfig {
    ctx.dataset().config().clone()
}

pub fn list_event_types(ctx: &ApiContext) -> Vec<EventType> {
    ctx.dataset().catalog().to_vec()
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.storage().health_check().await.map_err(internal)
}

pub async fn annotator_view(
    ctx: &ApiContext,
    annotator: AnnotatorId,
) -> Result<AnnotatorViewResponse, ApiError> {
    let items = ctx.records.get(annotator).await.map_err(api_error)?;
    Ok(AnnotatorViewResponse {
        total: items.len(),
        items,
    })
}

/// Saves one annotation and reports the annotator's updated progress.
pub async fn annotate(ctx: &ApiContext, req: AnnotateRequest) -> Result<AnnotateResponse, ApiError> {
    let annotation = into_annotation(req.annotation);
    ctx.records
        .upsert(req.annotator_id, req.item.id, annotation)
        .await
        .map_err(api_error)?;
    let progress = annotator_progress(ctx, req.annotator_id).await?;
    Ok(AnnotateResponse {
        success: true,
        progress,
    })
}

pub async fn annotator_progress(
    ctx: &ApiContext,
    annotator: AnnotatorId,
) -> Result<Progress, ApiError> {
    ctx.records.progress(annotator).await.map_err(api_error)
}

/// Server-side timestamp; the payload's own `annotated_at`, if any, is ignored.
fn into_annotation(payload: AnnotationPayload) -> Annotation {
    Annotation {
        trigger_indices: payload.trigger_indices,
        event_type: payload.event_type,
        not_in_list: payload.not_in_list,
        annotated_at: Utc::now(),
    }
}

pub fn api_error(err: AnnotationError) -> ApiError {
    let code = match &err {
        AnnotationError::InvalidEventType(_) | AnnotationError::InvalidTokenIndex { .. } => {
            ErrorCode::Validation
        }
        AnnotationError::UnknownItem { .. }
        | AnnotationError::UnknownAnnotator { .. }
        | AnnotationError::EmptyView(_) => ErrorCode::NotFound,
        AnnotationError::Configuration(_) | AnnotationError::Storage(_) => {
            error!(error = %err, "annotation request failed");
            ErrorCode::Internal
        }
    };
    ApiError::new(code, err.to_string())
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
