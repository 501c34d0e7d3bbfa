use std::{net::SocketAddr, sync::Arc};

use annotation_core::Dataset;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use server_api::{
    annotate, annotate_route, annotator_data_route, annotator_progress, annotator_view,
    config_route, event_types_route, get_config, health, list_event_types, progress_route,
    ApiContext,
};
use shared::{
    domain::{AnnotatorId, EventType},
    error::{ApiError, ErrorCode},
    protocol::{AnnotateRequest, AnnotateResponse, AnnotatorViewResponse, AppConfig, Progress},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

struct AppState {
    api: ApiContext,
}

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings()?;
    let dataset = Arc::new(Dataset::load(&settings.data_dir).map_err(|error| {
        error!(
            data_dir = %settings.data_dir.display(),
            error = %format!("{error:#}"),
            "failed to load dataset; expected config.json, event_types.json and input_data.json"
        );
        error
    })?);
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::new(dataset, storage),
    };
    let app = build_router(Arc::new(state), settings.body_limit_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(config_route(), get(http_config))
        .route(event_types_route(), get(http_event_types))
        .route(annotator_data_route(), get(http_annotator_data))
        .route(annotate_route(), post(http_annotate))
        .route(progress_route(), get(http_progress))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(err: ApiError) -> HttpError {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

fn rejection_response(rejection: JsonRejection) -> HttpError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
        );
    }
    error_response(ApiError::new(ErrorCode::Validation, rejection.body_text()))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    health(&state.api).await.map_err(error_response)?;
    Ok("ok")
}

async fn http_config(State(state): State<Arc<AppState>>) -> Json<AppConfig> {
    Json(get_config(&state.api))
}

async fn http_event_types(State(state): State<Arc<AppState>>) -> Json<Vec<EventType>> {
    Json(list_event_types(&state.api))
}

async fn http_annotator_data(
    State(state): State<Arc<AppState>>,
    Path(annotator_id): Path<i64>,
) -> Result<Json<AnnotatorViewResponse>, HttpError> {
    let view = annotator_view(&state.api, AnnotatorId(annotator_id))
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

async fn http_annotate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnnotateRequest>, JsonRejection>,
) -> Result<Json<AnnotateResponse>, HttpError> {
    let Json(req) = payload.map_err(rejection_response)?;
    let response = annotate(&state.api, req).await.map_err(error_response)?;
    Ok(Json(response))
}

async fn http_progress(
    State(state): State<Arc<AppState>>,
    Path(annotator_id): Path<i64>,
) -> Result<Json<Progress>, HttpError> {
    let progress = annotator_progress(&state.api, AnnotatorId(annotator_id))
        .await
        .map_err(error_response)?;
    Ok(Json(progress))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
