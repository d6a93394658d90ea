// HTTP request handlers
use crate::application::errors::{ApiError, DashboardError};
use crate::domain::battery::{BatterySummary, DeviceId};
use crate::domain::cycles::Direction;
use crate::domain::temperature::BucketWidth;
use crate::presentation::app_state::AppState;
use crate::presentation::views::{self, TrendMetric};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use futures::stream::Stream;
use serde::Serialize;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/state", get(get_state))
        .route("/view", get(get_view))
        .route("/events", get(stream_state))
        .route("/trends/:metric", get(get_trend))
        .route("/devices", get(list_devices))
        .route("/devices/:imei/select", post(select_device))
        .route("/devices/:imei/latest", get(latest_cycle))
        .route("/cycles/refresh", post(refresh_cycles))
        .route("/cycles/select/:cycle", post(select_cycle))
        .route("/cycles/nearest/:cycle", post(select_nearest_cycle))
        .route("/cycles/step/:direction", post(step_cycle))
        .route("/summary/refresh", post(refresh_summary))
        .route("/preferences/bucket-width/:width", put(set_bucket_width))
        .route("/error", delete(clear_error))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

fn view_response(state: &AppState) -> Response {
    Json(views::dashboard(&state.store.snapshot())).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.snapshot())
}

pub async fn get_view(State(state): State<Arc<AppState>>) -> Response {
    view_response(&state)
}

pub async fn get_trend(
    Path(metric): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match metric.parse::<TrendMetric>() {
        Ok(metric) => Json(views::trend(&state.store.snapshot().cycles, metric)).into_response(),
        Err(message) => error_response(StatusCode::NOT_FOUND, message),
    }
}

/// State snapshots as server-sent events, starting with the current one
pub async fn stream_state(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut rx = state.store.subscribe();
    let stream = async_stream::stream! {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            yield Event::default().event("state").json_data(&snapshot);
            if rx.changed().await.is_err() {
                break;
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Serialize)]
pub struct DeviceEntry {
    pub imei: DeviceId,
    pub selected: bool,
    pub summary: Option<BatterySummary>,
}

/// Authorized batteries with whatever the last summary refresh reported
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    let devices: Vec<DeviceEntry> = state
        .store
        .authorized_devices()
        .iter()
        .map(|imei| DeviceEntry {
            imei: imei.clone(),
            selected: *imei == snapshot.selection.imei,
            summary: snapshot.summary.iter().find(|s| s.imei == *imei).cloned(),
        })
        .collect();
    Json(devices)
}

pub async fn select_device(
    Path(raw): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(imei) = DeviceId::parse(&raw) else {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid IMEI {:?}", raw));
    };

    match state.store.select_device(imei).await {
        Ok(()) => view_response(&state),
        Err(e) => error_response(StatusCode::FORBIDDEN, e.to_string()),
    }
}

pub async fn latest_cycle(
    Path(raw): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(imei) = DeviceId::parse(&raw) else {
        return error_response(StatusCode::BAD_REQUEST, format!("invalid IMEI {:?}", raw));
    };

    match state.store.fetch_latest(&imei).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e @ DashboardError::UnauthorizedDevice(_)) => {
            error_response(StatusCode::FORBIDDEN, e.to_string())
        }
        Err(DashboardError::Api(e @ ApiError::NotFound { .. })) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => {
            tracing::warn!("Failed to fetch latest cycle for {}: {}", imei, e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

pub async fn select_cycle(
    Path(cycle): Path<u32>,
    State(state): State<Arc<AppState>>,
) -> Response {
    state.store.select_cycle(cycle).await;
    view_response(&state)
}

pub async fn select_nearest_cycle(
    Path(requested): Path<u32>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.store.select_nearest_cycle(requested).await {
        Some(_) => view_response(&state),
        None => error_response(StatusCode::CONFLICT, "no cycles loaded for the selected battery"),
    }
}

pub async fn step_cycle(
    Path(direction): Path<Direction>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.store.step_cycle(direction).await {
        Some(_) => view_response(&state),
        None => error_response(StatusCode::CONFLICT, "no cycle in that direction"),
    }
}

pub async fn refresh_cycles(State(state): State<Arc<AppState>>) -> Response {
    state.store.refresh_cycles().await;
    view_response(&state)
}

pub async fn refresh_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.store.refresh_summary().await;
    Json(state.store.snapshot().summary)
}

pub async fn set_bucket_width(
    Path(width): Path<u8>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match BucketWidth::try_from(width) {
        Ok(width) => {
            state.store.set_bucket_width(width);
            view_response(&state)
        }
        Err(message) => error_response(StatusCode::BAD_REQUEST, message),
    }
}

pub async fn clear_error(State(state): State<Arc<AppState>>) -> Response {
    state.store.clear_error();
    view_response(&state)
}
