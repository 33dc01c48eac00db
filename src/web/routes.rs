use super::{Result, WebError};
use crate::assign::{ChairDeviceAssignment, SeatAssignment};
use crate::client::{SEAT_ASSIGNMENTS_PATH, SEAT_PLAN_PATH};
use crate::config::DeskConfig;
use crate::core::{Entity, EntityId, Fields};
use crate::patch::{PATCH_CONTENT_TYPE, PatchOperation};
use crate::storage::EntityStore;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, event, info};

#[derive(Clone)]
pub struct AppState {
    store: Arc<EntityStore>,
}

impl AppState {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct CreateEntityRequest {
    #[serde(default)]
    id: Option<EntityId>,
    #[serde(flatten)]
    fields: Fields,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/api/:kind", get(list_entities).post(create_entity))
        .route("/api/:kind/:id", get(get_entity).patch(patch_entity))
        .route(SEAT_ASSIGNMENTS_PATH, post(assign_seats))
        .route(SEAT_PLAN_PATH, post(assign_seat_plan))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until the task is dropped.
pub async fn serve(config: &DeskConfig, store: Arc<EntityStore>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("coursedesk API listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(AppState::new(store))).await
}

async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn list_entities(State(state): State<AppState>, Path(kind): Path<String>) -> Result<Json<Vec<Entity>>> {
    Ok(Json(state.store.list(&kind).await?))
}

async fn create_entity(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<Entity>)> {
    let request: CreateEntityRequest = parse_body(&body, "entity")?;
    let created = state.store.insert(&kind, request.id, request.fields).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Entity>> {
    Ok(Json(state.store.get(&kind, &EntityId::from(id)).await?))
}

async fn patch_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Entity>> {
    check_patch_content_type(&headers)?;

    let ops: Vec<PatchOperation> = parse_body(&body, "patch")?;

    let id = EntityId::from(id);
    event!(Level::DEBUG, kind = %kind, id = %id, operations = ops.len(), "patch received");
    Ok(Json(state.store.apply_patch(&kind, &id, &ops).await?))
}

async fn assign_seats(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Entity>>> {
    let records: Vec<SeatAssignment> = parse_body(&body, "seat assignment")?;
    Ok(Json(state.store.assign_seats(&records).await?))
}

async fn assign_seat_plan(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Entity>>> {
    let records: Vec<ChairDeviceAssignment> = parse_body(&body, "seat plan")?;
    Ok(Json(state.store.assign_chair_devices(&records).await?))
}

/// Decodes a request body; shape errors become 400 `input_error` responses.
fn parse_body<T: DeserializeOwned>(body: &Bytes, what: &str) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| WebError::Input(format!("Invalid {} body: {}", what, err)))
}

/// Patch bodies are plain JSON under a custom label; both are accepted.
fn check_patch_content_type(headers: &HeaderMap) -> Result<()> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

    match media_type.as_deref() {
        Some(PATCH_CONTENT_TYPE) | Some("application/json") => Ok(()),
        Some(other) => Err(WebError::UnsupportedMediaType(format!(
            "Expected {}, got {}",
            PATCH_CONTENT_TYPE, other
        ))),
        None => Err(WebError::UnsupportedMediaType(format!(
            "Expected {}",
            PATCH_CONTENT_TYPE
        ))),
    }
}
