//! HTTP API for the Gradient node.

use crate::node::AgentState;
use crate::ws::{field_update, ws_handler, StreamEvent};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use gradient_decision::RouterConfig;
use gradient_fields::{FieldType, LocalFieldState, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

type AppState = Arc<AgentState>;

/// Reason recorded for decisions made by the field router.
pub const FIELD_SCORE_REASON: &str = "field_score";

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser dashboards
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        // Field state
        .route("/fields", get(list_fields))
        .route("/fields/{node_id}", get(get_fields))
        .route("/state", post(push_state))
        // Routing
        .route("/route", get(route))
        .route("/config", get(get_config).post(set_config))
        // Observability
        .route("/metrics", get(metrics))
        .route("/stream", get(stream))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

// --- Field state ---

async fn list_fields(State(state): State<AppState>) -> Json<BTreeMap<NodeId, LocalFieldState>> {
    Json(state.store.snapshot())
}

async fn get_fields(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Json<LocalFieldState> {
    Json(state.store.fields_for(&node_id))
}

/// Authoritative field values for one node.
#[derive(Debug, Deserialize)]
pub struct StateUpdate {
    pub node_id: String,
    #[serde(default)]
    pub health: f64,
    #[serde(default)]
    pub load: f64,
    #[serde(default)]
    pub capacity: f64,
}

async fn push_state(
    State(state): State<AppState>,
    body: Result<Json<StateUpdate>, JsonRejection>,
) -> StatusCode {
    let update = match body {
        Ok(Json(update)) => update,
        Err(e) => {
            debug!("Rejected state push: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    if update.node_id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    state
        .store
        .update_contribution(&update.node_id, FieldType::Health, update.health);
    state
        .store
        .update_contribution(&update.node_id, FieldType::Load, update.load);
    state
        .store
        .update_contribution(&update.node_id, FieldType::Capacity, update.capacity);
    debug!(node = %update.node_id, "Authoritative state applied");

    StatusCode::NO_CONTENT
}

// --- Routing ---

#[derive(Debug, Deserialize)]
struct RouteQuery {
    #[serde(default)]
    candidates: String,
}

#[derive(Debug, Serialize)]
struct RouteResponse {
    selected_node: String,
}

async fn route(State(state): State<AppState>, Query(query): Query<RouteQuery>) -> Json<RouteResponse> {
    let candidates: Vec<&str> = query
        .candidates
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    let selected = state.router.select_node(&candidates).unwrap_or_default();
    state.counter.inc(&selected, FIELD_SCORE_REASON);

    Json(RouteResponse {
        selected_node: selected,
    })
}

async fn get_config(State(state): State<AppState>) -> Json<RouterConfig> {
    Json(state.router.config())
}

async fn set_config(
    State(state): State<AppState>,
    body: Result<Json<RouterConfig>, JsonRejection>,
) -> Result<Json<RouterConfig>, (StatusCode, String)> {
    let Json(config) = body.map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;
    if let Err(e) = config.validate() {
        warn!("Rejected router config: {}", e);
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    state.router.update_config(config);
    info!(?config, "Router config updated");
    Ok(Json(config))
}

// --- Observability ---

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        state.counter.render(),
    )
}

async fn stream(State(state): State<AppState>) -> Json<StreamEvent> {
    Json(field_update(&state))
}
