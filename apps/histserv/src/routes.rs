// [apps/histserv/src/routes.rs]
//! HTTP surface: an unauthenticated listing of registered histograms and
//! canvases, plus three control endpoints gated by `--enable-control`.
//! A control path that is not on that list always answers 403, whether or
//! not it names a real endpoint — disabled-by-default is the whole point
//! of the allow-list.

use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Builds the full router: `/` plus the three control endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_registered))
        .route("/Reset_Hist", post(reset_hist))
        .route("/Save_Hist", post(save_hist))
        .route("/Stop_Server", post(stop_server))
        .with_state(state)
}

#[derive(Serialize)]
struct RegisteredListing {
    histograms: Vec<HistogramSummary>,
    canvases: Vec<CanvasSummary>,
}

#[derive(Serialize)]
struct HistogramSummary {
    name: String,
    folder: Option<String>,
}

#[derive(Serialize)]
struct CanvasSummary {
    name: String,
    dsl: Option<String>,
}

async fn list_registered(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.receiver.registry();
    let registry = registry.lock().expect("registry mutex poisoned");

    let histograms = registry.names().map(|name| HistogramSummary { name: name.clone(), folder: registry.folder_of(name).map(str::to_string) }).collect();
    let canvases = registry.canvas_names().map(|name| CanvasSummary { name: name.clone(), dsl: registry.canvas_dsl(name).map(str::to_string) }).collect();

    Json(RegisteredListing { histograms, canvases })
}

async fn reset_hist(State(state): State<AppState>) -> impl IntoResponse {
    if !state.args.is_control_enabled("reset_hist") {
        return control_disabled();
    }
    let registry = state.receiver.registry();
    registry.lock().expect("registry mutex poisoned").clear();
    (StatusCode::OK, Json(json!({ "status": "cleared" }))).into_response()
}

async fn save_hist(State(state): State<AppState>) -> impl IntoResponse {
    if !state.args.is_control_enabled("save_hist") {
        return control_disabled();
    }

    let registry = state.receiver.registry();
    let dump: Vec<_> = {
        let registry = registry.lock().expect("registry mutex poisoned");
        registry.entries().map(|(name, entry)| json!({ "name": name, "entry": entry })).collect()
    };

    if let Err(e) = std::fs::create_dir_all(&state.args.save_dir) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response();
    }

    let stamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    let path = state.args.save_dir.join(format!("histo_dump_{stamp}.json"));
    match std::fs::write(&path, serde_json::to_vec_pretty(&dump).unwrap_or_default()) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "saved", "path": path.display().to_string() }))).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn stop_server(State(state): State<AppState>) -> impl IntoResponse {
    if !state.args.is_control_enabled("stop_server") {
        return control_disabled();
    }
    state.shutdown.store(true, Ordering::Relaxed);
    (StatusCode::OK, Json(json!({ "status": "stopping" }))).into_response()
}

fn control_disabled() -> axum::response::Response {
    (StatusCode::FORBIDDEN, Json(json!({ "error": "control endpoint disabled" }))).into_response()
}
