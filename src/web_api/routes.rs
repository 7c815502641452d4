//! API Routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{auth_routes, preview_routes, ptz_routes};
use crate::config_generator::{CaptureSource, OutputParams, ViewerParams};
use crate::error::{Error, Result};
use crate::process_supervisor::Role;
use crate::state::AppState;
use crate::video_devices;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(super::health_check))
        // Sources & extra IPs
        .route("/api/sources", get(list_sources))
        .route("/api/sources/refresh", post(refresh_sources))
        .route(
            "/api/sources/extra-ips",
            get(get_extra_ips).put(set_extra_ips).post(add_extra_ip),
        )
        .route("/api/sources/extra-ips/:ip", delete(remove_extra_ip))
        // Viewer
        .route("/api/viewer/start", post(start_viewer))
        .route("/api/viewer/stop", post(stop_viewer))
        .route("/api/viewer/switch", post(switch_viewer))
        .route("/api/viewer/status", get(viewer_status))
        // Output
        .route("/api/output/start", post(start_output))
        .route("/api/output/stop", post(stop_output))
        .route("/api/output/status", get(output_status))
        .route("/api/output/devices", get(list_video_devices))
        // PTZ
        .route("/api/ptz/move", post(ptz_routes::ptz_move))
        .route("/api/ptz/stop", post(ptz_routes::ptz_stop))
        .route("/api/ptz/position", post(ptz_routes::ptz_position))
        .route("/api/ptz/zoom", post(ptz_routes::ptz_zoom))
        .route("/api/ptz/preset/recall", post(ptz_routes::ptz_recall_preset))
        .route("/api/ptz/preset/store", post(ptz_routes::ptz_store_preset))
        .route("/api/ptz/focus", post(ptz_routes::ptz_focus))
        .route("/api/ptz/whitebalance", post(ptz_routes::ptz_white_balance))
        .route("/api/ptz/exposure", post(ptz_routes::ptz_exposure))
        // Preview
        .route("/api/preview/stream", get(preview_routes::stream))
        .route("/api/preview/snapshot", get(preview_routes::snapshot))
        .route("/api/preview/status", get(preview_routes::preview_status))
        // Auth
        .route("/api/auth/login", post(auth_routes::login))
        .route("/api/auth/logout", post(auth_routes::logout))
        .route("/api/auth/status", get(auth_routes::auth_status))
        .route("/api/auth/credentials", put(auth_routes::change_credentials))
        .with_state(state)
}

// ========================================
// Source Handlers
// ========================================

async fn list_sources(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let sources = state
        .discovery
        .discover(state.config.discovery_timeout_secs)
        .await?;
    Ok(Json(json!({ "sources": sources, "count": sources.len() })))
}

#[derive(Debug, Deserialize, Default)]
struct RefreshRequest {
    timeout: Option<u64>,
}

async fn refresh_sources(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse> {
    let timeout = body
        .and_then(|Json(req)| req.timeout)
        .unwrap_or(state.config.discovery_timeout_secs);
    let sources = state.discovery.discover(timeout).await?;
    Ok(Json(json!({ "sources": sources, "count": sources.len() })))
}

async fn get_extra_ips(State(state): State<AppState>) -> impl IntoResponse {
    let ips = state.extra_ips.get().await;
    Json(json!({ "ips": ips }))
}

#[derive(Debug, Deserialize)]
struct SetExtraIpsRequest {
    ips: Vec<String>,
}

async fn set_extra_ips(
    State(state): State<AppState>,
    Json(req): Json<SetExtraIpsRequest>,
) -> Result<impl IntoResponse> {
    let ips = state.extra_ips.set(req.ips).await?;
    Ok(Json(json!({ "ips": ips })))
}

#[derive(Debug, Deserialize)]
struct AddExtraIpRequest {
    ip: String,
}

async fn add_extra_ip(
    State(state): State<AppState>,
    Json(req): Json<AddExtraIpRequest>,
) -> Result<impl IntoResponse> {
    if req.ip.trim().is_empty() {
        return Err(Error::Validation("ip is required".to_string()));
    }
    let ips = state.extra_ips.add(&req.ip).await?;
    Ok(Json(json!({ "ips": ips })))
}

async fn remove_extra_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse> {
    let ips = state.extra_ips.remove(&ip).await?;
    Ok(Json(json!({ "ips": ips })))
}

// ========================================
// Viewer Handlers
// ========================================

fn default_true() -> bool {
    true
}

fn default_viewer_resolution() -> String {
    "1920x1080".to_string()
}

#[derive(Debug, Deserialize)]
struct ViewerRequest {
    source: String,
    backup: Option<String>,
    #[serde(default)]
    audio: bool,
    #[serde(default = "default_true")]
    fullscreen: bool,
    #[serde(default = "default_viewer_resolution")]
    resolution: String,
}

impl ViewerRequest {
    fn into_params(self) -> Result<ViewerParams> {
        if self.source.trim().is_empty() {
            return Err(Error::Validation("source is required".to_string()));
        }
        Ok(ViewerParams {
            source: self.source,
            backup: self.backup.filter(|b| !b.trim().is_empty()),
            audio: self.audio,
            fullscreen: self.fullscreen,
            resolution: self.resolution,
        })
    }
}

async fn start_viewer(
    State(state): State<AppState>,
    Json(req): Json<ViewerRequest>,
) -> Result<impl IntoResponse> {
    let params = req.into_params()?;
    let source = params.source.clone();

    // generation failure is fatal to the start: never launch a stale artifact
    let config_path = state.config_gen.generate_viewer(&params).await?;
    let info = state.supervisor.start(Role::Viewer, config_path).await?;

    Ok(Json(json!({
        "status": info.status,
        "name": info.name,
        "pid": info.pid,
        "config": info.config,
        "source": source,
    })))
}

async fn stop_viewer(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.supervisor.stop(Role::Viewer).await)
}

/// Switch the running viewer to a different source. Unlike start, this
/// requires an existing viewer process.
async fn switch_viewer(
    State(state): State<AppState>,
    Json(req): Json<ViewerRequest>,
) -> Result<impl IntoResponse> {
    let params = req.into_params()?;
    let source = params.source.clone();

    let config_path = state.config_gen.generate_viewer(&params).await?;
    let info = state
        .supervisor
        .restart(Role::Viewer, Some(config_path))
        .await?;

    Ok(Json(json!({
        "status": info.status,
        "name": info.name,
        "pid": info.pid,
        "config": info.config,
        "source": source,
    })))
}

async fn viewer_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.supervisor.status(Role::Viewer).await {
        Some(status) => Json(json!(status)),
        None => Json(json!({ "running": false, "name": Role::Viewer.as_str() })),
    }
}

// ========================================
// Output Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct OutputRequest {
    source_type: Option<String>,
    /// Legacy alias for source_type
    #[serde(rename = "type")]
    source_type_alias: Option<String>,
    device: Option<String>,
    name: Option<String>,
    resolution: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    #[serde(default)]
    ptz: bool,
}

impl OutputRequest {
    fn into_params(self, state: &AppState) -> OutputParams {
        let source_type = self
            .source_type
            .or(self.source_type_alias)
            .unwrap_or_else(|| "v4l2".to_string());
        let source = if source_type == "libcamera" {
            CaptureSource::Libcamera
        } else {
            CaptureSource::V4l2 {
                device: self
                    .device
                    .unwrap_or_else(|| state.config.default_device.clone()),
            }
        };

        let resolution = match (self.resolution, self.width, self.height) {
            (Some(resolution), _, _) => resolution,
            (None, Some(width), Some(height)) => format!("{}x{}", width, height),
            _ => state.config.default_resolution.clone(),
        };

        OutputParams {
            source,
            name: self
                .name
                .unwrap_or_else(|| state.config.default_output_name.clone()),
            resolution,
            fps: self.fps.unwrap_or(state.config.default_fps),
            ptz: self.ptz,
        }
    }
}

async fn start_output(
    State(state): State<AppState>,
    Json(req): Json<OutputRequest>,
) -> Result<impl IntoResponse> {
    let params = req.into_params(&state);
    let output_name = params.name.clone();
    let source_type = params.source.as_str();

    let config_path = state.config_gen.generate_output(&params).await?;
    let info = state.supervisor.start(Role::Output, config_path).await?;

    Ok(Json(json!({
        "status": info.status,
        "name": info.name,
        "pid": info.pid,
        "config": info.config,
        "output_name": output_name,
        "source_type": source_type,
    })))
}

async fn stop_output(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.supervisor.stop(Role::Output).await)
}

async fn output_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.supervisor.status(Role::Output).await {
        Some(status) => Json(json!(status)),
        None => Json(json!({ "running": false, "name": Role::Output.as_str() })),
    }
}

async fn list_video_devices() -> impl IntoResponse {
    let devices = video_devices::list_devices().await;
    Json(json!({ "devices": devices }))
}
