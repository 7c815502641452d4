//! PTZ API Routes
//!
//! Thin HTTP surface over the PTZ forwarder. Every handler reports
//! `{"status": "ok"|"failed"}`; a failed forward is not an HTTP error.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::state::AppState;

fn command_status(success: bool) -> Json<serde_json::Value> {
    Json(json!({ "status": if success { "ok" } else { "failed" } }))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pan_speed: f64,
    #[serde(default)]
    tilt_speed: f64,
}

/// Continuous move with speed
pub async fn ptz_move(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> impl IntoResponse {
    command_status(state.ptz.set_pan_tilt_speed(req.pan_speed, req.tilt_speed).await)
}

/// Stop all movement
pub async fn ptz_stop(State(state): State<AppState>) -> impl IntoResponse {
    let success = state.ptz.stop().await;
    Json(json!({ "status": if success { "stopped" } else { "failed" } }))
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    #[serde(default)]
    pan: f64,
    #[serde(default)]
    tilt: f64,
}

/// Set absolute pan/tilt position
pub async fn ptz_position(
    State(state): State<AppState>,
    Json(req): Json<PositionRequest>,
) -> impl IntoResponse {
    command_status(state.ptz.set_pan_tilt(req.pan, req.tilt).await)
}

#[derive(Debug, Deserialize)]
pub struct ZoomRequest {
    speed: Option<f64>,
    level: Option<f64>,
}

/// Set zoom speed or level
pub async fn ptz_zoom(
    State(state): State<AppState>,
    Json(req): Json<ZoomRequest>,
) -> Result<impl IntoResponse> {
    let success = match (req.speed, req.level) {
        (Some(speed), _) => state.ptz.set_zoom_speed(speed).await,
        (None, Some(level)) => state.ptz.set_zoom(level).await,
        (None, None) => return Err(Error::Validation("speed or level required".to_string())),
    };
    Ok(command_status(success))
}

#[derive(Debug, Deserialize)]
pub struct PresetRecallRequest {
    #[serde(default)]
    preset: u32,
    #[serde(default = "default_preset_speed")]
    speed: f64,
}

fn default_preset_speed() -> f64 {
    1.0
}

/// Recall a stored preset
pub async fn ptz_recall_preset(
    State(state): State<AppState>,
    Json(req): Json<PresetRecallRequest>,
) -> impl IntoResponse {
    command_status(state.ptz.recall_preset(req.preset, req.speed).await)
}

#[derive(Debug, Deserialize)]
pub struct PresetStoreRequest {
    #[serde(default)]
    preset: u32,
}

/// Store the current position as a preset
pub async fn ptz_store_preset(
    State(state): State<AppState>,
    Json(req): Json<PresetStoreRequest>,
) -> impl IntoResponse {
    command_status(state.ptz.store_preset(req.preset).await)
}

#[derive(Debug, Deserialize)]
pub struct FocusRequest {
    #[serde(default)]
    auto: bool,
    speed: Option<f64>,
    level: Option<f64>,
}

/// Focus control
pub async fn ptz_focus(
    State(state): State<AppState>,
    Json(req): Json<FocusRequest>,
) -> Result<impl IntoResponse> {
    let success = if req.auto {
        state.ptz.auto_focus().await
    } else if let Some(speed) = req.speed {
        state.ptz.set_focus_speed(speed).await
    } else if let Some(level) = req.level {
        state.ptz.set_focus(level).await
    } else {
        return Err(Error::Validation(
            "auto, speed, or level required".to_string(),
        ));
    };
    Ok(command_status(success))
}

#[derive(Debug, Deserialize)]
pub struct WhiteBalanceRequest {
    #[serde(default = "default_wb_mode")]
    mode: String,
    red: Option<f64>,
    blue: Option<f64>,
}

fn default_wb_mode() -> String {
    "auto".to_string()
}

/// White balance control
pub async fn ptz_white_balance(
    State(state): State<AppState>,
    Json(req): Json<WhiteBalanceRequest>,
) -> Result<impl IntoResponse> {
    let success = match req.mode.as_str() {
        "auto" => state.ptz.white_balance_auto().await,
        "indoor" => state.ptz.white_balance_indoor().await,
        "outdoor" => state.ptz.white_balance_outdoor().await,
        "oneshot" => state.ptz.white_balance_oneshot().await,
        "manual" => {
            state
                .ptz
                .white_balance_manual(req.red.unwrap_or(0.5), req.blue.unwrap_or(0.5))
                .await
        }
        mode => return Err(Error::Validation(format!("unknown mode: {}", mode))),
    };
    Ok(command_status(success))
}

#[derive(Debug, Deserialize)]
pub struct ExposureRequest {
    #[serde(default)]
    auto: bool,
    level: Option<f64>,
}

/// Exposure control
pub async fn ptz_exposure(
    State(state): State<AppState>,
    Json(req): Json<ExposureRequest>,
) -> Result<impl IntoResponse> {
    let success = if req.auto {
        state.ptz.exposure_auto().await
    } else if let Some(level) = req.level {
        state.ptz.exposure_manual(level).await
    } else {
        return Err(Error::Validation("auto or level required".to_string()));
    };
    Ok(command_status(success))
}
