//! Preview API Routes
//!
//! MJPEG streaming and snapshots from the shared-memory preview directory.
//! Frames appear only while an output process runs; their absence is a
//! normal state, reflected in the stream as skipped intervals.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use crate::preview::{PreviewStore, FRAME_INTERVAL};
use crate::state::AppState;

/// Cleanup cadence: every N emitted intervals
const CLEANUP_EVERY: u32 = 30;

const BOUNDARY: &str = "frame";

/// MJPEG stream endpoint
pub async fn stream(State(state): State<AppState>) -> impl IntoResponse {
    let preview: Arc<PreviewStore> = state.preview.clone();

    // one multipart chunk per interval; an empty chunk when no frame is
    // available keeps the pacing without sending a bogus part
    let body_stream = futures::stream::unfold((preview, 0u32), |(preview, ticks)| async move {
        tokio::time::sleep(FRAME_INTERVAL).await;

        let ticks = ticks.wrapping_add(1);
        if ticks % CLEANUP_EVERY == 0 {
            preview.cleanup_old_frames().await;
        }

        let chunk = match preview.latest_frame().await {
            Some(frame) => mjpeg_part(&frame),
            None => Vec::new(),
        };
        Some((Ok::<_, Infallible>(chunk), (preview, ticks)))
    });

    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", BOUNDARY),
        )],
        Body::from_stream(body_stream),
    )
}

fn mjpeg_part(frame: &[u8]) -> Vec<u8> {
    let mut part = Vec::with_capacity(frame.len() + 64);
    part.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    part.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(frame);
    part.extend_from_slice(b"\r\n");
    part
}

/// Single frame snapshot
pub async fn snapshot(State(state): State<AppState>) -> impl IntoResponse {
    match state.preview.latest_frame().await {
        Some(frame) => ([(header::CONTENT_TYPE, "image/jpeg")], frame).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No preview available" })),
        )
            .into_response(),
    }
}

/// Check whether a preview frame is available
pub async fn preview_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "available": state.preview.available().await }))
}
