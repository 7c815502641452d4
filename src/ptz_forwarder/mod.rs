//! PtzForwarder - PTZ Commands to the Worker Control Endpoint
//!
//! ## Responsibilities
//!
//! - Forward PTZ commands to the worker's embedded web control endpoint
//! - One HTTP GET per command, a single query parameter each
//!
//! The forwarder is stateless: no session, no position tracking. Command
//! failures are logged and reported as `false`, never raised — PTZ is a
//! best-effort convenience on top of a running output process.
//!
//! Supported commands on the worker side: pan_tilt, pan, tilt,
//! pan_tilt_speed, pan_speed, tilt_speed, zoom, zoom_speed, focus,
//! focus_speed, auto_focus, recall_preset, store_preset, the white balance
//! modes, exposure_auto and exposure_manual. Scalar values are rendered as
//! plain text, two-element vectors as `[a,b]`.

use std::time::Duration;

/// PtzForwarder instance
pub struct PtzForwarder {
    client: reqwest::Client,
    control_url: String,
}

impl PtzForwarder {
    /// Create a forwarder against the worker control URL.
    ///
    /// Redirects are disabled: the control endpoint answers commands with
    /// 302/303 and those count as success, not as something to follow.
    pub fn new(control_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            control_url,
        }
    }

    /// Send one command. Success = status in {200, 302, 303}.
    async fn send_command(&self, command: &str, value: Option<String>) -> bool {
        let value = value.unwrap_or_default();
        tracing::debug!(command = %command, value = %value, "Sending PTZ command");

        match self
            .client
            .get(&self.control_url)
            .query(&[(command, value.as_str())])
            .send()
            .await
        {
            Ok(resp) => matches!(resp.status().as_u16(), 200 | 302 | 303),
            Err(e) => {
                tracing::warn!(command = %command, error = %e, "PTZ command failed");
                false
            }
        }
    }

    // Position commands (absolute)

    /// Set absolute pan/tilt position (-1.0 to 1.0)
    pub async fn set_pan_tilt(&self, pan: f64, tilt: f64) -> bool {
        self.send_command("pan_tilt", Some(vector(pan, tilt))).await
    }

    pub async fn set_pan(&self, pan: f64) -> bool {
        self.send_command("pan", Some(pan.to_string())).await
    }

    pub async fn set_tilt(&self, tilt: f64) -> bool {
        self.send_command("tilt", Some(tilt.to_string())).await
    }

    // Speed commands (continuous movement)

    /// Set pan/tilt speed (-1.0 to 1.0, 0 = stop)
    pub async fn set_pan_tilt_speed(&self, pan_speed: f64, tilt_speed: f64) -> bool {
        self.send_command("pan_tilt_speed", Some(vector(pan_speed, tilt_speed)))
            .await
    }

    pub async fn set_pan_speed(&self, speed: f64) -> bool {
        self.send_command("pan_speed", Some(speed.to_string())).await
    }

    pub async fn set_tilt_speed(&self, speed: f64) -> bool {
        self.send_command("tilt_speed", Some(speed.to_string())).await
    }

    /// Stop all movement
    pub async fn stop(&self) -> bool {
        let moved = self.set_pan_tilt_speed(0.0, 0.0).await;
        let zoomed = self.send_command("zoom_speed", Some("0".to_string())).await;
        moved && zoomed
    }

    // Zoom

    /// Set zoom level (0.0 to 1.0)
    pub async fn set_zoom(&self, zoom: f64) -> bool {
        self.send_command("zoom", Some(zoom.to_string())).await
    }

    pub async fn set_zoom_speed(&self, speed: f64) -> bool {
        self.send_command("zoom_speed", Some(speed.to_string())).await
    }

    // Focus

    /// Set focus level (0.0 to 1.0)
    pub async fn set_focus(&self, focus: f64) -> bool {
        self.send_command("focus", Some(focus.to_string())).await
    }

    pub async fn set_focus_speed(&self, speed: f64) -> bool {
        self.send_command("focus_speed", Some(speed.to_string())).await
    }

    pub async fn auto_focus(&self) -> bool {
        self.send_command("auto_focus", None).await
    }

    // Presets

    pub async fn recall_preset(&self, preset: u32, speed: f64) -> bool {
        self.send_command("recall_preset", Some(format!("[{},{}]", preset, speed)))
            .await
    }

    pub async fn store_preset(&self, preset: u32) -> bool {
        self.send_command("store_preset", Some(preset.to_string()))
            .await
    }

    // White balance

    pub async fn white_balance_auto(&self) -> bool {
        self.send_command("white_balance_auto", None).await
    }

    pub async fn white_balance_indoor(&self) -> bool {
        self.send_command("white_balance_indoor", None).await
    }

    pub async fn white_balance_outdoor(&self) -> bool {
        self.send_command("white_balance_outdoor", None).await
    }

    pub async fn white_balance_oneshot(&self) -> bool {
        self.send_command("white_balance_oneshot", None).await
    }

    pub async fn white_balance_manual(&self, red: f64, blue: f64) -> bool {
        self.send_command("white_balance_manual", Some(vector(red, blue)))
            .await
    }

    // Exposure

    pub async fn exposure_auto(&self) -> bool {
        self.send_command("exposure_auto", None).await
    }

    pub async fn exposure_manual(&self, exposure: f64) -> bool {
        self.send_command("exposure_manual", Some(exposure.to_string()))
            .await
    }
}

/// Render a two-element vector value, e.g. `[0.3,-0.5]`
fn vector(a: f64, b: f64) -> String {
    format!("[{},{}]", a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_rendering() {
        assert_eq!(vector(0.3, -0.5), "[0.3,-0.5]");
        assert_eq!(vector(0.0, 0.0), "[0,0]");
        assert_eq!(vector(-1.0, 1.0), "[-1,1]");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_false() {
        // port 9 on localhost: nothing listens, command must fail soft
        let ptz = PtzForwarder::new("http://127.0.0.1:9/control".to_string());
        assert!(!ptz.set_pan_tilt(0.1, 0.2).await);
        assert!(!ptz.auto_focus().await);
    }
}
