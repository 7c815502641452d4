//! Video capture device enumeration
//!
//! Best-effort listing of V4L2 devices (`v4l2-ctl --list-devices`) and Pi
//! cameras (`libcamera-hello --list-cameras`) to feed the output-role start
//! parameters. Missing tools or parse failures yield an empty or partial
//! list, never an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// An available capture device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDevice {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Enumerate all available capture devices.
pub async fn list_devices() -> Vec<VideoDevice> {
    let mut devices = Vec::new();

    if let Some(stdout) = probe("v4l2-ctl", &["--list-devices"]).await {
        devices.extend(parse_v4l2_list(&stdout));
    }

    if let Some(stdout) = probe("libcamera-hello", &["--list-cameras"]).await {
        if stdout.contains("Available cameras") {
            devices.extend(parse_libcamera_list(&stdout));
        }
    }

    tracing::debug!(count = devices.len(), "Enumerated video devices");
    devices
}

async fn probe(program: &str, args: &[&str]) -> Option<String> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .ok()?;

    match tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        _ => None,
    }
}

/// Parse `v4l2-ctl --list-devices` output: an unindented device name line
/// followed by indented `/dev/video*` node lines.
fn parse_v4l2_list(stdout: &str) -> Vec<VideoDevice> {
    let mut devices = Vec::new();
    let mut current_name: Option<String> = None;

    for line in stdout.lines() {
        if !line.starts_with('\t') && !line.trim().is_empty() {
            current_name = Some(line.trim().trim_end_matches(':').to_string());
        } else if line.starts_with('\t') && line.contains("/dev/video") {
            let path = line.trim().to_string();
            devices.push(VideoDevice {
                name: current_name.clone().unwrap_or_else(|| path.clone()),
                path,
                kind: "v4l2".to_string(),
            });
        }
    }

    devices
}

/// Parse `libcamera-hello --list-cameras` output: `<index> : <sensor> ...`
fn parse_libcamera_list(stdout: &str) -> Vec<VideoDevice> {
    let camera_re = Regex::new(r"(\d+)\s*:\s*(\w+)").unwrap();
    camera_re
        .captures_iter(stdout)
        .map(|caps| VideoDevice {
            path: format!("/dev/video{}", &caps[1]),
            name: format!("Pi Camera ({})", &caps[2]),
            kind: "libcamera".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4l2_list() {
        let stdout = "HD Webcam: HD Webcam (usb-0000:01:00.0-1.2):\n\
                      \t/dev/video0\n\
                      \t/dev/video1\n\
                      \n\
                      bcm2835-codec (platform:bcm2835-codec):\n\
                      \t/dev/video10\n";
        let devices = parse_v4l2_list(stdout);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].path, "/dev/video0");
        assert_eq!(devices[0].name, "HD Webcam: HD Webcam (usb-0000:01:00.0-1.2)");
        assert_eq!(devices[0].kind, "v4l2");
        assert_eq!(devices[2].path, "/dev/video10");
        assert_eq!(devices[2].name, "bcm2835-codec (platform:bcm2835-codec)");
    }

    #[test]
    fn test_parse_libcamera_list() {
        let stdout = "Available cameras\n\
                      -----------------\n\
                      0 : imx219 [3280x2464] (/base/soc/i2c0mux/i2c@1/imx219@10)\n";
        let devices = parse_libcamera_list(stdout);
        assert_eq!(devices[0].path, "/dev/video0");
        assert_eq!(devices[0].name, "Pi Camera (imx219)");
        assert_eq!(devices[0].kind, "libcamera");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_v4l2_list("").is_empty());
        assert!(parse_libcamera_list("").is_empty());
    }
}
