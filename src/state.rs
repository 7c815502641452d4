//! Application state
//!
//! Holds all shared components and configuration

use crate::auth_service::AuthService;
use crate::config_generator::ConfigGenerator;
use crate::discovery::DiscoveryService;
use crate::extra_ips::ExtraIpStore;
use crate::preview::PreviewStore;
use crate::process_supervisor::{ProcessSupervisor, SupervisorConfig};
use crate::ptz_forwarder::PtzForwarder;
use crate::worker_env::WorkerEnv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Worker binary (the streaming engine)
    pub worker_bin: PathBuf,
    /// Directory prepended to LD_LIBRARY_PATH for worker launches
    pub lib_path: String,
    /// NDI runtime library path (NDI_PATH)
    pub ndi_lib_path: String,
    /// Dedicated discovery helper binary
    pub discover_bin: PathBuf,
    /// Directory for generated config artifacts
    pub config_dir: PathBuf,
    /// Directory holding the config templates
    pub template_dir: PathBuf,
    /// Flat file persisting the extra-IP allow-list
    pub extra_ips_file: PathBuf,
    /// JSON credentials file
    pub credentials_file: PathBuf,
    /// Shared-memory directory for output-role preview frames
    pub preview_dir: PathBuf,
    /// Built frontend directory served as static files
    pub static_dir: PathBuf,
    /// Server bind host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Worker web control endpoint for PTZ forwarding
    pub control_url: String,
    /// Default NDI output name
    pub default_output_name: String,
    /// Default V4L2 capture device
    pub default_device: String,
    /// Default resolution (WxH)
    pub default_resolution: String,
    /// Default frame rate
    pub default_fps: u32,
    /// Default discovery window in seconds
    pub discovery_timeout_secs: u64,
    /// Post-launch liveness window (ms)
    pub start_grace_ms: u64,
    /// Wait after SIGTERM before escalating (s)
    pub term_grace_secs: u64,
    /// Wait after SIGKILL before abandoning the handle (s)
    pub kill_grace_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_bin: std::env::var("YURI_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/usr/local/bin/yuri2")),
            lib_path: std::env::var("YURI_LIB_PATH")
                .unwrap_or_else(|_| "/usr/local/lib".to_string()),
            ndi_lib_path: std::env::var("NDI_LIB_PATH")
                .unwrap_or_else(|_| "/usr/local/lib/libndi.so.6".to_string()),
            discover_bin: std::env::var("NDI_DISCOVER_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/usr/local/bin/ndi_discover")),
            config_dir: std::env::var("CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("configs/generated")),
            template_dir: std::env::var("TEMPLATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("templates")),
            extra_ips_file: std::env::var("NDI_EXTRA_IPS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("configs/extra_ips.txt")),
            credentials_file: std::env::var("CREDENTIALS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("configs/credentials.json")),
            preview_dir: std::env::var("PREVIEW_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/dev/shm/ndi_preview")),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("frontend/dist")),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            control_url: std::env::var("PTZ_CONTROL_URL")
                .unwrap_or_else(|_| "http://localhost:8080/control".to_string()),
            default_output_name: std::env::var("DEFAULT_NDI_OUTPUT_NAME")
                .unwrap_or_else(|_| "RaspberryPi-NDI".to_string()),
            default_device: std::env::var("DEFAULT_VIDEO_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            default_resolution: std::env::var("DEFAULT_RESOLUTION")
                .unwrap_or_else(|_| "1280x720".to_string()),
            default_fps: std::env::var("DEFAULT_FPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            discovery_timeout_secs: std::env::var("DISCOVERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            start_grace_ms: std::env::var("START_GRACE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            term_grace_secs: std::env::var("TERM_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            kill_grace_secs: std::env::var("KILL_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}

impl AppConfig {
    /// Shared-library environment for worker and helper launches
    pub fn worker_env(&self) -> WorkerEnv {
        WorkerEnv {
            lib_path: self.lib_path.clone(),
            ndi_lib_path: self.ndi_lib_path.clone(),
        }
    }

    /// Supervisor settings derived from this configuration
    pub fn supervisor_config(&self) -> SupervisorConfig {
        let mut config = SupervisorConfig::new(
            self.worker_bin.clone(),
            self.worker_env(),
            self.preview_dir.clone(),
        );
        config.start_grace = Duration::from_millis(self.start_grace_ms);
        config.term_grace = Duration::from_secs(self.term_grace_secs);
        config.kill_grace = Duration::from_secs(self.kill_grace_secs);
        config
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Worker process supervisor
    pub supervisor: Arc<ProcessSupervisor>,
    /// Config artifact generator
    pub config_gen: Arc<ConfigGenerator>,
    /// NDI source discovery
    pub discovery: Arc<DiscoveryService>,
    /// Extra-IP allow-list store
    pub extra_ips: Arc<ExtraIpStore>,
    /// PTZ command forwarder
    pub ptz: Arc<PtzForwarder>,
    /// Session authentication
    pub auth: Arc<AuthService>,
    /// Preview frame access
    pub preview: Arc<PreviewStore>,
}
