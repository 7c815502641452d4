//! NDI Controller Library
//!
//! Web-based controller for NDI video workflows on small single-board
//! machines. Orchestrates the yuri2 streaming engine as black-box worker
//! processes.
//!
//! ## Components
//!
//! 1. ProcessSupervisor - per-role worker lifecycle (output, viewer)
//! 2. ConfigGenerator - worker pipeline configs from templates
//! 3. DiscoveryService - NDI source enumeration with fallback
//! 4. ExtraIpStore - persisted unicast allow-list for discovery
//! 5. PtzForwarder - PTZ commands to the worker control endpoint
//! 6. PreviewStore - preview frames from the shared-memory ramdisk
//! 7. AuthService - session-based authentication
//! 8. WebAPI - REST API endpoints

pub mod auth_service;
pub mod config_generator;
pub mod discovery;
pub mod error;
pub mod extra_ips;
pub mod models;
pub mod preview;
pub mod process_supervisor;
pub mod ptz_forwarder;
pub mod state;
pub mod video_devices;
pub mod web_api;
pub mod worker_env;

pub use error::{Error, Result};
pub use state::AppState;
