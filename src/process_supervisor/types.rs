//! Supervisor types

use crate::worker_env::WorkerEnv;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A fixed worker function slot. At most one live process per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Camera capture to NDI output
    Output,
    /// NDI source viewer
    Viewer,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Output, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Output => "output",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        match name {
            "output" => Some(Role::Output),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor settings
///
/// The grace durations are tunable; the defaults mirror the empirically
/// chosen shutdown windows of the deployed system.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Worker binary, invoked as `<worker_bin> -f <config_path>`
    pub worker_bin: PathBuf,
    /// Shared-library environment for worker launches
    pub worker_env: WorkerEnv,
    /// Shared-memory directory for output-role preview frames
    pub preview_dir: PathBuf,
    /// Post-launch liveness window before a start is considered successful
    pub start_grace: Duration,
    /// Wait after SIGTERM before escalating
    pub term_grace: Duration,
    /// Wait after SIGKILL before abandoning the handle
    pub kill_grace: Duration,
}

impl SupervisorConfig {
    pub fn new(worker_bin: PathBuf, worker_env: WorkerEnv, preview_dir: PathBuf) -> Self {
        Self {
            worker_bin,
            worker_env,
            preview_dir,
            start_grace: Duration::from_millis(500),
            term_grace: Duration::from_secs(5),
            kill_grace: Duration::from_secs(2),
        }
    }
}

/// Launch metadata returned from a successful start.
/// Callers never receive the process handle; all further control goes
/// through the role name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInfo {
    pub status: String,
    pub name: String,
    pub pid: u32,
    pub config: String,
}

/// Outcome of a stop request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopInfo {
    pub status: String,
    pub name: String,
}

impl StopInfo {
    pub fn stopped(role: Role) -> Self {
        Self {
            status: "stopped".to_string(),
            name: role.as_str().to_string(),
        }
    }

    pub fn not_running(role: Role) -> Self {
        Self {
            status: "not_running".to_string(),
            name: role.as_str().to_string(),
        }
    }
}

/// Read-only snapshot of a managed process.
/// `running` and `uptime` are computed at snapshot time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStatus {
    pub name: String,
    pub running: bool,
    pub pid: Option<u32>,
    pub config: String,
    pub started_at: DateTime<Utc>,
    pub uptime: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("recorder"), None);
    }
}
