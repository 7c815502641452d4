//! ProcessSupervisor - Worker Process Lifecycle
//!
//! ## Responsibilities
//!
//! - Own the table of running per-role worker processes
//! - Start, stop, restart, report status; one process per role
//! - Graceful-then-forceful termination with bounded waits
//! - Preview directory lifecycle for the output role
//!
//! ## Concurrency
//!
//! One table-wide mutex guards every mutation and is held across the
//! post-launch liveness check, so concurrent starts for the same role cannot
//! interleave. Liveness of a process is observed lazily when status is
//! queried; a process that exits on its own is never restarted.

mod types;

pub use types::{ProcessStatus, Role, StartInfo, StopInfo, SupervisorConfig};

use crate::error::{Error, Result};
use crate::extra_ips::ExtraIpStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Supervisor's record of a live worker instance
struct ManagedProcess {
    role: Role,
    config_path: PathBuf,
    child: Child,
    pid: u32,
    started_at: DateTime<Utc>,
}

impl ManagedProcess {
    /// Compute the current snapshot. A dead handle is observed here, lazily.
    fn snapshot(&mut self) -> ProcessStatus {
        let running = matches!(self.child.try_wait(), Ok(None));
        let uptime = Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds() as f64
            / 1000.0;
        ProcessStatus {
            name: self.role.as_str().to_string(),
            running,
            pid: if running { Some(self.pid) } else { None },
            config: self.config_path.display().to_string(),
            started_at: self.started_at,
            uptime,
        }
    }
}

/// ProcessSupervisor instance
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    extra_ips: Arc<ExtraIpStore>,
    table: Mutex<HashMap<Role, ManagedProcess>>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig, extra_ips: Arc<ExtraIpStore>) -> Self {
        Self {
            config,
            extra_ips,
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Start the worker for a role with the given config artifact.
    ///
    /// Safe regardless of current occupancy: an incumbent is stopped first.
    /// Fails with [`Error::Start`] if the process does not survive the start
    /// grace window, with captured stderr as diagnostics.
    pub async fn start(&self, role: Role, config_path: PathBuf) -> Result<StartInfo> {
        let mut table = self.table.lock().await;

        if let Some(incumbent) = table.remove(&role) {
            tracing::info!(role = %role, "Stopping incumbent before start");
            self.terminate(incumbent).await;
        }

        if role == Role::Output {
            self.reset_preview_dir().await;
        }

        self.launch(role, config_path, &mut table).await
    }

    /// Stop the worker for a role.
    ///
    /// Never raises: an unoccupied role reports `not_running`, and signal or
    /// wait failures are logged and absorbed. The role entry is removed from
    /// the table regardless, so an unresponsive process cannot leak a slot.
    pub async fn stop(&self, role: Role) -> StopInfo {
        let mut table = self.table.lock().await;

        match table.remove(&role) {
            None => StopInfo::not_running(role),
            Some(managed) => {
                self.terminate(managed).await;
                if role == Role::Output {
                    self.cleanup_preview_dir().await;
                }
                StopInfo::stopped(role)
            }
        }
    }

    /// Restart a role, optionally with a new config artifact.
    ///
    /// Unlike start, restart requires an existing occupant and fails with
    /// [`Error::NotFound`] otherwise. Stop and start happen under one lock
    /// acquisition, so no concurrent start can slip in between.
    pub async fn restart(&self, role: Role, new_config: Option<PathBuf>) -> Result<StartInfo> {
        let mut table = self.table.lock().await;

        let incumbent = table
            .remove(&role)
            .ok_or_else(|| Error::NotFound(format!("process '{}' not found", role)))?;
        let config_path = new_config.unwrap_or_else(|| incumbent.config_path.clone());

        self.terminate(incumbent).await;
        if role == Role::Output {
            self.reset_preview_dir().await;
        }

        self.launch(role, config_path, &mut table).await
    }

    /// Read-only status snapshot for a role. Never mutates the table.
    pub async fn status(&self, role: Role) -> Option<ProcessStatus> {
        let mut table = self.table.lock().await;
        table.get_mut(&role).map(ManagedProcess::snapshot)
    }

    /// Read-only status snapshot of every occupied role.
    pub async fn status_all(&self) -> HashMap<String, ProcessStatus> {
        let mut table = self.table.lock().await;
        table
            .values_mut()
            .map(|managed| (managed.role.as_str().to_string(), managed.snapshot()))
            .collect()
    }

    /// Stop every occupied role, best-effort. Invoked at shutdown; one stuck
    /// process cannot block cleanup of the others.
    pub async fn stop_all(&self) {
        let mut table = self.table.lock().await;
        let roles: Vec<Role> = table.keys().copied().collect();

        for role in roles {
            if let Some(managed) = table.remove(&role) {
                tracing::info!(role = %role, "Stopping process on shutdown");
                self.terminate(managed).await;
                if role == Role::Output {
                    self.cleanup_preview_dir().await;
                }
            }
        }
    }

    async fn launch(
        &self,
        role: Role,
        config_path: PathBuf,
        table: &mut HashMap<Role, ManagedProcess>,
    ) -> Result<StartInfo> {
        tracing::info!(
            role = %role,
            config = %config_path.display(),
            "Starting worker process"
        );

        let mut cmd = Command::new(&self.config.worker_bin);
        cmd.arg("-f")
            .arg(&config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in self.config.worker_env.build(&self.extra_ips).await {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| Error::Start {
            message: format!("failed to spawn {}: {}", self.config.worker_bin.display(), e),
            stderr: String::new(),
        })?;
        let pid = child.id().ok_or_else(|| Error::Start {
            message: "spawned process exited before pid could be read".to_string(),
            stderr: String::new(),
        })?;

        // Bounded liveness check; the table lock stays held so a concurrent
        // start for this role cannot observe a half-launched state.
        tokio::time::sleep(self.config.start_grace).await;
        match child.try_wait() {
            Ok(Some(status)) => {
                let stderr = read_remaining_stderr(&mut child).await;
                tracing::error!(role = %role, %status, stderr = %stderr.trim(), "Worker exited immediately");
                return Err(Error::Start {
                    message: format!("process exited immediately ({})", status),
                    stderr,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(role = %role, error = %e, "Liveness probe failed, assuming process is up");
            }
        }

        drain_output(role, &mut child);

        tracing::info!(role = %role, pid, "Started worker process");
        let info = StartInfo {
            status: "started".to_string(),
            name: role.as_str().to_string(),
            pid,
            config: config_path.display().to_string(),
        };
        table.insert(
            role,
            ManagedProcess {
                role,
                config_path,
                child,
                pid,
                started_at: Utc::now(),
            },
        );
        Ok(info)
    }

    /// Graceful-then-forceful termination. Both waits are bounded and
    /// best-effort; failures are logged, never propagated. kill_on_drop
    /// remains as the final backstop when the handle is dropped.
    async fn terminate(&self, mut managed: ManagedProcess) {
        let role = managed.role;
        let pid = managed.pid;
        tracing::info!(role = %role, pid, "Stopping worker process");

        // SAFETY: sending SIGTERM to a pid we spawned and still hold
        let ret = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if ret != 0 {
            tracing::debug!(role = %role, pid, "SIGTERM delivery failed, process likely already gone");
        }

        match tokio::time::timeout(self.config.term_grace, managed.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(role = %role, pid, %status, "Worker stopped");
                return;
            }
            Ok(Err(e)) => {
                tracing::error!(role = %role, pid, error = %e, "Error waiting for worker");
                return;
            }
            Err(_) => {}
        }

        tracing::warn!(role = %role, pid, "Worker did not stop gracefully, killing");
        if let Err(e) = managed.child.start_kill() {
            tracing::error!(role = %role, pid, error = %e, "SIGKILL delivery failed");
        }
        match tokio::time::timeout(self.config.kill_grace, managed.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(role = %role, pid, %status, "Worker killed");
            }
            Ok(Err(e)) => {
                tracing::error!(role = %role, pid, error = %e, "Error waiting for killed worker");
            }
            Err(_) => {
                tracing::error!(role = %role, pid, "Worker survived kill wait, abandoning handle");
            }
        }
    }

    /// Delete and recreate the preview hand-off directory before an
    /// output-role launch. Best-effort: failures degrade the preview, not
    /// the start.
    async fn reset_preview_dir(&self) {
        let dir = &self.config.preview_dir;
        if let Err(e) = fs::remove_dir_all(dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to clear preview directory");
            }
        }
        match fs::create_dir_all(dir).await {
            Ok(()) => tracing::info!(dir = %dir.display(), "Reset preview directory"),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to create preview directory")
            }
        }
    }

    async fn cleanup_preview_dir(&self) {
        let dir = &self.config.preview_dir;
        match fs::remove_dir_all(dir).await {
            Ok(()) => tracing::info!(dir = %dir.display(), "Cleaned up preview directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to cleanup preview directory")
            }
        }
    }
}

/// Read whatever the dead process left on stderr, bounded so a pipe held
/// open by an orphaned grandchild cannot stall the caller.
async fn read_remaining_stderr(child: &mut Child) -> String {
    let Some(mut stderr) = child.stderr.take() else {
        return String::new();
    };
    let mut buf = String::new();
    let _ = tokio::time::timeout(Duration::from_secs(1), stderr.read_to_string(&mut buf)).await;
    buf
}

/// Forward worker output into the structured log so the pipes never fill.
fn drain_output(role: Role, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(role = %role, stream = "stdout", "{}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(role = %role, stream = "stderr", "{}", line);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker_env::WorkerEnv;
    use std::path::Path;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn long_running_worker(dir: &Path) -> PathBuf {
        write_script(dir, "worker", "#!/bin/sh\nexec sleep 30\n")
    }

    fn supervisor(dir: &Path, worker_bin: PathBuf) -> ProcessSupervisor {
        let config = SupervisorConfig {
            worker_bin,
            worker_env: WorkerEnv {
                lib_path: "/usr/local/lib".to_string(),
                ndi_lib_path: "/usr/local/lib/libndi.so.6".to_string(),
            },
            preview_dir: dir.join("preview"),
            start_grace: Duration::from_millis(150),
            term_grace: Duration::from_millis(1500),
            kill_grace: Duration::from_millis(500),
        };
        let extra_ips = Arc::new(ExtraIpStore::new(dir.join("extra_ips.txt")));
        ProcessSupervisor::new(config, extra_ips)
    }

    fn process_exists(pid: u32) -> bool {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }

    #[tokio::test]
    async fn test_start_status_stop_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        let info = sup
            .start(Role::Viewer, dir.path().join("viewer.xml"))
            .await
            .unwrap();
        assert_eq!(info.status, "started");
        assert_eq!(info.name, "viewer");
        assert!(info.pid > 0);

        let status = sup.status(Role::Viewer).await.unwrap();
        assert!(status.running);
        assert_eq!(status.pid, Some(info.pid));
        assert!(status.config.ends_with("viewer.xml"));

        let stop = sup.stop(Role::Viewer).await;
        assert_eq!(stop.status, "stopped");
        assert!(sup.status(Role::Viewer).await.is_none());
        assert!(!process_exists(info.pid));
    }

    #[tokio::test]
    async fn test_start_replaces_incumbent() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        let first = sup
            .start(Role::Output, dir.path().join("a.xml"))
            .await
            .unwrap();
        let second = sup
            .start(Role::Output, dir.path().join("b.xml"))
            .await
            .unwrap();

        assert_ne!(first.pid, second.pid);
        assert!(!process_exists(first.pid));

        let all = sup.status_all().await;
        assert_eq!(all.len(), 1);
        let status = &all["output"];
        assert!(status.running);
        assert_eq!(status.pid, Some(second.pid));
        assert!(status.config.ends_with("b.xml"));

        sup.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_unoccupied_reports_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        let stop = sup.stop(Role::Viewer).await;
        assert_eq!(stop.status, "not_running");
        assert_eq!(stop.name, "viewer");
    }

    #[tokio::test]
    async fn test_restart_unoccupied_fails_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        let result = sup.restart(Role::Viewer, None).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(sup.status_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_restart_reuses_previous_config() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        let first = sup
            .start(Role::Viewer, dir.path().join("viewer.xml"))
            .await
            .unwrap();
        let second = sup.restart(Role::Viewer, None).await.unwrap();

        assert_ne!(first.pid, second.pid);
        assert_eq!(first.config, second.config);
        assert!(!process_exists(first.pid));

        sup.stop_all().await;
    }

    #[tokio::test]
    async fn test_immediate_exit_is_start_error_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let failing = write_script(
            dir.path(),
            "worker",
            "#!/bin/sh\necho 'boom: no such device' >&2\nexit 3\n",
        );
        let sup = supervisor(dir.path(), failing);

        let result = sup.start(Role::Output, dir.path().join("a.xml")).await;
        match result {
            Err(Error::Start { stderr, .. }) => assert!(stderr.contains("boom")),
            other => panic!("expected start error, got {:?}", other.map(|i| i.status)),
        }
        assert!(sup.status_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_dead_handle_observed_lazily_without_restart() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        let info = sup
            .start(Role::Viewer, dir.path().join("viewer.xml"))
            .await
            .unwrap();
        unsafe {
            libc::kill(info.pid as i32, libc::SIGKILL);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = sup.status(Role::Viewer).await.unwrap();
        assert!(!status.running);
        assert_eq!(status.pid, None);

        // still tracked, still dead on the next query: nothing resurrects it
        let status = sup.status(Role::Viewer).await.unwrap();
        assert!(!status.running);

        sup.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_all_empties_every_role() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));

        sup.start(Role::Output, dir.path().join("a.xml"))
            .await
            .unwrap();
        sup.start(Role::Viewer, dir.path().join("b.xml"))
            .await
            .unwrap();
        assert_eq!(sup.status_all().await.len(), 2);

        sup.stop_all().await;
        assert!(sup.status_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_preview_dir_lifecycle_for_output_role() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path(), long_running_worker(dir.path()));
        let preview = dir.path().join("preview");

        sup.start(Role::Viewer, dir.path().join("v.xml"))
            .await
            .unwrap();
        assert!(!preview.exists());

        sup.start(Role::Output, dir.path().join("o.xml"))
            .await
            .unwrap();
        assert!(preview.exists());

        sup.stop(Role::Output).await;
        assert!(!preview.exists());

        sup.stop_all().await;
    }

    #[tokio::test]
    async fn test_sigterm_resistant_worker_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let stubborn = write_script(
            dir.path(),
            "worker",
            "#!/bin/sh\ntrap '' TERM\nwhile true; do sleep 1; done\n",
        );
        let sup = supervisor(dir.path(), stubborn);

        let info = sup
            .start(Role::Viewer, dir.path().join("v.xml"))
            .await
            .unwrap();
        let stop = sup.stop(Role::Viewer).await;
        assert_eq!(stop.status, "stopped");
        assert!(sup.status(Role::Viewer).await.is_none());
        assert!(!process_exists(info.pid));
    }
}
