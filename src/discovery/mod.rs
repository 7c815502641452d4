//! DiscoveryService - NDI Source Enumeration
//!
//! ## Responsibilities
//!
//! - Invoke the dedicated discovery helper under a hard wall-clock timeout
//! - Fall back to the worker binary's enumeration mode when the helper is
//!   not installed
//! - Parse enumeration output with the two-state scanner in [`parse`]
//!
//! A timed-out discovery returns an empty list: absence of sources on the
//! network is a normal outcome, not an error. Only a failed invocation
//! (spawn error, I/O error, both binaries missing) raises.

mod parse;

pub use parse::DiscoveredSource;

use crate::error::{Error, Result};
use crate::extra_ips::ExtraIpStore;
use crate::worker_env::WorkerEnv;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Extra wall-clock allowance for the helper to initialize and print after
/// its own discovery window closes.
const DEFAULT_HELPER_GRACE: Duration = Duration::from_secs(5);

/// Discovery invocation settings
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Worker binary, used in enumeration mode as the fallback
    pub worker_bin: PathBuf,
    /// Dedicated discovery helper, preferred when present
    pub discover_bin: PathBuf,
    /// Shared-library environment for both invocations
    pub worker_env: WorkerEnv,
    /// Wall-clock allowance beyond the helper's own timeout
    pub helper_grace: Duration,
}

impl DiscoveryConfig {
    pub fn new(worker_bin: PathBuf, discover_bin: PathBuf, worker_env: WorkerEnv) -> Self {
        Self {
            worker_bin,
            discover_bin,
            worker_env,
            helper_grace: DEFAULT_HELPER_GRACE,
        }
    }
}

/// DiscoveryService instance
pub struct DiscoveryService {
    config: DiscoveryConfig,
    extra_ips: Arc<ExtraIpStore>,
}

impl DiscoveryService {
    pub fn new(config: DiscoveryConfig, extra_ips: Arc<ExtraIpStore>) -> Self {
        Self { config, extra_ips }
    }

    /// Discover currently visible NDI sources.
    ///
    /// `timeout_secs` bounds the helper's own discovery window; the
    /// subprocess itself is reaped after that window plus a grace allowance.
    /// Timeout yields `Ok(vec![])`.
    pub async fn discover(&self, timeout_secs: u64) -> Result<Vec<DiscoveredSource>> {
        tracing::info!(timeout_secs, "Starting NDI source discovery");

        let (program, args, wall_clock) = if self.config.discover_bin.exists() {
            (
                self.config.discover_bin.clone(),
                vec!["-t".to_string(), timeout_secs.to_string()],
                Duration::from_secs(timeout_secs) + self.config.helper_grace,
            )
        } else {
            tracing::debug!(
                discover_bin = %self.config.discover_bin.display(),
                "Discovery helper not found, falling back to worker enumeration"
            );
            (
                self.config.worker_bin.clone(),
                vec!["-I".to_string(), "ndi_input".to_string()],
                Duration::from_secs(timeout_secs.max(1)),
            )
        };

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in self.config.worker_env.build(&self.extra_ips).await {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| {
            Error::Discovery(format!("failed to spawn {}: {}", program.display(), e))
        })?;

        // On timeout the future is cancelled, the child is dropped, and
        // kill_on_drop reaps the expired helper rather than leaking it.
        match tokio::time::timeout(wall_clock, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if !output.stderr.is_empty() {
                    tracing::debug!(
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "Discovery stderr"
                    );
                }
                let sources = parse::parse_enumeration(&stdout);
                tracing::info!(count = sources.len(), "Discovered NDI sources");
                Ok(sources)
            }
            Ok(Err(e)) => Err(Error::Discovery(format!(
                "{} failed: {}",
                program.display(),
                e
            ))),
            Err(_) => {
                tracing::warn!(timeout_secs, "NDI discovery timed out");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn service(
        dir: &tempfile::TempDir,
        worker_bin: PathBuf,
        discover_bin: PathBuf,
    ) -> DiscoveryService {
        let mut config = DiscoveryConfig::new(
            worker_bin,
            discover_bin,
            WorkerEnv {
                lib_path: "/usr/local/lib".to_string(),
                ndi_lib_path: "/usr/local/lib/libndi.so.6".to_string(),
            },
        );
        config.helper_grace = Duration::from_millis(500);
        let extra_ips = Arc::new(ExtraIpStore::new(dir.path().join("extra_ips.txt")));
        DiscoveryService::new(config, extra_ips)
    }

    #[tokio::test]
    async fn test_helper_output_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let helper = write_script(
            dir.path(),
            "ndi_discover",
            "#!/bin/sh\n\
             echo 'Found 2 devices'\n\
             echo 'Device A (x) with 1 configurations'\n\
             echo '  address: 10.0.0.5:5960'\n\
             echo 'Device B (y) with 1 configurations'\n\
             echo '  address: 10.0.0.6:5960'\n",
        );
        let svc = service(&dir, PathBuf::from("/nonexistent/yuri2"), helper);

        let sources = svc.discover(1).await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "A");
        assert_eq!(sources[0].address, "10.0.0.5:5960");
        assert_eq!(sources[1].name, "B");
    }

    #[tokio::test]
    async fn test_timeout_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let helper = write_script(dir.path(), "ndi_discover", "#!/bin/sh\nexec sleep 30\n");
        let svc = service(&dir, PathBuf::from("/nonexistent/yuri2"), helper);

        let sources = svc.discover(0).await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_worker_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let worker = write_script(
            dir.path(),
            "yuri2",
            "#!/bin/sh\n\
             [ \"$1\" = \"-I\" ] || exit 2\n\
             echo 'Device Fallback with 1 configurations'\n\
             echo '  address: 10.9.9.9:5960'\n",
        );
        let svc = service(&dir, worker, PathBuf::from("/nonexistent/ndi_discover"));

        let sources = svc.discover(2).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "Fallback");
    }

    #[tokio::test]
    async fn test_missing_binaries_raise() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(
            &dir,
            PathBuf::from("/nonexistent/yuri2"),
            PathBuf::from("/nonexistent/ndi_discover"),
        );

        assert!(matches!(svc.discover(1).await, Err(Error::Discovery(_))));
    }

    #[tokio::test]
    async fn test_extra_ips_reach_helper_environment() {
        let dir = tempfile::tempdir().unwrap();
        let helper = write_script(
            dir.path(),
            "ndi_discover",
            "#!/bin/sh\n\
             echo 'Device EnvProbe with 1 configurations'\n\
             echo \"  address: $NDI_EXTRA_IPS\"\n",
        );
        let svc = service(&dir, PathBuf::from("/nonexistent/yuri2"), helper);
        svc.extra_ips.add("10.1.1.1").await.unwrap();

        let sources = svc.discover(1).await.unwrap();
        assert_eq!(sources[0].address, "10.1.1.1");
    }
}
