//! Worker process environment construction
//!
//! Both discovery and the supervisor launch the worker binary (or its
//! discovery helper) with the same NDI environment: the shared-library
//! search path, the NDI runtime path, and the extra-IP allow-list.

use crate::extra_ips::ExtraIpStore;

/// Shared-library paths injected into every worker invocation
#[derive(Debug, Clone)]
pub struct WorkerEnv {
    /// Directory prepended to LD_LIBRARY_PATH
    pub lib_path: String,
    /// Full path to the NDI runtime library (NDI_PATH)
    pub ndi_lib_path: String,
}

impl WorkerEnv {
    /// Build the environment variable set for a worker launch. The parent
    /// environment is inherited by the spawned process; these entries are
    /// overlaid on top of it.
    pub async fn build(&self, extra_ips: &ExtraIpStore) -> Vec<(String, String)> {
        let mut env = Vec::with_capacity(3);

        let ld_path = match std::env::var("LD_LIBRARY_PATH") {
            Ok(existing) if !existing.is_empty() => format!("{}:{}", self.lib_path, existing),
            _ => self.lib_path.clone(),
        };
        env.push(("LD_LIBRARY_PATH".to_string(), ld_path));
        env.push(("NDI_PATH".to_string(), self.ndi_lib_path.clone()));

        if let Some(ips) = extra_ips.env_value().await {
            tracing::debug!(extra_ips = %ips, "Using extra IPs for NDI discovery");
            env.push(("NDI_EXTRA_IPS".to_string(), ips));
        }

        env
    }
}
