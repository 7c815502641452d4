//! ExtraIpStore - Persisted Unicast Allow-List for NDI Discovery
//!
//! ## Responsibilities
//!
//! - Keep the operator-maintained list of extra unicast addresses that the
//!   worker binary should probe beyond local multicast range
//! - Persist to a flat newline-delimited file, rewritten on every mutation
//! - Render the list as the NDI_EXTRA_IPS environment value

use crate::error::Result;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// ExtraIpStore instance
///
/// Entries are unique and kept in insertion order. The mutex serializes
/// read-modify-write cycles within this process; concurrent external writers
/// still race (last write wins).
pub struct ExtraIpStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ExtraIpStore {
    /// Create a store backed by the given file. The file is created lazily
    /// on first mutation.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Read the current list. A missing or unreadable file is an empty list.
    pub async fn get(&self) -> Vec<String> {
        let _guard = self.lock.lock().await;
        self.read_file().await
    }

    /// Replace the list wholesale, deduplicating while preserving order.
    pub async fn set(&self, ips: Vec<String>) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        let mut unique: Vec<String> = Vec::with_capacity(ips.len());
        for ip in ips {
            let ip = ip.trim().to_string();
            if !ip.is_empty() && !unique.contains(&ip) {
                unique.push(ip);
            }
        }
        self.write_file(&unique).await?;
        tracing::info!(ips = ?unique, "Updated extra IPs");
        Ok(unique)
    }

    /// Add an address. Idempotent: adding an existing address is a no-op.
    pub async fn add(&self, ip: &str) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        let mut ips = self.read_file().await;
        let ip = ip.trim();
        if !ip.is_empty() && !ips.iter().any(|existing| existing == ip) {
            ips.push(ip.to_string());
            self.write_file(&ips).await?;
            tracing::info!(ip = %ip, "Added extra IP");
        }
        Ok(ips)
    }

    /// Remove an address. A no-op if the address is absent.
    pub async fn remove(&self, ip: &str) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        let mut ips = self.read_file().await;
        let before = ips.len();
        ips.retain(|existing| existing != ip);
        if ips.len() != before {
            self.write_file(&ips).await?;
            tracing::info!(ip = %ip, "Removed extra IP");
        }
        Ok(ips)
    }

    /// Render the list as a comma-joined NDI_EXTRA_IPS value.
    /// Returns None when the list is empty.
    pub async fn env_value(&self) -> Option<String> {
        let ips = self.get().await;
        if ips.is_empty() {
            None
        } else {
            Some(ips.join(","))
        }
    }

    async fn read_file(&self) -> Vec<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read extra IPs");
                Vec::new()
            }
        }
    }

    async fn write_file(&self, ips: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, ips.join("\n")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ExtraIpStore {
        ExtraIpStore::new(dir.path().join("extra_ips.txt"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.get().await.is_empty());
        assert!(store.env_value().await.is_none());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add("192.168.1.50").await.unwrap();
        let ips = store.add("192.168.1.50").await.unwrap();
        assert_eq!(ips, vec!["192.168.1.50".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add("10.0.0.1").await.unwrap();
        let ips = store.remove("10.0.0.2").await.unwrap();
        assert_eq!(ips, vec!["10.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add("10.0.0.1").await.unwrap();
        let ips = store
            .set(vec![
                "10.0.0.9".to_string(),
                "10.0.0.8".to_string(),
                "10.0.0.9".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(ips, vec!["10.0.0.9".to_string(), "10.0.0.8".to_string()]);
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store_in(&dir);
            store.add("172.16.0.4").await.unwrap();
        }
        let store = store_in(&dir);
        assert_eq!(store.get().await, vec!["172.16.0.4".to_string()]);
        assert_eq!(store.env_value().await.as_deref(), Some("172.16.0.4"));
    }
}
