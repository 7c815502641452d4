//! AuthService - Session-Based Authentication
//!
//! ## Responsibilities
//!
//! - Verify credentials against a JSON file (SHA-256 password hash)
//! - Issue and validate in-memory session tokens
//! - Credential changes gated on the current password
//!
//! Sessions do not survive a restart; the credentials file does. A missing
//! file is created with the default admin/admin pair.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credentials {
    username: String,
    password_hash: String,
}

impl Credentials {
    fn default_pair() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password_hash: hash_password(DEFAULT_PASSWORD),
        }
    }
}

/// AuthService instance
pub struct AuthService {
    credentials_file: PathBuf,
    /// Serializes credential file read-modify-write
    file_lock: Mutex<()>,
    /// token -> username
    sessions: RwLock<HashMap<String, String>>,
}

impl AuthService {
    /// Create the service, seeding the credentials file with defaults when
    /// it does not exist yet.
    pub async fn new(credentials_file: PathBuf) -> Result<Self> {
        let service = Self {
            credentials_file,
            file_lock: Mutex::new(()),
            sessions: RwLock::new(HashMap::new()),
        };

        if !service.credentials_file.exists() {
            service.save_credentials(&Credentials::default_pair()).await?;
            tracing::info!(
                path = %service.credentials_file.display(),
                "Created default credentials file"
            );
        }

        Ok(service)
    }

    /// Authenticate and return a session token, or None on bad credentials.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<String> {
        let _guard = self.file_lock.lock().await;
        let credentials = self.load_credentials().await;

        if username == credentials.username && hash_password(password) == credentials.password_hash
        {
            let token = generate_token();
            self.sessions
                .write()
                .await
                .insert(token.clone(), username.to_string());
            tracing::info!(username = %username, "User authenticated");
            return Some(token);
        }

        tracing::warn!(username = %username, "Failed authentication attempt");
        None
    }

    /// Resolve a session token to its username, or None when invalid.
    pub async fn validate_session(&self, token: &str) -> Option<String> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Invalidate a session token. Returns whether it existed.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Change username and/or password. Requires a valid session and the
    /// current password.
    pub async fn change_credentials(
        &self,
        token: &str,
        new_username: Option<&str>,
        new_password: Option<&str>,
        current_password: &str,
    ) -> Result<()> {
        if new_username.is_none() && new_password.is_none() {
            return Err(Error::Validation(
                "new username or password required".to_string(),
            ));
        }

        let username = self
            .validate_session(token)
            .await
            .ok_or_else(|| Error::Unauthorized("invalid session".to_string()))?;

        let _guard = self.file_lock.lock().await;
        let credentials = self.load_credentials().await;
        if hash_password(current_password) != credentials.password_hash {
            return Err(Error::Unauthorized(
                "current password is incorrect".to_string(),
            ));
        }

        let updated = Credentials {
            username: new_username.unwrap_or(&credentials.username).to_string(),
            password_hash: new_password
                .map(hash_password)
                .unwrap_or(credentials.password_hash),
        };
        self.save_credentials(&updated).await?;

        // keep the active session valid under the new username
        self.sessions
            .write()
            .await
            .insert(token.to_string(), updated.username.clone());

        tracing::info!(
            old_username = %username,
            username = %updated.username,
            "Credentials updated"
        );
        Ok(())
    }

    async fn load_credentials(&self) -> Credentials {
        match fs::read_to_string(&self.credentials_file).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(credentials) => credentials,
                Err(e) => {
                    tracing::error!(error = %e, "Corrupt credentials file, using defaults");
                    Credentials::default_pair()
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to load credentials, using defaults");
                Credentials::default_pair()
            }
        }
    }

    async fn save_credentials(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.credentials_file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(
            &self.credentials_file,
            serde_json::to_string_pretty(credentials)?,
        )
        .await?;
        Ok(())
    }
}

fn hash_password(password: &str) -> String {
    hex_encode(&Sha256::digest(password.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes[..]);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
