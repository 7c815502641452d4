//! Shared response models
//!
//! Types shared across multiple modules to avoid circular dependencies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::process_supervisor::ProcessStatus;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub processes: HashMap<String, ProcessStatus>,
}
