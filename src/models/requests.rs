//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::manager::is_pattern;

/// Request body for POST /invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Exact keys to delete
    pub keys: Vec<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.keys.is_empty() {
            return Some("At least one key is required".to_string());
        }
        if self.keys.iter().any(|k| k.is_empty()) {
            return Some("Keys cannot be empty".to_string());
        }
        if let Some(pattern) = self.keys.iter().find(|k| is_pattern(k)) {
            return Some(format!(
                "Pattern invalidation is not supported: '{}'",
                pattern
            ));
        }
        None
    }
}
