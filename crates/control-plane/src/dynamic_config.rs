//! Dynamic config store (spec.md §4.5): built-in keys plus an
//! arbitrary key-value overlay, all opaque JSON. Built-ins are seeded
//! at construction and cannot be deleted.

use std::collections::HashMap;

use linkflow_types::EngineError;
use parking_lot::RwLock;
use tracing::info;

pub const RATE_LIMITS: &str = "rate_limits";
pub const FEATURE_FLAGS: &str = "feature_flags";
pub const RETENTION_POLICIES: &str = "retention_policies";

const BUILTIN_KEYS: [&str; 3] = [RATE_LIMITS, FEATURE_FLAGS, RETENTION_POLICIES];

pub struct DynamicConfig {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        let mut values = HashMap::new();
        for key in BUILTIN_KEYS {
            values.insert(key.to_string(), serde_json::json!({}));
        }
        Self { values: RwLock::new(values) }
    }
}

impl DynamicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<serde_json::Value, EngineError> {
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::ConfigKeyNotFound(key.to_string()))
    }

    pub fn set(&self, key: &str, value: serde_json::Value) {
        self.values.write().insert(key.to_string(), value);
        info!(key, "dynamic config key updated");
    }

    pub fn delete(&self, key: &str) -> Result<(), EngineError> {
        if BUILTIN_KEYS.contains(&key) {
            return Err(EngineError::Validation(format!("{key} is a built-in config key and cannot be deleted")));
        }
        self.values
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| EngineError::ConfigKeyNotFound(key.to_string()))?;
        info!(key, "dynamic config key deleted");
        Ok(())
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    pub fn all(&self) -> HashMap<String, serde_json::Value> {
        self.values.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keys_are_seeded() {
        let config = DynamicConfig::new();
        assert!(config.get(RATE_LIMITS).is_ok());
        assert!(config.get(FEATURE_FLAGS).is_ok());
        assert!(config.get(RETENTION_POLICIES).is_ok());
    }

    #[test]
    fn builtin_keys_cannot_be_deleted() {
        let config = DynamicConfig::new();
        assert!(config.delete(RATE_LIMITS).is_err());
    }

    #[test]
    fn custom_keys_round_trip() {
        let config = DynamicConfig::new();
        config.set("my_flag", serde_json::json!(true));
        assert_eq!(config.get("my_flag").unwrap(), serde_json::json!(true));
        config.delete("my_flag").unwrap();
        assert!(config.get("my_flag").is_err());
    }
}
