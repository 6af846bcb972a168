// Configuration management for the Keel framework

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, load_route_manifest, load_service_manifest};
pub use settings::{ContainerSettings, KeelSettings, LogSettings, RoutingSettings};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "KEEL";

/// Main configuration manager
///
/// Keys are looked up verbatim first and then as a dotted path into nested
/// objects, so `container.max_alias_depth` finds both a flat environment key
/// and the `max_alias_depth` field of a `[container]` table.
#[derive(Clone, Debug, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        debug!(count = env_vars.len(), prefix = ?self.env_prefix, "Loaded environment configuration");

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load a `.env` file into the process environment, then load the
    /// environment. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Load configuration from file; top-level keys replace existing ones.
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data)
    }

    /// Merge a JSON object into the configuration.
    pub fn merge_value(&self, data: Value) -> Result<()> {
        let Value::Object(map) = data else {
            return Err(ConfigError::ParseError(
                "configuration root must be an object".to_string(),
            ));
        };

        let mut config = self.config.write();
        for (key, value) in map {
            config.insert(key, value);
        }
        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.config.write().insert(key.to_string(), json_value);
        Ok(())
    }

    /// Raw value for a key or dotted path.
    pub fn value(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        if let Some(value) = config.get(key) {
            return Some(value.clone());
        }

        let mut segments = key.split('.');
        let mut current = config.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Get a configuration value
    ///
    /// String values (as read from the environment) are also accepted where
    /// a number or boolean is expected.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        match serde_json::from_value::<T>(value.clone()) {
            Ok(v) => Ok(v),
            Err(e) => {
                let reparsed = match &value {
                    Value::String(s) => serde_json::from_str::<T>(s).ok(),
                    _ => None,
                };
                reparsed.ok_or_else(|| ConfigError::DeserializationError {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    /// Check if a key or dotted path exists
    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Top-level keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Merge configuration from another manager; its values win.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let other_config = other.config.read();
        let mut config = self.config.write();
        for (key, value) in other_config.iter() {
            config.insert(key.clone(), value.clone());
        }
    }

    /// Deserialize the whole configuration as `T` and validate it
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let json_value = Value::Object(
            self.config
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let validated: T =
            serde_json::from_value(json_value).map_err(|e| ConfigError::DeserializationError {
                key: "<root>".to_string(),
                reason: e.to_string(),
            })?;

        validated.validate()?;
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();
        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_dotted_paths() {
        let manager = ConfigManager::new();
        manager
            .merge_value(serde_json::json!({"container": {"max_alias_depth": 8}}))
            .unwrap();

        assert_eq!(manager.get::<usize>("container.max_alias_depth").unwrap(), 8);
        assert!(manager.has("container"));
        assert!(!manager.has("container.missing"));

        manager.set("container.max_alias_depth", "12").unwrap();
        assert_eq!(manager.get::<usize>("container.max_alias_depth").unwrap(), 12);
    }

    #[test]
    fn test_string_values_coerce() {
        let manager = ConfigManager::new();
        manager.set("port", "8080").unwrap();
        manager.set("debug", "true").unwrap();

        assert_eq!(manager.get_int("port").unwrap(), 8080);
        assert!(manager.get_bool("debug").unwrap());
        assert_eq!(manager.get_string("port").unwrap(), "8080");
        assert!(matches!(
            manager.get_int("debug"),
            Err(ConfigError::DeserializationError { .. })
        ));
    }

    #[test]
    fn test_merge() {
        let base = ConfigManager::new();
        base.set("a", 1).unwrap();
        base.set("b", 1).unwrap();
        let overrides = ConfigManager::new();
        overrides.set("b", 2).unwrap();

        base.merge(&overrides);
        base.merge(&base.clone());
        assert_eq!(base.get_int("b").unwrap(), 2);
        assert_eq!(base.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_non_object_root_rejected() {
        let manager = ConfigManager::new();
        assert!(manager.merge_value(serde_json::json!([1, 2])).is_err());
    }
}
