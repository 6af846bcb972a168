//! Typed settings for a Keel application
//!
//! ```toml
//! [container]
//! max_alias_depth = 32
//!
//! [routing]
//! cache_path = "storage/routes.json"
//!
//! [log]
//! level = "info"
//! format = "json"
//! ```

use crate::{ConfigManager, ConfigValidator, Result, Validate};
use keel_core::{Container, DEFAULT_MAX_ALIAS_DEPTH, RouteCache};
use keel_log::{Format, Level, LogConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const LEVELS: [&str; 7] = ["trace", "debug", "info", "warn", "warning", "error", "off"];
const FORMATS: [&str; 3] = ["pretty", "compact", "json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    pub max_alias_depth: usize,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Where compiled route matchers are cached; no cache when unset.
    pub cache_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelSettings {
    pub container: ContainerSettings,
    pub routing: RoutingSettings,
    pub log: LogSettings,
}

impl KeelSettings {
    /// Read settings from `manager`, falling back to defaults per field.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            container: ContainerSettings {
                max_alias_depth: read(
                    manager,
                    "container.max_alias_depth",
                    defaults.container.max_alias_depth,
                )?,
            },
            routing: RoutingSettings {
                cache_path: read(manager, "routing.cache_path", defaults.routing.cache_path)?,
            },
            log: LogSettings {
                level: read(manager, "log.level", defaults.log.level)?,
                format: read(manager, "log.format", defaults.log.format)?,
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Logging configuration: environment settings with level and format
    /// taken from these settings.
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if let Some(level) = Level::from_str(&self.log.level) {
            config = config.level(level);
        }
        if let Some(format) = Format::from_str(&self.log.format) {
            config = config.format(format);
        }
        config
    }

    /// A fresh container with the configured alias depth.
    pub fn container(&self) -> Container {
        Container::with_max_alias_depth(self.container.max_alias_depth)
    }

    pub fn route_cache(&self) -> Option<RouteCache> {
        self.routing.cache_path.as_ref().map(RouteCache::new)
    }
}

fn read<T: serde::de::DeserializeOwned>(manager: &ConfigManager, key: &str, default: T) -> Result<T> {
    if manager.has(key) {
        manager.get(key)
    } else {
        Ok(default)
    }
}

impl Validate for KeelSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(
            self.container.max_alias_depth,
            1,
            256,
            "container.max_alias_depth",
        )?;
        if let Some(path) = &self.routing.cache_path {
            ConfigValidator::not_empty(&path.to_string_lossy(), "routing.cache_path")?;
        }
        ConfigValidator::one_of(&self.log.level, &LEVELS, "log.level")?;
        ConfigValidator::one_of(&self.log.format, &FORMATS, "log.format")?;
        Ok(())
    }
}
