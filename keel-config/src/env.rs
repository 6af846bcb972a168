// Environment variable loading
//
// `KEEL_CONTAINER__MAX_ALIAS_DEPTH=64` with prefix `KEEL` becomes the key
// `container.max_alias_depth`: the prefix and its separator are stripped, the
// name is lowercased and `__` marks a nesting level.

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Environment variable loader
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Map a variable name to a configuration key, or `None` if it does not
    /// carry the prefix.
    pub fn key_for(&self, var: &str) -> Option<String> {
        let name = match &self.prefix {
            Some(prefix) => {
                let rest = var.strip_prefix(prefix.as_str())?;
                rest.strip_prefix('_')?
            }
            None => var,
        };
        if name.is_empty() {
            return None;
        }
        Some(name.to_lowercase().replace("__", "."))
    }

    /// Load all matching environment variables.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Same as [`load`](Self::load) over an explicit variable list.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(var, value)| self.key_for(&var).map(|key| (key, value)))
            .collect()
    }

    /// Load a specific variable, given as a configuration key.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let name = key.replace('.', "__").to_uppercase();
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}
