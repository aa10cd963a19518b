// Environment variable loading

use crate::loader::nest;
use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;

/// Prefix used when none is given
pub const DEFAULT_PREFIX: &str = "GIRDER";

/// Reads `PREFIX_SECTION__KEY` variables.
///
/// `GIRDER_SERVER__PORT=9000` becomes `server.port = 9000`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Matching variables of the process environment, prefix stripped.
    pub fn load(&self) -> BTreeMap<String, String> {
        self.filter(env::vars())
    }

    /// Matching pairs from any source, prefix stripped.
    pub fn filter<I>(&self, vars: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{}_", self.prefix);
        vars.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), value))
            })
            .collect()
    }

    /// Environment as a configuration tree
    pub fn load_tree(&self) -> Value {
        nest(self.load())
    }

    /// One variable, `key` given without the prefix
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = format!("{}_{}", self.prefix, key.to_ascii_uppercase());
        env::var(&full_key).map_err(|e| match e {
            env::VarError::NotPresent => ConfigError::KeyNotFound(full_key),
            other => ConfigError::EnvError(other),
        })
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
