// Configuration management for Girder applications
//
// Sources are layered into one JSON tree: files first, then `.env` pairs,
// then prefixed process environment variables. Later sources win key by key.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{EnvLoader, DEFAULT_PREFIX};
pub use error::{ConfigError, Result};
pub use loader::{merge, ConfigLoader, FileFormat};
pub use settings::{GirderConfig, ServerConfig};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Layered configuration store.
///
/// ```
/// use girder_config::{ConfigManager, FileFormat};
///
/// let manager = ConfigManager::new();
/// manager
///     .load_str(r#"{"server": {"port": 9000}}"#, FileFormat::Json)
///     .unwrap();
/// let config = manager.girder_config().unwrap();
/// assert_eq!(config.server.port, 9000);
/// ```
#[derive(Clone)]
pub struct ConfigManager {
    tree: Arc<RwLock<Value>>,
    env: EnvLoader,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Manager reading `PREFIX_…` environment variables
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            tree: Arc::new(RwLock::new(Value::Object(Map::new()))),
            env: EnvLoader::new(prefix),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge a parsed tree over the current one
    pub fn merge_value(&self, value: Value) {
        merge(&mut self.write(), value);
    }

    /// Merge a configuration file; the format comes from its name.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(value);
        Ok(())
    }

    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let value = ConfigLoader::new(format).parse(content)?;
        self.merge_value(value);
        Ok(())
    }

    /// Merge prefixed pairs from a `.env` file without touching the process
    /// environment. Without a path, `.env` is searched from the current
    /// directory upwards and a missing file is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        let iter = match path {
            Some(path) => dotenvy::from_path_iter(path)
                .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?,
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => iter,
                Err(e) if e.not_found() => return Ok(()),
                Err(e) => return Err(ConfigError::LoadError(e.to_string())),
            },
        };

        let pairs = iter
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        self.load_env_pairs(pairs);
        Ok(())
    }

    /// Merge prefixed variables of the process environment
    pub fn load_env(&self) {
        self.merge_value(self.env.load_tree());
    }

    /// Merge prefixed variables from any source
    pub fn load_env_pairs<I>(&self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.merge_value(loader::nest(self.env.filter(vars)));
    }

    /// Set a value at a dotted path, creating sections as needed.
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let overlay = key
            .rsplit('.')
            .fold(value, |inner, segment| {
                let mut map = Map::new();
                map.insert(segment.to_string(), inner);
                Value::Object(map)
            });
        self.merge_value(overlay);
        Ok(())
    }

    /// Value at a dotted path, e.g. `server.port`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let tree = self.read();
        let value = lookup(&tree, key).ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        lookup(&self.read(), key).is_some()
    }

    /// Snapshot of the merged tree
    pub fn snapshot(&self) -> Value {
        self.read().clone()
    }

    /// Deserialize the whole tree and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let config: T = serde_json::from_value(self.snapshot()).map_err(|e| {
            ConfigError::InvalidValue {
                key: "<root>".to_string(),
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The standard sections, validated
    pub fn girder_config(&self) -> Result<GirderConfig> {
        self.load_validated()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}
