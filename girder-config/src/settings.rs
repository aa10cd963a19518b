// Typed configuration sections

use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use girder_core::logging::LogConfig;
use girder_core::{BinderConfig, DispatcherConfig};
use serde::{Deserialize, Serialize};

/// Listener settings for the hosting adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port`, ready for `Application::listen`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything a Girder application reads at startup.
///
/// Every section is optional in the source; missing keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GirderConfig {
    pub server: ServerConfig,
    pub dispatch: DispatcherConfig,
    pub binder: BinderConfig,
    pub logging: LogConfig,
}

impl Validate for GirderConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.server.host, "server.host")?;
        ConfigValidator::in_range(self.binder.max_index, 1, 1_000_000, "binder.max_index")?;

        let keys = &self.dispatch.session_keys;
        ConfigValidator::not_empty(&keys.current_user, "dispatch.session_keys.current_user")?;
        ConfigValidator::not_empty(&keys.roles, "dispatch.session_keys.roles")?;
        ConfigValidator::distinct(
            &keys.current_user,
            &keys.roles,
            ("dispatch.session_keys.current_user", "dispatch.session_keys.roles"),
        )?;

        let uploads = &self.dispatch.uploads;
        ConfigValidator::in_range(
            uploads.max_request_size,
            1,
            usize::MAX,
            "dispatch.uploads.max_request_size",
        )?;
        ConfigValidator::in_range(
            uploads.max_file_size,
            1,
            uploads.max_request_size,
            "dispatch.uploads.max_file_size",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = GirderConfig::default();
        assert_eq!(config.server.address(), "127.0.0.1:8080");
        assert_eq!(config.binder.max_index, 4096);
        assert_eq!(config.dispatch.session_keys.current_user, "currentUser");
        assert!(config.dispatch.static_root.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config: GirderConfig = serde_json::from_value(json!({
            "server": {"port": 9000},
            "dispatch": {"static_root": "public", "uploads": {"max_file_size": 1024}}
        }))
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dispatch.static_root.as_deref(), Some(std::path::Path::new("public")));
        assert_eq!(config.dispatch.uploads.max_file_size, 1024);
        assert_eq!(config.dispatch.uploads.max_request_size, 50 * 1024 * 1024);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = GirderConfig::default();
        config.binder.max_index = 0;
        assert!(config.validate().is_err());

        let mut config = GirderConfig::default();
        config.dispatch.session_keys.roles = "currentUser".into();
        assert!(config.validate().is_err());

        let mut config = GirderConfig::default();
        config.dispatch.uploads.max_file_size = config.dispatch.uploads.max_request_size + 1;
        assert!(config.validate().is_err());
    }
}
