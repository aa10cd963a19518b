// Configuration validation

use crate::{ConfigError, Result};

/// Checks a loaded configuration before it is used.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display,
    {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {} (got {})",
                field, min, max, value
            )));
        }
        Ok(())
    }

    /// Two settings that must not hold the same value
    pub fn distinct(a: &str, b: &str, fields: (&str, &str)) -> Result<()> {
        if a == b {
            return Err(ConfigError::ValidationError(format!(
                "{} and {} must differ",
                fields.0, fields.1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert!(ConfigValidator::not_empty("host", "server.host").is_ok());
        assert!(ConfigValidator::not_empty("  ", "server.host").is_err());
    }

    #[test]
    fn test_in_range_message() {
        let err = ConfigValidator::in_range(0usize, 1, 100, "binder.max_index").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: binder.max_index must be between 1 and 100 (got 0)"
        );
        assert!(ConfigValidator::in_range(5, 1, 100, "x").is_ok());
    }

    #[test]
    fn test_distinct() {
        assert!(ConfigValidator::distinct("user", "roles", ("a", "b")).is_ok());
        assert!(ConfigValidator::distinct("user", "user", ("a", "b")).is_err());
    }
}
