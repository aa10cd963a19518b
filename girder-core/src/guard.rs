// Route authorization policies

use crate::logging::debug;
use crate::session::Session;
use crate::Error;
use serde::{Deserialize, Serialize};

/// Access policy attached to a route.
///
/// Evaluated in order: `anonymous` allows everyone, `authenticated` requires a
/// current user, a non-empty `roles` list requires one of those roles. A
/// policy that matches none of these branches denies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPolicy {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub anonymous: bool,
}

impl AuthPolicy {
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Default::default()
        }
    }

    pub fn authenticated() -> Self {
        Self {
            authenticated: true,
            ..Default::default()
        }
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Session attribute names the guard reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionKeys {
    pub current_user: String,
    pub roles: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            current_user: "currentUser".to_string(),
            roles: "roles".to_string(),
        }
    }
}

/// Check a request's session against a route policy.
///
/// `None` policy allows unconditionally.
pub fn authorize(
    policy: Option<&AuthPolicy>,
    session: Option<&Session>,
    keys: &SessionKeys,
) -> Result<(), Error> {
    let Some(policy) = policy else {
        return Ok(());
    };

    if policy.anonymous {
        return Ok(());
    }

    if policy.authenticated {
        let logged_in = session.is_some_and(|s| s.contains(&keys.current_user));
        return if logged_in {
            Ok(())
        } else {
            Err(Error::Unauthorized("Authentication required".to_string()))
        };
    }

    if !policy.roles.is_empty() {
        let held = session
            .and_then(|s| s.get_value(&keys.roles))
            .map(normalize_roles)
            .unwrap_or_default();
        debug!(required = ?policy.roles, held = ?held, "Checking roles");

        return if held.iter().any(|role| policy.roles.contains(role)) {
            Ok(())
        } else {
            Err(Error::Forbidden("Insufficient role".to_string()))
        };
    }

    Err(Error::Unauthorized("Access denied".to_string()))
}

/// Flatten a stored role attribute into a list of role names.
///
/// Accepts a JSON array (of strings or other scalars) or a comma-separated
/// string. Entries are trimmed and blanks dropped.
pub fn normalize_roles(value: &serde_json::Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        serde_json::Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        serde_json::Value::String(s) => s.split(',').map(str::to_string).collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![other.to_string()],
    };

    raw.into_iter()
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .collect()
}
