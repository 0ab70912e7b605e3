//! Redis URL for the web session store.
//!
//! An explicit `SESSION_REDIS` wins. In development the local server is
//! used; everywhere else the URL comes from the Cloud Foundry service
//! binding named by `DM_REDIS_SERVICE_NAME`.

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde_json::Value;

use crate::runtime::Runtime;

pub const SESSION_REDIS_ENV: &str = "SESSION_REDIS";
pub const ENVIRONMENT_ENV: &str = "DM_ENVIRONMENT";
pub const REDIS_SERVICE_NAME_ENV: &str = "DM_REDIS_SERVICE_NAME";
pub const VCAP_SERVICES_ENV: &str = "VCAP_SERVICES";

pub const DEVELOPMENT_ENVIRONMENT: &str = "development";
pub const LOCAL_REDIS_URL: &str = "redis://localhost:6379/0";

/// Resolves the session store's Redis URL from the environment.
#[tracing::instrument(skip(runtime))]
pub fn redis_url<R: Runtime>(runtime: &R) -> Result<String> {
    if let Some(url) = runtime
        .env_var(SESSION_REDIS_ENV)
        .ok()
        .filter(|url| !url.is_empty())
    {
        debug!("Using {} for the session store", SESSION_REDIS_ENV);
        return Ok(url);
    }

    if runtime.env_var(ENVIRONMENT_ENV).ok().as_deref() == Some(DEVELOPMENT_ENVIRONMENT) {
        return Ok(LOCAL_REDIS_URL.to_string());
    }

    let service_name = runtime
        .env_var(REDIS_SERVICE_NAME_ENV)
        .with_context(|| format!("{} is not set", REDIS_SERVICE_NAME_ENV))?;
    let vcap_services = runtime
        .env_var(VCAP_SERVICES_ENV)
        .with_context(|| format!("{} is not set", VCAP_SERVICES_ENV))?;
    let vcap_services: Value = serde_json::from_str(&vcap_services)
        .with_context(|| format!("Failed to parse {}", VCAP_SERVICES_ENV))?;

    let service = service_by_name(&vcap_services, &service_name)
        .ok_or_else(|| anyhow!("Service '{}' not found in {}", service_name, VCAP_SERVICES_ENV))?;

    service
        .pointer("/credentials/uri")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Service '{}' has no credentials.uri", service_name))
}

/// Finds the bound service called `name`. `VCAP_SERVICES` maps each
/// service label to a list of bindings.
pub fn service_by_name<'a>(vcap_services: &'a Value, name: &str) -> Option<&'a Value> {
    vcap_services
        .as_object()?
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .find(|service| service.get("name").and_then(Value::as_str) == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use serde_json::json;
    use std::collections::HashMap;

    fn runtime_with_env(vars: &[(&str, &str)]) -> MockRuntime {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            vars.get(key)
                .cloned()
                .ok_or(std::env::VarError::NotPresent)
        });
        runtime
    }

    fn vcap_services() -> String {
        json!({
            "redis": [
                {"name": "other-redis", "credentials": {"uri": "rediss://other:6379"}},
                {"name": "session-redis", "credentials": {"uri": "rediss://session:6379"}},
            ],
            "postgres": [
                {"name": "db", "credentials": {"uri": "postgres://db"}},
            ],
        })
        .to_string()
    }

    #[test]
    fn test_explicit_session_redis_wins() {
        let runtime = runtime_with_env(&[
            (SESSION_REDIS_ENV, "redis://explicit:6379"),
            (ENVIRONMENT_ENV, "production"),
        ]);
        assert_eq!(redis_url(&runtime).unwrap(), "redis://explicit:6379");
    }

    #[test]
    fn test_development_uses_local_redis() {
        let runtime = runtime_with_env(&[(ENVIRONMENT_ENV, "development")]);
        assert_eq!(redis_url(&runtime).unwrap(), LOCAL_REDIS_URL);
    }

    #[test]
    fn test_empty_session_redis_is_ignored() {
        let runtime = runtime_with_env(&[(SESSION_REDIS_ENV, ""), (ENVIRONMENT_ENV, "development")]);
        assert_eq!(redis_url(&runtime).unwrap(), LOCAL_REDIS_URL);
    }

    #[test]
    fn test_bound_service_uri() {
        let vcap = vcap_services();
        let runtime = runtime_with_env(&[
            (ENVIRONMENT_ENV, "production"),
            (REDIS_SERVICE_NAME_ENV, "session-redis"),
            (VCAP_SERVICES_ENV, &vcap),
        ]);
        assert_eq!(redis_url(&runtime).unwrap(), "rediss://session:6379");
    }

    #[test]
    fn test_missing_service() {
        let vcap = vcap_services();
        let runtime = runtime_with_env(&[
            (ENVIRONMENT_ENV, "production"),
            (REDIS_SERVICE_NAME_ENV, "nope"),
            (VCAP_SERVICES_ENV, &vcap),
        ]);
        let err = redis_url(&runtime).unwrap_err();
        assert!(err.to_string().contains("'nope' not found"));
    }

    #[test]
    fn test_malformed_vcap_services() {
        let runtime = runtime_with_env(&[
            (ENVIRONMENT_ENV, "production"),
            (REDIS_SERVICE_NAME_ENV, "session-redis"),
            (VCAP_SERVICES_ENV, "{not json"),
        ]);
        let err = redis_url(&runtime).unwrap_err();
        assert!(err.to_string().contains("Failed to parse VCAP_SERVICES"));
    }

    #[test]
    fn test_service_without_uri() {
        let vcap = json!({"redis": [{"name": "session-redis", "credentials": {}}]}).to_string();
        let runtime = runtime_with_env(&[
            (ENVIRONMENT_ENV, "production"),
            (REDIS_SERVICE_NAME_ENV, "session-redis"),
            (VCAP_SERVICES_ENV, &vcap),
        ]);
        assert!(redis_url(&runtime).is_err());
    }

    #[test]
    fn test_missing_service_name() {
        let runtime = runtime_with_env(&[(ENVIRONMENT_ENV, "production")]);
        let err = redis_url(&runtime).unwrap_err();
        assert!(err.to_string().contains(REDIS_SERVICE_NAME_ENV));
    }

    #[test]
    fn test_service_by_name_ignores_non_list_labels() {
        let vcap = json!({"weird": "value", "redis": [{"name": "r"}]});
        assert!(service_by_name(&vcap, "r").is_some());
        assert!(service_by_name(&json!([]), "r").is_none());
    }
}
