use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use url::Url;

const APP_JSON: &str = "app.json";
const API_JSON: &str = "api.json";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_API_BASE_URL: &str = "https://api.hostdesk.example/";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub schema: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub api: serde_json::Value,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "HostDesk",
                "timezone": DEFAULT_TIMEZONE
            }),
        ),
        (
            API_JSON,
            serde_json::json!({
                "schema": 1,
                "baseUrl": DEFAULT_API_BASE_URL,
                "requestTimeoutSeconds": DEFAULT_REQUEST_TIMEOUT_SECONDS
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        api: read_config(&config_dir.join(API_JSON))?,
    })
}

/// Display timezone for the console; must name a real IANA zone.
pub fn read_timezone(config_dir: &Path) -> Result<chrono_tz::Tz, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let name = app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE);
    name.parse::<chrono_tz::Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone '{name}' in app.json")))
}

pub fn read_app_name(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let name = app
        .get("appName")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("HostDesk");
    Ok(name.to_string())
}

pub fn read_api_base_url(config_dir: &Path) -> Result<Url, InfraError> {
    let api = read_config(&config_dir.join(API_JSON))?;
    let raw = api
        .get("baseUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL);
    Url::parse(raw)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid api baseUrl '{raw}': {error}")))
}

pub fn read_request_timeout_seconds(config_dir: &Path) -> Result<u64, InfraError> {
    let api = read_config(&config_dir.join(API_JSON))?;
    let timeout = api
        .get("requestTimeoutSeconds")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS);
    if timeout == 0 {
        return Err(InfraError::InvalidConfig(
            "requestTimeoutSeconds must be > 0".to_string(),
        ));
    }
    Ok(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_DIR_SEQUENCE: AtomicU64 = AtomicU64::new(0);

    fn scratch_config_dir(label: &str) -> PathBuf {
        let sequence = TEST_DIR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "hostdesk-config-{label}-{}-{sequence}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create scratch config dir");
        dir
    }

    #[test]
    fn defaults_are_seeded_once_and_parse_back() {
        let dir = scratch_config_dir("defaults");
        ensure_default_configs(&dir).expect("seed defaults");

        let bundle = load_configs(&dir).expect("load configs");
        assert_eq!(bundle.app.get("schema").and_then(|v| v.as_u64()), Some(1));
        assert_eq!(read_app_name(&dir).expect("app name"), "HostDesk");
        assert_eq!(read_timezone(&dir).expect("timezone"), chrono_tz::UTC);
        assert_eq!(
            read_request_timeout_seconds(&dir).expect("timeout"),
            DEFAULT_REQUEST_TIMEOUT_SECONDS
        );
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = scratch_config_dir("bad-tz");
        fs::write(
            dir.join(APP_JSON),
            r#"{"schema": 1, "appName": "HostDesk", "timezone": "Mars/Olympus"}"#,
        )
        .expect("write app.json");

        assert!(read_timezone(&dir).is_err());
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = scratch_config_dir("bad-schema");
        fs::write(dir.join(API_JSON), r#"{"schema": 2, "baseUrl": "https://x/"}"#)
            .expect("write api.json");

        assert!(read_api_base_url(&dir).is_err());
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let dir = scratch_config_dir("bad-url");
        fs::write(
            dir.join(API_JSON),
            r#"{"schema": 1, "baseUrl": "not a url"}"#,
        )
        .expect("write api.json");

        assert!(read_api_base_url(&dir).is_err());
    }
}
