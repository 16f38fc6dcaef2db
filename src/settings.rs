use serde_json::{json, Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const SETTINGS_ENV_VAR: &str = "SHOPFRONT_SETTINGS";

pub const KEY_BASE_URL: &str = "baseUrl";
pub const KEY_REFRESH_PATH: &str = "refreshTokenPath";
pub const KEY_AUTH_SCHEME: &str = "authScheme";
pub const KEY_REQUEST_TIMEOUT_SECONDS: &str = "requestTimeoutSeconds";
pub const KEY_PAGE_SIZE: &str = "pageSize";
pub const KEY_KEEP_UNUSED_SECONDS: &str = "keepUnusedDataForSeconds";
pub const KEY_JANITOR_INTERVAL_SECONDS: &str = "cacheJanitorIntervalSeconds";
pub const KEY_NOTIFICATION_CAPACITY: &str = "notificationCapacity";

pub const DEFAULT_BASE_URL: &str = "https://e-commerce-backend-zeta-five.vercel.app/api/v1";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";

fn defaults() -> Map<String, JsonValue> {
  let mut map = Map::new();
  map.insert(KEY_BASE_URL.to_string(), json!(DEFAULT_BASE_URL));
  map.insert(KEY_REFRESH_PATH.to_string(), json!(DEFAULT_REFRESH_PATH));
  map.insert(KEY_AUTH_SCHEME.to_string(), json!(""));
  map.insert(KEY_REQUEST_TIMEOUT_SECONDS.to_string(), json!(30));
  map.insert(KEY_PAGE_SIZE.to_string(), json!(9));
  map.insert(KEY_KEEP_UNUSED_SECONDS.to_string(), json!(60));
  map.insert(KEY_JANITOR_INTERVAL_SECONDS.to_string(), json!(15));
  map.insert(KEY_NOTIFICATION_CAPACITY.to_string(), json!(32));
  map
}

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to read settings file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("settings file {path} is not valid json: {source}")]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("settings file {0} must contain a json object")]
  NotAnObject(PathBuf),
  #[error("invalid setting {key}: {reason}")]
  Invalid { key: &'static str, reason: String },
}

/// Key/value settings backed by an optional JSON file, layered over
/// built-in defaults.
#[derive(Clone)]
pub struct SettingsStore {
  path: Option<PathBuf>,
  values: Arc<Mutex<Map<String, JsonValue>>>,
}

impl Default for SettingsStore {
  fn default() -> Self {
    Self::in_memory()
  }
}

impl SettingsStore {
  pub fn in_memory() -> Self {
    Self {
      path: None,
      values: Arc::new(Mutex::new(defaults())),
    }
  }

  /// Loads `path` over the defaults. A missing file yields the defaults and
  /// is created on the first [`save`](Self::save).
  pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
    let path = path.as_ref().to_path_buf();
    let mut values = defaults();

    match std::fs::read_to_string(&path) {
      Ok(contents) if contents.trim().is_empty() => {
        debug!(path = %path.display(), "settings file is empty; using defaults");
      }
      Ok(contents) => {
        let parsed: JsonValue = serde_json::from_str(&contents).map_err(|source| SettingsError::Json {
          path: path.clone(),
          source,
        })?;
        let JsonValue::Object(overrides) = parsed else {
          return Err(SettingsError::NotAnObject(path));
        };
        for (k, v) in overrides {
          values.insert(k, v);
        }
        info!(path = %path.display(), "settings loaded");
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "settings file not found; using defaults");
      }
      Err(source) => return Err(SettingsError::Io { path, source }),
    }

    Ok(Self {
      path: Some(path),
      values: Arc::new(Mutex::new(values)),
    })
  }

  /// `--settings` wins, then `SHOPFRONT_SETTINGS`, then defaults only.
  pub fn from_env_or(path: Option<&Path>) -> Result<Self, SettingsError> {
    if let Some(path) = path {
      return Self::load(path);
    }
    match std::env::var_os(SETTINGS_ENV_VAR) {
      Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
      _ => Ok(Self::in_memory()),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Map<String, JsonValue>> {
    self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn get_json(&self, key: &str) -> Option<JsonValue> {
    self.lock().get(key).cloned()
  }

  pub fn get_u64(&self, key: &str, fallback: u64) -> u64 {
    self
      .get_json(key)
      .and_then(|v| v.as_u64())
      .unwrap_or(fallback)
  }

  pub fn get_string(&self, key: &str) -> Option<String> {
    let v = self.get_json(key)?;
    let s = v.as_str()?.trim();
    if s.is_empty() {
      None
    } else {
      Some(s.to_string())
    }
  }

  pub fn set(&self, key: &str, value: impl Into<JsonValue>) {
    self.lock().insert(key.to_string(), value.into());
  }

  pub fn save(&self) -> Result<(), SettingsError> {
    let Some(path) = &self.path else {
      return Ok(());
    };
    let body = {
      let values = self.lock();
      serde_json::to_string_pretty(&*values).map_err(|source| SettingsError::Json {
        path: path.clone(),
        source,
      })?
    };
    std::fs::write(path, body).map_err(|source| SettingsError::Io {
      path: path.clone(),
      source,
    })
  }
}

/// Typed view of the settings the client runtime needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
  pub base_url: String,
  pub refresh_path: String,
  pub auth_scheme: Option<String>,
  pub request_timeout: Duration,
  pub page_size: usize,
  pub keep_unused_for: Duration,
  pub janitor_interval: Duration,
  pub notification_capacity: usize,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      refresh_path: DEFAULT_REFRESH_PATH.to_string(),
      auth_scheme: None,
      request_timeout: Duration::from_secs(30),
      page_size: 9,
      keep_unused_for: Duration::from_secs(60),
      janitor_interval: Duration::from_secs(15),
      notification_capacity: 32,
    }
  }
}

impl ClientConfig {
  pub fn from_settings(settings: &SettingsStore) -> Result<Self, SettingsError> {
    let base_url = settings
      .get_string(KEY_BASE_URL)
      .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
      return Err(SettingsError::Invalid {
        key: KEY_BASE_URL,
        reason: format!("expected an http(s) url, got {base_url:?}"),
      });
    }

    let refresh_path = settings
      .get_string(KEY_REFRESH_PATH)
      .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
    if !refresh_path.starts_with('/') {
      return Err(SettingsError::Invalid {
        key: KEY_REFRESH_PATH,
        reason: "must start with '/'".to_string(),
      });
    }

    let page_size = settings.get_u64(KEY_PAGE_SIZE, 9);
    if page_size == 0 {
      return Err(SettingsError::Invalid {
        key: KEY_PAGE_SIZE,
        reason: "must be greater than 0".to_string(),
      });
    }

    Ok(Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      refresh_path,
      auth_scheme: settings.get_string(KEY_AUTH_SCHEME),
      request_timeout: Duration::from_secs(settings.get_u64(KEY_REQUEST_TIMEOUT_SECONDS, 30).max(1)),
      page_size: page_size as usize,
      keep_unused_for: Duration::from_secs(settings.get_u64(KEY_KEEP_UNUSED_SECONDS, 60)),
      janitor_interval: Duration::from_secs(settings.get_u64(KEY_JANITOR_INTERVAL_SECONDS, 15).max(1)),
      notification_capacity: settings.get_u64(KEY_NOTIFICATION_CAPACITY, 32).max(1) as usize,
    })
  }
}
