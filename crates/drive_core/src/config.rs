use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::error::{DriveError, DriveResult};

pub const DEFAULT_SETTINGS_FILE: &str = "drive.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    pub server_url: String,
    pub session_cookie: Option<String>,
    pub error_display_ms: u64,
    pub root_label: String,
    pub transfer_chunk_bytes: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:4000".into(),
            session_cookie: None,
            error_display_ms: 3000,
            root_label: "My Drive".into(),
            transfer_chunk_bytes: 64 * 1024,
        }
    }
}

impl EngineSettings {
    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Validated base URL with any trailing slash trimmed.
    pub fn base_url(&self) -> DriveResult<String> {
        normalize_server_url(&self.server_url)
    }
}

/// Defaults, then `drive.toml` (or `path`), then environment overrides.
pub fn load_settings(path: Option<&Path>) -> EngineSettings {
    let mut settings = EngineSettings::default();

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            apply_file_values(&mut settings, &file_cfg);
        } else {
            tracing::warn!(path = %path.display(), "ignoring unparsable settings file");
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_values(settings: &mut EngineSettings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("session_cookie").and_then(toml::Value::as_str) {
        settings.session_cookie = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("error_display_ms").and_then(toml::Value::as_integer) {
        if v >= 0 {
            settings.error_display_ms = v as u64;
        }
    }
    if let Some(v) = file_cfg.get("root_label").and_then(toml::Value::as_str) {
        settings.root_label = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("transfer_chunk_bytes")
        .and_then(toml::Value::as_integer)
    {
        if v > 0 {
            settings.transfer_chunk_bytes = v as usize;
        }
    }
}

fn apply_env_overrides(settings: &mut EngineSettings, var: impl Fn(&str) -> Option<String>) {
    for key in ["DRIVE_SERVER_URL", "APP__SERVER_URL"] {
        if let Some(v) = var(key) {
            settings.server_url = v;
        }
    }
    for key in ["DRIVE_SESSION_COOKIE", "APP__SESSION_COOKIE"] {
        if let Some(v) = var(key) {
            settings.session_cookie = Some(v);
        }
    }
    for key in ["DRIVE_ERROR_DISPLAY_MS", "APP__ERROR_DISPLAY_MS"] {
        if let Some(parsed) = var(key).and_then(|v| v.parse::<u64>().ok()) {
            settings.error_display_ms = parsed;
        }
    }
}

fn normalize_server_url(raw: &str) -> DriveResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|err| DriveError::Config(format!("invalid server url '{raw}': {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DriveError::Config(format!(
            "unsupported server url scheme '{}'",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
