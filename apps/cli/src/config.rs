use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use client_core::{AuthScheme, SessionConfig};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "cloudlinker.toml";
const DATA_DIR_NAME: &str = "cloudlinker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub auth_scheme: AuthScheme,
    pub default_db: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            auth_scheme: AuthScheme::ApiKeyHeader,
            default_db: None,
            request_timeout_secs: None,
            data_dir: None,
            log_filter: "warn".into(),
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            api_base_url: self.api_base_url.clone(),
            auth_scheme: self.auth_scheme,
            default_db: self.default_db.clone(),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Defaults, then the config file, then environment variables.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if required => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

pub fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let table: toml::Table = toml::from_str(raw)?;
    let value = |key: &str| -> Option<String> {
        match table.get(key)? {
            toml::Value::String(text) => Some(text.clone()),
            toml::Value::Integer(number) => Some(number.to_string()),
            other => {
                warn!(key, "ignoring non-scalar config value: {other}");
                None
            }
        }
    };

    if let Some(v) = value("api_base_url") {
        settings.api_base_url = v;
    }
    if let Some(v) = value("auth_scheme") {
        settings.auth_scheme =
            AuthScheme::parse(&v).ok_or_else(|| anyhow!("unknown auth_scheme '{v}'"))?;
    }
    if let Some(v) = value("db") {
        settings.default_db = non_empty(v);
    }
    if let Some(v) = value("request_timeout_secs") {
        settings.request_timeout_secs = Some(
            v.parse()
                .with_context(|| format!("request_timeout_secs must be a number, got '{v}'"))?,
        );
    }
    if let Some(v) = value("data_dir") {
        settings.data_dir = Some(PathBuf::from(v));
    }
    if let Some(v) = value("log") {
        settings.log_filter = v;
    }
    Ok(())
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__AUTH_SCHEME") {
        match AuthScheme::parse(&v) {
            Some(scheme) => settings.auth_scheme = scheme,
            None => warn!("ignoring unknown APP__AUTH_SCHEME '{v}'"),
        }
    }

    if let Some(v) = lookup("APP__DB") {
        settings.default_db = non_empty(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(_) => warn!("ignoring non-numeric APP__REQUEST_TIMEOUT_SECS '{v}'"),
        }
    }

    if let Some(v) = lookup("APP__DATA_DIR") {
        settings.data_dir = Some(PathBuf::from(v));
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Directory holding the stored API key.
pub fn resolve_data_dir(settings: &Settings) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &settings.data_dir {
        return Ok(dir.clone());
    }
    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join(DATA_DIR_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(format!(".{DATA_DIR_NAME}")))
        .ok_or_else(|| anyhow!("could not resolve a per-user data directory; pass --data-dir"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
