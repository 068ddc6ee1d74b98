use std::{env, fs, time::Duration};

use anyhow::Context;
use client_core::{api::DEFAULT_BASE_URL, ContextOptions};
use serde::Deserialize;

const CONFIG_FILE: &str = "guestbook.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub cache_database_url: String,
    pub auth_token: Option<String>,
    pub log_filter: String,
    pub request_timeout_secs: u64,
    /// How long the list view waits for another page before giving up.
    pub idle_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            cache_database_url: "sqlite://./data/guestbook-cache.db".into(),
            auth_token: None,
            log_filter: "info".into(),
            request_timeout_secs: 30,
            idle_timeout_ms: 1_500,
        }
    }
}

impl Settings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            base_url: self.base_url.clone(),
            cache_database_url: prepare_cache_database_url(&self.cache_database_url),
            auth_token: self.auth_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    base_url: Option<String>,
    cache_database_url: Option<String>,
    auth_token: Option<String>,
    log_filter: Option<String>,
    request_timeout_secs: Option<u64>,
    idle_timeout_ms: Option<u64>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse '{CONFIG_FILE}'"))?;
    }
    apply_env(&mut settings, |key| env::var(key).ok());

    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file.base_url {
        settings.base_url = v;
    }
    if let Some(v) = file.cache_database_url {
        settings.cache_database_url = v;
    }
    if let Some(v) = file.auth_token {
        settings.auth_token = Some(v);
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file.idle_timeout_ms {
        settings.idle_timeout_ms = v;
    }
    Ok(())
}

/// `GUESTBOOK_*` first, then `APP__*` which wins when both are set.
fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    let lookup = |name: &str| {
        var(&format!("APP__{name}")).or_else(|| var(&format!("GUESTBOOK_{name}")))
    };

    if let Some(v) = lookup("BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = lookup("CACHE_DATABASE_URL") {
        settings.cache_database_url = v;
    }
    if let Some(v) = lookup("AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = lookup("LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = lookup("IDLE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        settings.idle_timeout_ms = v;
    }
}

/// Turns a configured cache location into a sqlite url. An empty value
/// disables the disk cache.
pub fn prepare_cache_database_url(raw: &str) -> Option<String> {
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("sqlite::memory:") {
        return Some(raw.to_string());
    }
    if let Some(path) = raw.strip_prefix("sqlite://") {
        return Some(sqlite_url(path));
    }
    if raw.contains("://") {
        return Some(raw.to_string());
    }
    if let Some(path) = raw.strip_prefix("sqlite:") {
        return Some(sqlite_url(path));
    }

    Some(sqlite_url(raw))
}

fn sqlite_url(path: &str) -> String {
    let path = path.replace('\\', "/");
    if has_drive_letter(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
