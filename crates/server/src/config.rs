use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub body_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:7860".into(),
            database_url: "sqlite://./data/annotations.db".into(),
            data_dir: PathBuf::from("data"),
            body_limit_bytes: 64 * 1024,
        }
    }
}

/// `server.toml` (optional), then `APP__*` variables, then the plain
/// variables older deployments set.
pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings: Settings = Config::builder()
        .add_source(File::with_name("server").required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read server settings")?
        .try_deserialize()
        .context("invalid server settings")?;

    apply_legacy_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub(crate) fn apply_legacy_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DATA_DIR") {
        settings.data_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup("PORT") {
        if let Ok(port) = v.parse::<u16>() {
            settings.server_bind = format!("0.0.0.0:{port}");
        }
    }
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
}

/// Turns plain paths into `sqlite://` URLs. `Storage::new` creates the
/// parent directory when it opens the file.
pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
