use std::{collections::HashMap, fs, path::Path, path::PathBuf};

use anyhow::{bail, Context};
use client_core::DEFAULT_API_URL;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "trainer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub export_path: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            export_path: PathBuf::from("customers.csv"),
            log_filter: "warn".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Defaults, then `path` if it exists, then environment variables.
pub fn load_settings_from(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!("ignoring unreadable config file");
        return;
    };
    if let Some(v) = file_cfg.get("api_url") {
        settings.api_url = v.clone();
    }
    if let Some(v) = file_cfg.get("export_path") {
        settings.export_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("log") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TRAINER_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("TRAINER_EXPORT_PATH") {
        settings.export_path = PathBuf::from(v);
    }

    if let Some(v) = lookup("TRAINER_LOG") {
        settings.log_filter = v;
    }
}

/// Trims the URL, drops trailing slashes and insists on http(s).
pub fn normalize_api_url(raw_api_url: &str) -> anyhow::Result<String> {
    let raw_api_url = raw_api_url.trim();

    if raw_api_url.is_empty() {
        return Ok(Settings::default().api_url);
    }

    let parsed = Url::parse(raw_api_url)
        .with_context(|| format!("invalid api url '{raw_api_url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("api url '{raw_api_url}' must use http or https");
    }

    Ok(raw_api_url.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
