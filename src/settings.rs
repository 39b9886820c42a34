use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PennyError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const API_URL_ENV: &str = "PENNY_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default)]
    pub default_tax_rate: f64,
    #[serde(default = "default_due_in_days")]
    pub due_in_days: i64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_currency() -> String {
    "IDR".to_string()
}

fn default_download_dir() -> String {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .to_string_lossy()
        .to_string()
}

fn default_due_in_days() -> i64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            currency: default_currency(),
            download_dir: default_download_dir(),
            default_tax_rate: 0.0,
            due_in_days: default_due_in_days(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("penny")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PennyError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

/// Resolve the API base URL: explicit flag, then environment, then settings.
/// Trailing slashes are dropped so paths can be appended directly.
pub fn resolve_api_url(flag: Option<&str>, env: Option<String>, settings: &Settings) -> String {
    let raw = flag
        .map(str::to_string)
        .or(env.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| settings.api_url.clone());
    raw.trim().trim_end_matches('/').to_string()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            api_url: "https://api.example.test".to_string(),
            currency: "USD".to_string(),
            download_dir: "/tmp/invoices".to_string(),
            default_tax_rate: 11.0,
            due_in_days: 14,
        };
        save_settings_to(&path, &settings).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.api_url, "https://api.example.test");
        assert_eq!(loaded.currency, "USD");
        assert_eq!(loaded.default_tax_rate, 11.0);
        assert_eq!(loaded.due_in_days, 14);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s.api_url, DEFAULT_API_URL);
        assert_eq!(s.currency, "IDR");
        assert_eq!(s.due_in_days, 30);
        assert!(!s.download_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"api_url": "http://invoices.local"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.api_url, "http://invoices.local");
        assert_eq!(s.currency, "IDR");
        assert_eq!(s.default_tax_rate, 0.0);
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&path, &Settings::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_api_url_precedence() {
        let s = Settings {
            api_url: "http://from-settings/".into(),
            ..Settings::default()
        };
        assert_eq!(
            resolve_api_url(Some("http://flag/"), Some("http://env".into()), &s),
            "http://flag"
        );
        assert_eq!(resolve_api_url(None, Some("http://env".into()), &s), "http://env");
        assert_eq!(resolve_api_url(None, Some("  ".into()), &s), "http://from-settings");
        assert_eq!(resolve_api_url(None, None, &s), "http://from-settings");
    }
}
