//! Configuration management
//!
//! Settings live in settings.json inside the data directory:
//! ```json
//! {
//!   "backendUrl": "https://project.example.co",
//!   "apiKey": "public-anon-key",
//!   "authApiUrl": "http://localhost:5000",
//!   "demoMode": false,
//!   "extraCategories": ["Pets"]
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::auth_api::DEFAULT_AUTH_API_URL;

pub const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_api_url: Option<String>,
    #[serde(default)]
    demo_mode: bool,
    #[serde(default)]
    extra_categories: Vec<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Wealthtrack configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub auth_api_url: String,
    pub demo_mode: bool,
    pub extra_categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_key: None,
            auth_api_url: DEFAULT_AUTH_API_URL.to_string(),
            demo_mode: false,
            extra_categories: Vec::new(),
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load config from the data directory, then apply environment
    /// overrides:
    /// - WEALTHTRACK_BACKEND_URL
    /// - WEALTHTRACK_API_KEY
    /// - WEALTHTRACK_AUTH_API_URL
    /// - WEALTHTRACK_DEMO_MODE (for CI/testing)
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;

        if let Some(url) = env_non_empty("WEALTHTRACK_BACKEND_URL") {
            config.backend_url = Some(url);
        }
        if let Some(key) = env_non_empty("WEALTHTRACK_API_KEY") {
            config.api_key = Some(key);
        }
        if let Some(url) = env_non_empty("WEALTHTRACK_AUTH_API_URL") {
            config.auth_api_url = url;
        }
        match std::env::var("WEALTHTRACK_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => config.demo_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => config.demo_mode = false,
            _ => {}
        }

        Ok(config)
    }

    /// Load settings.json only, without environment overrides
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;

        Ok(Self {
            backend_url: raw.backend_url,
            api_key: raw.api_key,
            auth_api_url: raw
                .auth_api_url
                .unwrap_or_else(|| DEFAULT_AUTH_API_URL.to_string()),
            demo_mode: raw.demo_mode,
            extra_categories: raw.extra_categories,
        })
    }

    /// Save config to the data directory, preserving keys we don't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = read_settings(&settings_path)?;
        settings.backend_url = self.backend_url.clone();
        settings.api_key = self.api_key.clone();
        settings.auth_api_url = if self.auth_api_url == DEFAULT_AUTH_API_URL {
            None
        } else {
            Some(self.auth_api_url.clone())
        };
        settings.demo_mode = self.demo_mode;
        settings.extra_categories = self.extra_categories.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Backend URL and key, when both are configured
    pub fn backend(&self) -> Option<(&str, &str)> {
        match (self.backend_url.as_deref(), self.api_key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
