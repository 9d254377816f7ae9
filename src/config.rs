// marksync/src/config.rs
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::error::DomainResult;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Base URL of the hosted backend, e.g. "https://project.example.co"
    #[serde(default)]
    pub service_url: String,

    /// Public API key; the per-user JWT comes from the session provider
    #[serde(default)]
    pub api_key: String,

    /// Table holding the bookmark rows
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "bookmarks".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            api_key: String::new(),
            table: default_table(),
        }
    }
}

// Load settings from config files and environment variables
#[instrument(level = "debug")]
pub fn load_settings() -> DomainResult<Settings> {
    trace!("Loading settings");

    let mut settings = Settings::default();

    let config_sources = [dirs::home_dir().map(|p| p.join(".config/marksync/config.toml"))];

    for config_path in config_sources.iter().flatten() {
        if config_path.exists() {
            trace!("Loading config from: {:?}", config_path);

            if let Ok(config_text) = std::fs::read_to_string(config_path) {
                if let Ok(file_settings) = toml::from_str::<Settings>(&config_text) {
                    settings = file_settings;
                }
            }
        }
    }

    // Override with environment variables
    if let Ok(service_url) = std::env::var("MARKSYNC_SERVICE_URL") {
        trace!("Using MARKSYNC_SERVICE_URL from environment");
        settings.service_url = service_url;
    }

    if let Ok(api_key) = std::env::var("MARKSYNC_API_KEY") {
        settings.api_key = api_key;
    }

    if let Ok(table) = std::env::var("MARKSYNC_TABLE") {
        settings.table = table;
    }

    trace!("Settings loaded for table: {}", settings.table);
    Ok(settings)
}

pub fn generate_default_config() -> String {
    let default_settings = Settings::default();
    toml::to_string_pretty(&default_settings)
        .unwrap_or_else(|_| "# Error generating default configuration".to_string())
}
