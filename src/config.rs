use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::errors::ApiError;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub document: DocumentSettings,
    pub llm: LlmSettings,
    pub tools: ToolSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Plain-text document, pages separated by form-feed characters.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub completion_base_url: String,
    pub completion_model: String,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub exchange_enabled: bool,
    pub exchange_base_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            port: 5000,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        DocumentSettings {
            path: PathBuf::from("document.txt"),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            completion_base_url: "http://127.0.0.1:11434".to_string(),
            completion_model: "mistral-openorca".to_string(),
            embedding_base_url: "http://127.0.0.1:8080".to_string(),
            embedding_model: "paraphrase-minilm".to_string(),
            max_attempts: 3,
            retry_delay_ms: 0,
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        ToolSettings {
            exchange_enabled: true,
            exchange_base_url: "https://open.er-api.com".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the config file named by `SAGE_CONFIG` (falling
    /// back to `config.yml` in the working directory), then applies
    /// environment overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self, ApiError> {
        let path = env::var("SAGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut settings = Self::load_from(&path)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self, ApiError> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path).map_err(ApiError::internal)?;
        serde_yaml::from_str(&raw).map_err(|err| {
            ApiError::BadRequest(format!("invalid config {}: {}", path.display(), err))
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(port) = env::var("PORT").ok().and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(path) = env::var("SAGE_DOCUMENT") {
            self.document.path = PathBuf::from(path);
        }
        if let Ok(url) = env::var("SAGE_COMPLETION_URL") {
            self.llm.completion_base_url = url;
        }
        if let Ok(url) = env::var("SAGE_EMBEDDING_URL") {
            self.llm.embedding_base_url = url;
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.llm.retry_delay_ms)
    }
}
