//! Configuration Loading
//!
//! Reads the optional JSON config file and overlays environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::config_path;

/// Env var naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "TRACE_CONFIG";

/// Configuration service for loading app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: Option<PathBuf>,
    config: AppConfig,
}

impl ConfigService {
    /// Load from `$TRACE_CONFIG`, else ~/.symptom-trace/config.json when it
    /// exists, else defaults. Environment variables are applied last.
    pub fn load() -> AppResult<Self> {
        let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::config(format!(
                        "{} points to a missing file: {}",
                        CONFIG_PATH_VAR,
                        path.display()
                    )));
                }
                Some(path)
            }
            None => config_path().ok().filter(|p| p.exists()),
        };

        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load from an optional file and an env lookup
    pub fn load_with<F>(path: Option<PathBuf>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &path {
            Some(path) => Self::load_from_file(path)?,
            None => AppConfig::default(),
        };

        apply_env_overrides(&mut config, env);
        config.validate().map_err(AppError::validation)?;

        match &path {
            Some(path) => tracing::info!("[Config] loaded {}", path.display()),
            None => tracing::info!("[Config] no config file, using defaults"),
        }

        Ok(Self {
            config_path: path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// The file the configuration came from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Overlay secrets and deployment settings from the environment.
///
/// Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get("ANTHROPIC_API_KEY") {
        config.anthropic_api_key = Some(v);
    }
    if let Some(v) = get("OPENROUTER_API_KEY") {
        config.openrouter_api_key = Some(v);
    }
    if let Some(v) = get("EXA_API_KEY") {
        config.exa_api_key = Some(v);
    }
    if let Some(v) = get("FIRECRAWL_API_KEY") {
        config.firecrawl_api_key = Some(v);
    }
    if let Some(v) = get("OBSIDIAN_API_KEY") {
        config.obsidian_api_key = Some(v);
    }
    if let Some(v) = get("OBSIDIAN_BASE_URL") {
        config.obsidian_base_url = v;
    }
    if let Some(v) = get("TRACE_BIND_ADDR") {
        config.bind_addr = v;
    }
    if let Some(v) = get("TRACE_DATABASE_PATH") {
        config.database_path = Some(PathBuf::from(v));
    }
}
