use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::{
    Endpoints, DEFAULT_API_BASE, DEFAULT_AUTH_BASE, DEFAULT_MODEL, DEFAULT_SITE_BASE,
};

/// Built-in Shapes application id.
pub const DEFAULT_APP_ID: &str = "f6263f80-2242-428d-acd4-10e1feec44ee";

/// Environment variable overriding the application id.
pub const APP_ID_ENV: &str = "SHAPESINC_APP_ID";

/// Environment variable overriding the chat API base URL.
pub const API_BASE_ENV: &str = "SHAPES_API_BASE";

/// Environment variable overriding the auth API base URL.
pub const AUTH_BASE_ENV: &str = "SHAPES_AUTH_BASE";

/// Environment variable overriding the authorize site base URL.
pub const SITE_BASE_ENV: &str = "SHAPES_SITE_BASE";

/// Shapes application and endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShapesConfig {
    /// Application id sent with every request
    pub app_id: String,
    /// Site hosting the authorize page
    pub site_base: String,
    /// Auth API base URL
    pub auth_base: String,
    /// Chat API base URL
    pub api_base: String,
    /// Chat model name
    pub model: String,
    /// Address Shapes redirects back to after authorization
    pub redirect_uri: String,
}

impl Default for ShapesConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            site_base: DEFAULT_SITE_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            redirect_uri: "http://localhost:8080/".to_string(),
        }
    }
}

impl ShapesConfig {
    /// Endpoint set for the client.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            site_base: self.site_base.clone(),
            auth_base: self.auth_base.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

/// Token storage locations. Unset paths use the platform data directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable key-value file
    pub durable_path: Option<PathBuf>,
    /// Cookie jar file
    pub cookie_path: Option<PathBuf>,
}

/// Behavior configuration for the UI.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Idle polling interval in milliseconds
    pub idle_poll_ms: u64,
    /// How long a notice stays on screen, in milliseconds
    pub notice_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: 100,
            notice_ms: 4000,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub shapes: ShapesConfig,
    pub storage: StorageConfig,
    pub behavior: BehaviorConfig,
}

impl Config {
    /// Returns the default config file path: ~/.config/shapes-auth/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shapes-auth").join("config.toml"))
    }

    /// Load configuration from the default path, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::default_path()
            .and_then(|path| Self::load_from_path(&path).ok())
            .unwrap_or_default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay values from the environment. Empty values are ignored.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(app_id) = get(APP_ID_ENV) {
            tracing::debug!("app id overridden from environment");
            self.shapes.app_id = app_id;
        }
        if let Some(api_base) = get(API_BASE_ENV) {
            self.shapes.api_base = api_base;
        }
        if let Some(auth_base) = get(AUTH_BASE_ENV) {
            self.shapes.auth_base = auth_base;
        }
        if let Some(site_base) = get(SITE_BASE_ENV) {
            self.shapes.site_base = site_base;
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
