//! Configuration for the offline engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::Namespaces;
use crate::error::{ConfigError, Result};

/// Engine configuration.
///
/// Loaded from YAML; every field has a default so an empty file (or no file
/// at all) yields a working engine for the stock CarTrace deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Product tag used as the cache namespace prefix
    #[serde(default = "default_product")]
    pub product: String,

    /// Version tag; bumping it retires the previous cache generation
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin used to resolve relative manifest and queue URLs
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix identifying API requests
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// Static asset manifest precached on install
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Placeholder page served to offline navigations
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Route opened when a notification click carries no target URL
    #[serde(default = "default_default_route")]
    pub default_route: String,

    /// Directory holding the cache and queue databases.
    /// Defaults to the platform cache dir when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_product() -> String {
    "cartrace".to_string()
}

fn default_version() -> String {
    "v1.0.0".to_string()
}

fn default_origin() -> String {
    "https://cartrace.app".to_string()
}

fn default_api_root() -> String {
    "/api".to_string()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/offline.html",
        "/app.js",
        "/styles.css",
        "/icons/icon-192.png",
        "/icons/icon-512.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_offline_page() -> String {
    "/offline.html".to_string()
}

fn default_default_route() -> String {
    "/dashboard".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product: default_product(),
            version: default_version(),
            origin: default_origin(),
            api_root: default_api_root(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            default_route: default_default_route(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".cartrace").join("offline.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Save(e.to_string()))?;

        std::fs::write(&path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// The cache namespace pair for this product/version
    pub fn namespaces(&self) -> Namespaces {
        Namespaces::new(&self.product, &self.version)
    }

    /// Resolve a manifest or queue URL against the configured origin.
    ///
    /// Absolute URLs pass through untouched.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.origin.trim_end_matches('/'), url)
        } else {
            url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.product, "cartrace");
        assert_eq!(config.version, "v1.0.0");
        assert_eq!(config.api_root, "/api");
        assert!(config.precache.contains(&"/offline.html".to_string()));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_namespaces_derived_from_product_and_version() {
        let config = Config::default();
        let ns = config.namespaces();
        assert_eq!(ns.statics(), "cartrace-v1.0.0");
        assert_eq!(ns.api(), "cartrace-api-v1.0.0");
    }

    #[test]
    fn test_resolve_relative_url() {
        let config = Config::default();
        assert_eq!(config.resolve("/app.js"), "https://cartrace.app/app.js");
    }

    #[test]
    fn test_resolve_absolute_url_passthrough() {
        let config = Config::default();
        assert_eq!(
            config.resolve("https://cdn.example.com/lib.js"),
            "https://cdn.example.com/lib.js"
        );
    }

    #[test]
    fn test_resolve_trims_origin_slash() {
        let config = Config {
            origin: "https://cartrace.app/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.resolve("/app.js"), "https://cartrace.app/app.js");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("version: v2.1.0\n").unwrap();
        assert_eq!(config.version, "v2.1.0");
        assert_eq!(config.product, "cartrace");
        assert_eq!(config.offline_page, "/offline.html");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("offline.yaml");

        let mut config = Config::default();
        config.version = "v3.0.0".to_string();
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.version, "v3.0.0");
        assert_eq!(loaded.product, "cartrace");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load_from(PathBuf::from("/nonexistent/offline.yaml"));
        assert!(result.is_err());
    }
}
