use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_WELCOME_BODY: &str = "I provide factual information about tobacco laws, regulations, and legal requirements from our document database. Ask me about tobacco legislation, compliance requirements, or market regulations.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub welcome: WelcomeConfig,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Unset means requests may wait forever.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 900,
            height: 700,
            min_width: 480,
            min_height: 360,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WelcomeConfig {
    pub title: String,
    pub body: String,
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        WelcomeConfig {
            title: "Welcome to MAF Policy Bot".to_string(),
            body: DEFAULT_WELCOME_BODY.to_string(),
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match Self::from_path(config_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("{:#}. Using defaults.", e),
            }
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        }

        Config::default()
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Error reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Error parsing {}", path.display()))
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/policy-chat/config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            base_url = "https://policy.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.base_url, "https://policy.example.com");
        assert_eq!(config.server.request_timeout_secs, None);
        assert_eq!(config.window.width, 900);
        assert_eq!(config.welcome.title, "Welcome to MAF Policy Bot");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.window.min_height, 360);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nrequest_timeout_secs = 30\n\n[welcome]\ntitle = \"Hello\""
        )
        .unwrap();

        let config = Config::from_path(file.path()).unwrap();
        assert_eq!(config.server.request_timeout_secs, Some(30));
        assert_eq!(config.welcome.title, "Hello");
        assert_eq!(config.welcome.body, DEFAULT_WELCOME_BODY);
    }

    #[test]
    fn test_load_missing_file_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("policy-chat").join("config.toml");

        let config = Config::load_from(&config_path);
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert!(!dir.path().join("policy-chat").exists());
    }

    #[test]
    fn test_load_malformed_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[window]\nwidth = \"wide\"").unwrap();

        let config = Config::load_from(file.path());
        assert_eq!(config.window.width, 900);
    }

    #[test]
    fn test_from_path_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbase_url = ").unwrap();

        let err = Config::from_path(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Error parsing"));
    }
}
