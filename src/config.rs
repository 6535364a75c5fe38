//! Renderer configuration.
//!
//! Parsed with serde, usually from a TOML file. Every section has defaults, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! [server]
//! vhost = "example.org"
//!
//! [fiddle]
//! run_url = "https://run.fiddle.example/"
//! issue_path = "/issue/embed"
//!
//! [links]
//! open_in_new_window = true
//!
//! [autolink]
//! enabled = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Renderer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Embedded fiddle and issue frames.
    pub fiddle: FiddleConfig,
    /// Anchors produced by `[url]`/`[link]`.
    pub links: LinksConfig,
    /// Bare URL detection ahead of the main scan.
    pub autolink: AutolinkConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public virtual host. The `[issue]` tag is only available when this is set.
    pub vhost: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiddleConfig {
    /// Base URL of the host that runs embedded fiddles.
    pub run_url: String,
    /// Path on the virtual host serving embeddable issues.
    pub issue_path: String,
}

impl Default for FiddleConfig {
    fn default() -> Self {
        Self {
            run_url: "https://run.fiddle.example/".to_owned(),
            issue_path: "/issue/embed".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Add `target="_blank"` to rendered anchors.
    pub open_in_new_window: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            open_in_new_window: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutolinkConfig {
    /// Run the autolink preprocessor at all.
    pub enabled: bool,
}

impl Default for AutolinkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl RenderConfig {
    /// Parse a configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed TOML and `ConfigError::Validation` on bad values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, can't be read, or fails to parse or validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(vhost) = &self.server.vhost {
            require_non_empty(vhost, "server.vhost")?;
            if vhost.contains('/') || vhost.chars().any(char::is_whitespace) {
                return Err(ConfigError::Validation("server.vhost must be a bare host name".to_owned()));
            }
        }
        require_http_url(&self.fiddle.run_url, "fiddle.run_url")?;
        if !self.fiddle.issue_path.starts_with('/') {
            return Err(ConfigError::Validation("fiddle.issue_path must start with /".to_owned()));
        }
        Ok(())
    }
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{field} must start with http:// or https://")));
    }
    Ok(())
}
