//! Configuration file parser for ~/.config/quire/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as warnings, since they are most
//! likely typos. Blog identity can also come from the environment
//! (`QUIRE_APP_ID`, `QUIRE_OWNER_UID`, `QUIRE_VIEWER_UID`), which wins over
//! the file.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::feed::{
    ComposerSettings, FacetRules, FeedError, DEFAULT_EXCERPT_LENGTH, DEFAULT_PRIORITY_CATEGORY,
    DEFAULT_TOP_FACET_LIMIT, PAGE_SIZE,
};
use crate::store::MAX_PAGE_SIZE;

pub const ENV_APP_ID: &str = "QUIRE_APP_ID";
pub const ENV_OWNER_UID: &str = "QUIRE_OWNER_UID";
pub const ENV_VIEWER_UID: &str = "QUIRE_VIEWER_UID";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application id, the first segment of every collection path.
    pub app_id: Option<String>,

    /// Identity of the blog owner whose posts are shown.
    pub owner_uid: Option<String>,

    /// Identity of the person browsing. Equal to `owner_uid` for the admin.
    pub viewer_uid: Option<String>,

    /// Posts per page.
    pub page_size: usize,

    /// Number of tag tabs.
    pub top_facet_limit: usize,

    /// Category whose tags are preferred for the tab bar.
    pub priority_category: String,

    /// Body excerpt length in characters.
    pub excerpt_length: usize,

    /// Author name stamped on posts created from the command line.
    pub author_name: Option<String>,

    /// Theme variant name ("dark" or "light").
    pub theme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: None,
            owner_uid: None,
            viewer_uid: None,
            page_size: PAGE_SIZE,
            top_facet_limit: DEFAULT_TOP_FACET_LIMIT,
            priority_category: DEFAULT_PRIORITY_CATEGORY.to_string(),
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            author_name: None,
            theme: "dark".to_string(),
        }
    }
}

/// Blog identity resolved from config and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogIdentity {
    pub app_id: String,
    pub owner_uid: String,
    /// `None` for an anonymous reader
    pub viewer_uid: Option<String>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "app_id",
        "owner_uid",
        "viewer_uid",
        "page_size",
        "top_facet_limit",
        "priority_category",
        "excerpt_length",
        "author_name",
        "theme",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - `page_size` of zero or above the store's page cap → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            app_id = ?config.app_id,
            page_size = config.page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        if config.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if config.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "page_size must be at most {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(config)
    }

    /// Overlay identity values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay identity values from `lookup`. Blank values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_APP_ID) {
            self.app_id = Some(v);
        }
        if let Some(v) = get(ENV_OWNER_UID) {
            self.owner_uid = Some(v);
        }
        if let Some(v) = get(ENV_VIEWER_UID) {
            self.viewer_uid = Some(v);
        }
    }

    /// Resolve the blog identity.
    ///
    /// Missing app id or owner uid is a fatal configuration error.
    pub fn identity(&self) -> Result<BlogIdentity, FeedError> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        let app_id = present(&self.app_id).ok_or_else(|| {
            FeedError::Configuration(format!("app id is not set (config or {})", ENV_APP_ID))
        })?;
        let owner_uid = present(&self.owner_uid).ok_or_else(|| {
            FeedError::Configuration(format!("blog owner is not set (config or {})", ENV_OWNER_UID))
        })?;

        Ok(BlogIdentity {
            app_id,
            owner_uid,
            viewer_uid: present(&self.viewer_uid),
        })
    }

    pub fn composer_settings(&self) -> ComposerSettings {
        ComposerSettings {
            page_size: self.page_size,
            excerpt_length: self.excerpt_length,
            facet_rules: FacetRules {
                priority_category: self.priority_category.clone(),
                limit: self.top_facet_limit,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
