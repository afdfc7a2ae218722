//! Configuration file parser for `<config dir>/config.toml`.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`. The `show_*` keys are only
/// defaults: toggles made from the menu are persisted separately and win.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name the servers report in their page title. A host titled
    /// exactly this gets its URL appended so several of them stay distinct.
    pub product_name: String,

    /// Server used when the add-server form is submitted empty. It keeps the
    /// bare product name as its title.
    pub default_instance: String,

    /// Domain appended to bare workspace names typed in the add-server form
    /// (`acme` → `https://acme.<default_domain>`).
    pub default_domain: String,

    /// Custom URI scheme handled for deep links (`<scheme>://host/path`).
    pub url_scheme: String,

    /// Timeout for the `/api/info` reachability probe on confirmed deep links.
    pub validation_timeout_ms: u64,

    /// Timeout for each probe while resolving typed add-server input.
    pub input_validation_timeout_ms: u64,

    /// Local page shown in place of a server that failed to load.
    pub fallback_page: String,

    /// Tray icon visibility. Unset means "visible except on Linux".
    pub show_tray_icon: Option<bool>,

    pub show_user_status_in_tray: bool,

    /// Pop the window up (without focusing) when a server reports new messages.
    pub show_window_on_unread_changed: bool,

    pub show_menu_bar: bool,

    pub show_server_list: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            product_name: "Rocket.Chat".to_string(),
            default_instance: "https://open.rocket.chat".to_string(),
            default_domain: "rocket.chat".to_string(),
            url_scheme: "rocketchat".to_string(),
            validation_timeout_ms: 5000,
            input_validation_timeout_ms: 2000,
            fallback_page: "chatdeck://loading-error".to_string(),
            show_tray_icon: None,
            show_user_status_in_tray: true,
            show_window_on_unread_changed: false,
            show_menu_bar: true,
            show_server_list: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 12] = [
        "product_name",
        "default_instance",
        "default_domain",
        "url_scheme",
        "validation_timeout_ms",
        "input_validation_timeout_ms",
        "fallback_page",
        "show_tray_icon",
        "show_user_status_in_tray",
        "show_window_on_unread_changed",
        "show_menu_bar",
        "show_server_list",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
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
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            default_instance = %config.default_instance,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    pub fn input_validation_timeout(&self) -> Duration {
        Duration::from_millis(self.input_validation_timeout_ms)
    }

    /// Effective tray default for this platform.
    pub fn show_tray_icon_default(&self) -> bool {
        self.show_tray_icon
            .unwrap_or(std::env::consts::OS != "linux")
    }
}

// ============================================================================
// Tests
// ============================================================================
