//! Configuration loading and constants.
//!
//! Loads application configuration from TOML files and defines constants for
//! HTTP cache TTLs, session cookies, reminder scheduling, logging and default
//! paths. `AppConfig` is the root configuration struct containing all settings.

use const_format::formatcp;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// HTTP Response Cache Control
// =============================================================================
// Static assets and the landing page are cacheable. Blueprint routes carry
// per-user data and are sent with no-store.

/// Landing page - static template, no user data
pub const HTTP_CACHE_HOME_MAX_AGE: u32 = 60;
pub const HTTP_CACHE_HOME_SWR: u32 = 30;

/// Static assets (CSS, JS)
pub const HTTP_CACHE_STATIC_MAX_AGE: u32 = 86400;

pub const CACHE_CONTROL_HOME: &str = formatcp!(
    "private, max-age={}, stale-while-revalidate={}",
    HTTP_CACHE_HOME_MAX_AGE,
    HTTP_CACHE_HOME_SWR
);

pub const CACHE_CONTROL_STATIC: &str =
    formatcp!("public, max-age={}, immutable", HTTP_CACHE_STATIC_MAX_AGE);

pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

// =============================================================================
// Sessions
// =============================================================================

/// HKDF info string for deriving the cookie key from the secret key
pub const COOKIE_KEY_INFO: &[u8] = b"medibot-session-cookie";

/// Environment variable consulted when `app.secret_key` is not set
pub const SECRET_KEY_ENV: &str = "MEDIBOT_SECRET_KEY";

// =============================================================================
// Reminder Service
// =============================================================================

/// Format of medication reminder times (HTML `<input type="time">`)
pub const REMINDER_TIME_FORMAT: &str = "%H:%M";

/// Longest check interval that still visits every wall-clock minute
pub const REMINDER_MAX_INTERVAL_SECONDS: u64 = 59;

// =============================================================================
// Relative Time Display
// =============================================================================

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3600;
pub const SECONDS_PER_DAY: i64 = 86400;
pub const SECONDS_PER_MONTH: i64 = 2_592_000;
pub const SECONDS_PER_YEAR: i64 = 31_536_000;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Glob pattern for template files
pub const TEMPLATE_GLOB: &str = "templates/**/*";

/// Directory for static files
pub const STATIC_DIR: &str = "static";

/// Default log filter when debug mode is on and RUST_LOG is not set
pub const DEBUG_LOG_FILTER: &str = "medibot=debug,tower_http=debug";

/// Default log filter when debug mode is off and RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "medibot=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    pub http: HttpServerConfig,
    /// Secret key and debug flag
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chatbot: ChatbotConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub medicine: MedicineConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSettings {
    /// Secret used to derive the session cookie key
    pub secret_key: Option<String>,
    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

impl AppSettings {
    /// Resolve the secret key from config, falling back to the environment.
    pub fn resolve_secret_key(&self) -> Option<String> {
        self.secret_key
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var(SECRET_KEY_ENV).ok().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_backend")]
    pub backend: DatabaseBackend,
    /// MongoDB connection string
    #[serde(default = "DatabaseConfig::default_uri")]
    pub uri: String,
    /// Database name
    #[serde(default = "DatabaseConfig::default_name")]
    pub name: String,
    /// Server selection timeout for the startup connection check
    #[serde(default = "DatabaseConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Self::default_backend(),
            uri: Self::default_uri(),
            name: Self::default_name(),
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}

impl DatabaseConfig {
    fn default_backend() -> DatabaseBackend {
        DatabaseBackend::Mongodb
    }
    fn default_uri() -> String {
        "mongodb://localhost:27017".to_string()
    }
    fn default_name() -> String {
        "medibot".to_string()
    }
    fn default_connect_timeout() -> u64 {
        5
    }
}

/// Cross-origin policy. No origins configured means any origin is allowed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in hours (default: 24)
    #[serde(default = "SessionConfig::default_lifetime_hours")]
    pub lifetime_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_hours: Self::default_lifetime_hours(),
        }
    }
}

impl SessionConfig {
    fn default_lifetime_hours() -> u64 {
        24
    }

    pub fn lifetime(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.lifetime_hours * 3600)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    /// Built-in keyword knowledge base
    Rules,
    /// OpenAI-compatible chat completions endpoint
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatbotConfig {
    #[serde(default = "ChatbotConfig::default_provider")]
    pub provider: ChatProvider,
    /// Base URL of the completions API, e.g. "https://api.openai.com/v1"
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "ChatbotConfig::default_model")]
    pub model: String,
    /// Request timeout for the remote provider
    #[serde(default = "ChatbotConfig::default_timeout")]
    pub timeout_seconds: u64,
    /// Number of chats returned by the history endpoint (default: 50)
    #[serde(default = "ChatbotConfig::default_history_limit")]
    pub history_limit: usize,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            provider: Self::default_provider(),
            api_url: None,
            api_key: None,
            model: Self::default_model(),
            timeout_seconds: Self::default_timeout(),
            history_limit: Self::default_history_limit(),
        }
    }
}

impl ChatbotConfig {
    fn default_provider() -> ChatProvider {
        ChatProvider::Rules
    }
    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_history_limit() -> usize {
        50
    }
}

/// Hospital finder (Google Places Nearby Search)
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesConfig {
    pub api_key: Option<String>,
    #[serde(default = "PlacesConfig::default_base_url")]
    pub base_url: String,
    /// Search radius in metres when the client sends none (default: 5000)
    #[serde(default = "PlacesConfig::default_radius")]
    pub default_radius: u32,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            default_radius: Self::default_radius(),
        }
    }
}

impl PlacesConfig {
    fn default_base_url() -> String {
        "https://maps.googleapis.com/maps/api/place".to_string()
    }
    fn default_radius() -> u32 {
        5000
    }
}

/// Medicine lookup (openFDA drug labels)
#[derive(Debug, Clone, Deserialize)]
pub struct MedicineConfig {
    #[serde(default = "MedicineConfig::default_base_url")]
    pub base_url: String,
    /// TTL for cached lookups in seconds (default: 24 hours)
    #[serde(default = "MedicineConfig::default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached lookups (default: 1000)
    #[serde(default = "MedicineConfig::default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for MedicineConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            cache_ttl_seconds: Self::default_cache_ttl(),
            cache_capacity: Self::default_cache_capacity(),
        }
    }
}

impl MedicineConfig {
    fn default_base_url() -> String {
        "https://api.fda.gov".to_string()
    }
    fn default_cache_ttl() -> u64 {
        86400 // 24 hours
    }
    fn default_cache_capacity() -> u64 {
        1000
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "ReminderConfig::default_enabled")]
    pub enabled: bool,
    /// Seconds between due-medication checks (default: 30)
    #[serde(default = "ReminderConfig::default_interval")]
    pub interval_seconds: u64,
    /// Number of dispatcher tasks delivering reminders (default: 2)
    #[serde(default = "ReminderConfig::default_workers")]
    pub workers: usize,
    /// Capacity of the reminder job queue (default: 100)
    #[serde(default = "ReminderConfig::default_queue_capacity")]
    pub queue_capacity: usize,
    /// SMS delivery; reminders are only logged when absent
    pub twilio: Option<TwilioConfig>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            interval_seconds: Self::default_interval(),
            workers: Self::default_workers(),
            queue_capacity: Self::default_queue_capacity(),
            twilio: None,
        }
    }
}

impl ReminderConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_interval() -> u64 {
        30
    }
    fn default_workers() -> usize {
        2
    }
    fn default_queue_capacity() -> usize {
        100
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    #[serde(default = "TwilioConfig::default_base_url")]
    pub base_url: String,
}

impl TwilioConfig {
    fn default_base_url() -> String {
        "https://api.twilio.com".to_string()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(contents)?;

        config.app.secret_key = config.app.resolve_secret_key();
        if config.app.secret_key.is_none() {
            return Err(ConfigError::Validation(format!(
                "No secret key configured. Set app.secret_key or {}",
                SECRET_KEY_ENV
            )));
        }

        if !(1..=REMINDER_MAX_INTERVAL_SECONDS).contains(&config.reminder.interval_seconds) {
            return Err(ConfigError::Validation(format!(
                "reminder.interval_seconds must be between 1 and {}",
                REMINDER_MAX_INTERVAL_SECONDS
            )));
        }

        if config.chatbot.provider == ChatProvider::Remote && config.chatbot.api_url.is_none() {
            return Err(ConfigError::Validation(
                "chatbot.provider = \"remote\" requires chatbot.api_url".to_string(),
            ));
        }

        Ok(config)
    }

    /// The secret key, guaranteed present after `load`/`from_toml`.
    pub fn secret_key(&self) -> &str {
        self.app.secret_key.as_deref().unwrap_or_default()
    }

    /// Default log filter for the configured debug mode
    pub fn default_log_filter(&self) -> &'static str {
        if self.app.debug {
            DEBUG_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [http]
        host = "127.0.0.1"
        port = 5000

        [app]
        secret_key = "test-secret"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.http.port, 5000);
        assert!(!config.app.debug);
        assert_eq!(config.database.backend, DatabaseBackend::Mongodb);
        assert_eq!(config.database.name, "medibot");
        assert_eq!(config.chatbot.provider, ChatProvider::Rules);
        assert_eq!(config.session.lifetime_hours, 24);
        assert!(config.reminder.enabled);
        assert!(config.reminder.twilio.is_none());
        assert!(config.cors.allowed_origins.is_empty());
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.secret_key(), "test-secret");
    }

    #[test]
    fn test_debug_selects_verbose_log_filter() {
        let toml = format!("{}\ndebug = true\n", MINIMAL);
        let config = AppConfig::from_toml(&toml).unwrap();
        assert!(config.app.debug);
        assert_eq!(config.default_log_filter(), DEBUG_LOG_FILTER);
    }

    #[test]
    fn test_remote_chatbot_requires_api_url() {
        let toml = format!("{}\n[chatbot]\nprovider = \"remote\"\n", MINIMAL);
        let err = AppConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_reminder_interval_rejected() {
        let toml = format!("{}\n[reminder]\ninterval_seconds = 0\n", MINIMAL);
        assert!(matches!(
            AppConfig::from_toml(&toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_reminder_interval_must_not_skip_minutes() {
        for seconds in [60, 120] {
            let toml = format!("{}\n[reminder]\ninterval_seconds = {}\n", MINIMAL, seconds);
            assert!(matches!(
                AppConfig::from_toml(&toml),
                Err(ConfigError::Validation(_))
            ));
        }
        let toml = format!("{}\n[reminder]\ninterval_seconds = 59\n", MINIMAL);
        assert_eq!(AppConfig::from_toml(&toml).unwrap().reminder.interval_seconds, 59);
    }

    #[test]
    fn test_twilio_section_parses() {
        let toml = format!(
            "{}\n[reminder.twilio]\naccount_sid = \"AC1\"\nauth_token = \"t\"\nfrom_number = \"+15550000000\"\n",
            MINIMAL
        );
        let config = AppConfig::from_toml(&toml).unwrap();
        let twilio = config.reminder.twilio.unwrap();
        assert_eq!(twilio.account_sid, "AC1");
        assert_eq!(twilio.base_url, "https://api.twilio.com");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.http.host, "127.0.0.1");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            AppConfig::load("/nonexistent/medibot.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
