use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::portal::applications::ReviewPolicy;
use crate::portal::credentials::{
    DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB, MIN_HASH_MEMORY_KIB,
};
use crate::portal::report::DEFAULT_ACTIVITY_LIMIT;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");
        let format = match environment {
            AppEnvironment::Production => LogFormat::Json,
            AppEnvironment::Development | AppEnvironment::Test => LogFormat::Compact,
        };

        let data_path = env::var("PORTAL_DATA_PATH")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let password_iterations = match env::var("PORTAL_PASSWORD_ITERATIONS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidPasswordIterations { value: raw })?,
            Err(_) => DEFAULT_HASH_ITERATIONS,
        };

        let password_memory_kib = match env::var("PORTAL_PASSWORD_MEMORY_KIB") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|kib| *kib >= MIN_HASH_MEMORY_KIB)
                .ok_or(ConfigError::InvalidPasswordMemory { value: raw })?,
            Err(_) => DEFAULT_HASH_MEMORY_KIB,
        };

        let review_policy = match env::var("PORTAL_REVIEW_POLICY") {
            Ok(raw) => raw
                .parse::<ReviewPolicy>()
                .map_err(|_| ConfigError::InvalidReviewPolicy { value: raw })?,
            Err(_) => ReviewPolicy::default(),
        };

        let activity_limit = match env::var("PORTAL_ACTIVITY_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::InvalidActivityLimit { value: raw })?,
            Err(_) => PortalConfig::default().activity_limit,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            portal: PortalConfig {
                data_path,
                password_iterations,
                password_memory_kib,
                review_policy,
                activity_limit,
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Domain settings: where the store lives, hashing cost, review policy, feed length.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub data_path: Option<PathBuf>,
    pub password_iterations: u32,
    pub password_memory_kib: u32,
    pub review_policy: ReviewPolicy,
    pub activity_limit: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            password_iterations: DEFAULT_HASH_ITERATIONS,
            password_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            review_policy: ReviewPolicy::default(),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPasswordIterations { value: String },
    InvalidPasswordMemory { value: String },
    InvalidReviewPolicy { value: String },
    InvalidActivityLimit { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPasswordIterations { value } => write!(
                f,
                "PORTAL_PASSWORD_ITERATIONS must be a positive integer, got '{value}'"
            ),
            ConfigError::InvalidPasswordMemory { value } => write!(
                f,
                "PORTAL_PASSWORD_MEMORY_KIB must be an integer of at least {MIN_HASH_MEMORY_KIB}, got '{value}'"
            ),
            ConfigError::InvalidReviewPolicy { value } => write!(
                f,
                "PORTAL_REVIEW_POLICY must be 'revisable' or 'terminal_once', got '{value}'"
            ),
            ConfigError::InvalidActivityLimit { value } => write!(
                f,
                "PORTAL_ACTIVITY_LIMIT must be a positive integer, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PORTAL_DATA_PATH",
            "PORTAL_PASSWORD_ITERATIONS",
            "PORTAL_PASSWORD_MEMORY_KIB",
            "PORTAL_REVIEW_POLICY",
            "PORTAL_ACTIVITY_LIMIT",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert!(config.portal.data_path.is_none());
        assert_eq!(config.portal.password_iterations, DEFAULT_HASH_ITERATIONS);
        assert_eq!(config.portal.password_memory_kib, DEFAULT_HASH_MEMORY_KIB);
        assert_eq!(config.portal.review_policy, ReviewPolicy::Revisable);
        assert_eq!(config.portal.activity_limit, 10);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_portal_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("PORTAL_DATA_PATH", "/var/lib/portal/state.json");
        env::set_var("PORTAL_PASSWORD_ITERATIONS", "3");
        env::set_var("PORTAL_PASSWORD_MEMORY_KIB", "65536");
        env::set_var("PORTAL_REVIEW_POLICY", "terminal_once");
        env::set_var("PORTAL_ACTIVITY_LIMIT", "25");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.telemetry.format, LogFormat::Json);
        assert_eq!(
            config.portal.data_path,
            Some(PathBuf::from("/var/lib/portal/state.json"))
        );
        assert_eq!(config.portal.password_iterations, 3);
        assert_eq!(config.portal.password_memory_kib, 65536);
        assert_eq!(config.portal.review_policy, ReviewPolicy::TerminalOnce);
        assert_eq!(config.portal.activity_limit, 25);
        reset_env();
    }

    #[test]
    fn rejects_invalid_portal_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        env::set_var("PORTAL_PASSWORD_ITERATIONS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPasswordIterations { .. })
        ));
        reset_env();

        env::set_var("PORTAL_PASSWORD_MEMORY_KIB", "4");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPasswordMemory { .. })
        ));
        reset_env();

        env::set_var("PORTAL_REVIEW_POLICY", "sometimes");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidReviewPolicy { .. })
        ));
        reset_env();

        env::set_var("PORTAL_ACTIVITY_LIMIT", "-3");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidActivityLimit { .. })
        ));
        reset_env();
    }
}
