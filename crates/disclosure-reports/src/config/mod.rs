use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::disclosure::YearPolicy;

/// Deployment flavour, taken from `APP_ENV`. Unrecognised values fall back
/// to development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub disclosure: DisclosureConfig,
}

impl AppConfig {
    /// Reads `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = env::var("APP_ENV")
            .map(|raw| AppEnvironment::parse(&raw))
            .unwrap_or(AppEnvironment::Development);

        Ok(Self {
            environment,
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig::from_env(),
            disclosure: DisclosureConfig::from_env()?,
        })
    }
}

/// Where the web service listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("APP_HOST")
            .map(|raw| raw.trim().to_string())
            .unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("APP_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort)?,
            Err(_) => 3000,
        };
        Ok(Self { host, port })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl TelemetryConfig {
    fn from_env() -> Self {
        Self {
            log_level: env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

/// Drill-down policy knobs: which years have published reports, where the
/// LEI scheme takes over, how long an institution lookup may take, and how
/// many browser sessions the host keeps.
#[derive(Debug, Clone)]
pub struct DisclosureConfig {
    pub supported_years: Vec<String>,
    pub first_year: i32,
    pub lei_cutover_year: i32,
    pub lookup_timeout: Duration,
    pub data_path: Option<PathBuf>,
    /// Sessions unused for this long are dropped.
    pub session_idle: Duration,
    /// Upper bound on live sessions; the least recently used one makes room.
    pub max_sessions: usize,
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self {
            supported_years: vec!["2017".to_string()],
            first_year: 2017,
            lei_cutover_year: 2018,
            lookup_timeout: Duration::from_millis(10_000),
            data_path: None,
            session_idle: Duration::from_secs(30 * 60),
            max_sessions: 10_000,
        }
    }
}

impl DisclosureConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let supported_years = match env::var("DISCLOSURE_SUPPORTED_YEARS") {
            Ok(raw) => parse_year_list(&raw)?,
            Err(_) => defaults.supported_years,
        };
        let first_year = year_var("DISCLOSURE_FIRST_YEAR", defaults.first_year)?;
        let lei_cutover_year = year_var("DISCLOSURE_LEI_CUTOVER_YEAR", defaults.lei_cutover_year)?;

        let lookup_timeout = match env::var("DISCLOSURE_LOOKUP_TIMEOUT_MS") {
            Ok(raw) => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|millis| *millis > 0)
                    .ok_or(ConfigError::InvalidTimeout)?;
                Duration::from_millis(millis)
            }
            Err(_) => defaults.lookup_timeout,
        };

        let session_idle = match env::var("DISCLOSURE_SESSION_IDLE_SECS") {
            Ok(raw) => Duration::from_secs(positive_var("DISCLOSURE_SESSION_IDLE_SECS", &raw)?),
            Err(_) => defaults.session_idle,
        };
        let max_sessions = match env::var("DISCLOSURE_MAX_SESSIONS") {
            Ok(raw) => usize::try_from(positive_var("DISCLOSURE_MAX_SESSIONS", &raw)?)
                .unwrap_or(usize::MAX),
            Err(_) => defaults.max_sessions,
        };

        let data_path = env::var("DISCLOSURE_DATA_PATH")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            supported_years,
            first_year,
            lei_cutover_year,
            lookup_timeout,
            data_path,
            session_idle,
            max_sessions,
        })
    }

    pub fn year_policy(&self) -> YearPolicy {
        YearPolicy::new(
            self.supported_years.clone(),
            self.first_year,
            self.lei_cutover_year,
        )
    }
}

fn year_var(name: &'static str, default: i32) -> Result<i32, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_year(&raw).ok_or(ConfigError::InvalidYear { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn positive_var(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::InvalidCount {
            name,
            value: raw.to_string(),
        })
}

fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.len() != 4 {
        return None;
    }
    trimmed.parse::<i32>().ok()
}

fn parse_year_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            parse_year(value)
                .map(|year| year.to_string())
                .ok_or_else(|| ConfigError::InvalidYear {
                    name: "DISCLOSURE_SUPPORTED_YEARS",
                    value: value.to_string(),
                })
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidYear { name: &'static str, value: String },
    InvalidTimeout,
    InvalidCount { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidYear { name, value } => {
                write!(f, "{name} must hold four-digit years (got '{value}')")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "DISCLOSURE_LOOKUP_TIMEOUT_MS must be a positive integer")
            }
            ConfigError::InvalidCount { name, value } => {
                write!(f, "{name} must be a positive integer (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidYear { .. }
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidCount { .. } => None,
        }
    }
}
