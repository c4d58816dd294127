use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::simulation::domain::GameMode;

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
    pub simulation: SimulationConfig,
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = SimulationConfig::default();
        let simulation = SimulationConfig {
            treatment_wait: seconds_var("CASE_TREATMENT_WAIT_SECS", defaults.treatment_wait, true)?,
            dialogue_timeouts: DialogueTimeouts {
                training: seconds_var(
                    "DIALOGUE_TIMEOUT_TRAINING_SECS",
                    defaults.dialogue_timeouts.training,
                    false,
                )?,
                hard: seconds_var(
                    "DIALOGUE_TIMEOUT_HARD_SECS",
                    defaults.dialogue_timeouts.hard,
                    false,
                )?,
                realistic: seconds_var(
                    "DIALOGUE_TIMEOUT_REALISTIC_SECS",
                    defaults.dialogue_timeouts.realistic,
                    false,
                )?,
            },
            ..defaults
        };

        let catalog_path = env::var("CASE_CATALOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            simulation,
            catalog_path,
        })
    }
}

fn seconds_var(name: &'static str, default: Duration, allow_zero: bool) -> Result<Duration, ConfigError> {
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(_) => return Ok(default),
    };

    let seconds = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidDuration { variable: name })?;
    if seconds == 0 && !allow_zero {
        return Err(ConfigError::InvalidDuration { variable: name });
    }

    Ok(Duration::from_secs(seconds))
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs of the case engine, passed explicitly into the service.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Delay between a treatment proposal and its result becoming available.
    pub treatment_wait: Duration,
    pub dialogue_timeouts: DialogueTimeouts,
    pub first_failure_rapport_penalty: u8,
    pub final_failure_rapport_penalty: u8,
    /// Minimum match percentage for the top hypothesis to be flagged primary.
    pub primary_threshold: f64,
    /// Rapport gained or lost per well or badly phrased question.
    pub exchange_rapport_step: u8,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            treatment_wait: Duration::from_secs(45),
            dialogue_timeouts: DialogueTimeouts::default(),
            first_failure_rapport_penalty: 15,
            final_failure_rapport_penalty: 30,
            primary_threshold: 60.0,
            exchange_rapport_step: 2,
        }
    }
}

/// Request timeout applied to the remote dialogue generator, per game mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueTimeouts {
    pub training: Duration,
    pub hard: Duration,
    pub realistic: Duration,
}

impl DialogueTimeouts {
    pub fn for_mode(&self, mode: GameMode) -> Duration {
        match mode {
            GameMode::Training => self.training,
            GameMode::Hard => self.hard,
            GameMode::Realistic => self.realistic,
        }
    }
}

impl Default for DialogueTimeouts {
    fn default() -> Self {
        Self {
            training: Duration::from_secs(20),
            hard: Duration::from_secs(15),
            realistic: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { variable } => {
                write!(f, "{variable} must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidDuration { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
