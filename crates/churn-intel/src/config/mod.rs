use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::scoring::{PriorityFormula, Thresholds, ThresholdError};

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
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::from_env()?,
        })
    }
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Scoring dials: where artifacts live, tier cut points, and the priority formula.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub artifact_dir: PathBuf,
    pub thresholds: Thresholds,
    pub priority_formula: PriorityFormula,
    pub revenue_attribute: String,
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let artifact_dir =
            PathBuf::from(env::var("CHURN_ARTIFACT_DIR").unwrap_or_else(|_| "models".to_string()));

        let medium_floor = read_probability("CHURN_MEDIUM_FLOOR", 0.4)?;
        let high_floor = read_probability("CHURN_HIGH_FLOOR", 0.7)?;
        let thresholds = Thresholds::new(medium_floor, high_floor)
            .map_err(|source| ConfigError::InvalidThresholds { source })?;

        let priority_formula = match env::var("CHURN_PRIORITY_FORMULA") {
            Ok(raw) => raw
                .parse::<PriorityFormula>()
                .map_err(|_| ConfigError::InvalidPriorityFormula(raw))?,
            Err(_) => PriorityFormula::default(),
        };

        let revenue_attribute = env::var("CHURN_REVENUE_ATTRIBUTE")
            .map(|raw| raw.trim().to_ascii_lowercase())
            .unwrap_or_else(|_| "monthlycharges".to_string());

        Ok(Self {
            artifact_dir,
            thresholds,
            priority_formula,
            revenue_attribute,
        })
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("models"),
            thresholds: Thresholds::default(),
            priority_formula: PriorityFormula::default(),
            revenue_attribute: "monthlycharges".to_string(),
        }
    }
}

fn read_probability(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidProbability { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidProbability { key: &'static str, value: String },
    InvalidThresholds { source: ThresholdError },
    InvalidPriorityFormula(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidProbability { key, value } => {
                write!(f, "{key} must be a number between 0 and 1 (found '{value}')")
            }
            ConfigError::InvalidThresholds { source } => {
                write!(f, "risk thresholds are inconsistent: {source}")
            }
            ConfigError::InvalidPriorityFormula(value) => write!(
                f,
                "CHURN_PRIORITY_FORMULA must be 'probability_weighted' or 'expected_loss' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidThresholds { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidProbability { .. }
            | ConfigError::InvalidPriorityFormula(_) => None,
        }
    }
}
