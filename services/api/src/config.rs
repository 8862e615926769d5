//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use attendance_core::BusinessCalendar;
use chrono::NaiveTime;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Outgoing mail relay settings. Absent when `SMTP_HOST` is not set.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When unset the service runs on the in-memory store.
    pub database_url: Option<String>,
    /// An `EnvFilter` directive string such as `info,sqlx=warn`.
    pub log_filter: String,
    pub store_timeout: Duration,
    pub calendar: BusinessCalendar,
    pub admin_email: String,
    pub smtp: Option<SmtpConfig>,
    pub mail_timeout: Duration,
    pub daily_report_at: NaiveTime,
    pub monthly_report_day: u32,
    pub monthly_report_at: NaiveTime,
    pub reconcile_interval: Duration,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_filter: "info".to_string(),
            store_timeout: Duration::from_secs(5),
            calendar: BusinessCalendar::utc(),
            admin_email: "admin@localhost".to_string(),
            smtp: None,
            mail_timeout: Duration::from_secs(10),
            daily_report_at: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            monthly_report_day: 1,
            monthly_report_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            reconcile_interval: Duration::from_secs(300),
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Unset variables fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server and store ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", defaults.bind_address)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let log_filter = lookup("RUST_LOG")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(defaults.log_filter);
        EnvFilter::try_new(&log_filter)
            .map_err(|e| ConfigError::InvalidValue("RUST_LOG".to_string(), e.to_string()))?;
        let store_timeout = secs_or(&lookup, "STORE_TIMEOUT_SECS", defaults.store_timeout)?;

        let offset_minutes: i32 = parse_or(&lookup, "BUSINESS_UTC_OFFSET_MINUTES", 0)?;
        let calendar = BusinessCalendar::from_offset_minutes(offset_minutes).ok_or_else(|| {
            ConfigError::InvalidValue(
                "BUSINESS_UTC_OFFSET_MINUTES".to_string(),
                format!("{} is outside of +/- 24 hours", offset_minutes),
            )
        })?;

        // --- Mail ---
        let admin_email = lookup("ADMIN_EMAIL").unwrap_or(defaults.admin_email);
        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: lookup("SMTP_USERNAME"),
                password: lookup("SMTP_PASSWORD"),
                from: lookup("MAIL_FROM")
                    .ok_or_else(|| ConfigError::MissingVar("MAIL_FROM".to_string()))?,
            }),
            None => None,
        };
        let mail_timeout = secs_or(&lookup, "MAIL_TIMEOUT_SECS", defaults.mail_timeout)?;

        // --- Jobs ---
        let daily_report_at = time_or(&lookup, "DAILY_REPORT_AT", defaults.daily_report_at)?;
        let monthly_report_day: u32 = parse_or(&lookup, "MONTHLY_REPORT_DAY", 1)?;
        if !(1..=28).contains(&monthly_report_day) {
            return Err(ConfigError::InvalidValue(
                "MONTHLY_REPORT_DAY".to_string(),
                "must be between 1 and 28".to_string(),
            ));
        }
        let monthly_report_at =
            time_or(&lookup, "MONTHLY_REPORT_AT", defaults.monthly_report_at)?;
        let reconcile_interval =
            secs_or(&lookup, "RECONCILE_INTERVAL_SECS", defaults.reconcile_interval)?;

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            database_url,
            log_filter,
            store_timeout,
            calendar,
            admin_email,
            smtp,
            mail_timeout,
            daily_report_at,
            monthly_report_day,
            monthly_report_at,
            reconcile_interval,
            cors_origin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, name, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Accepts `HH:MM` wall-clock times.
fn time_or<F>(lookup: &F, name: &str, default: NaiveTime) -> Result<NaiveTime, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
            ConfigError::InvalidValue(name.to_string(), format!("expected HH:MM ({})", e))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.database_url.is_none());
        assert!(config.smtp.is_none());
        assert_eq!(config.daily_report_at, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(config.monthly_report_day, 1);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.calendar, BusinessCalendar::utc());
    }

    #[test]
    fn smtp_settings_require_a_sender() {
        let missing = load(&[("SMTP_HOST", "smtp.example.com")]);
        assert!(matches!(missing, Err(ConfigError::MissingVar(v)) if v == "MAIL_FROM"));

        let config = load(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("MAIL_FROM", "reports@example.com"),
            ("BUSINESS_UTC_OFFSET_MINUTES", "330"),
            ("DAILY_REPORT_AT", "17:45"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.from, "reports@example.com");
        assert_eq!(config.calendar.offset().local_minus_utc(), 330 * 60);
        assert_eq!(config.daily_report_at, NaiveTime::from_hms_opt(17, 45, 0).unwrap());
    }

    #[test]
    fn log_filter_accepts_per_target_directives() {
        assert_eq!(load(&[]).unwrap().log_filter, "info");

        let config = load(&[("RUST_LOG", "info,sqlx=warn,api_lib=debug")]).unwrap();
        assert_eq!(config.log_filter, "info,sqlx=warn,api_lib=debug");
    }

    #[test]
    fn malformed_values_are_reported_by_name() {
        for (name, value) in [
            ("BIND_ADDRESS", "not-an-address"),
            ("DAILY_REPORT_AT", "6pm"),
            ("MONTHLY_REPORT_DAY", "31"),
            ("BUSINESS_UTC_OFFSET_MINUTES", "5000"),
            ("RECONCILE_INTERVAL_SECS", "0"),
            ("RUST_LOG", "info,sqlx=loud"),
        ] {
            match load(&[(name, value)]) {
                Err(ConfigError::InvalidValue(var, _)) => assert_eq!(var, name),
                other => panic!("{} accepted {:?}", name, other.map(|_| ())),
            }
        }
    }
}
