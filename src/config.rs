//! Process configuration.
//!
//! Everything that varies per deployment is read from the environment once
//! at startup (a `.env` file is honored via dotenvy). Mail credentials, the
//! converter binary, CORS origins, the tenant registry path, and the monthly
//! schedule all come from here; nothing is hard-coded in the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::invoice::PdfConverter;
use crate::scheduler::MonthlySchedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// SMTP relay settings. Present only when `SMTP_HOST` is configured.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_name: String,
    pub from_email: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub tenants_file: PathBuf,
    pub soffice_binary: PathBuf,
    pub convert_timeout: Duration,
    /// Optional override for where per-run workspaces are allocated.
    pub workspace_dir: Option<PathBuf>,
    pub smtp: Option<SmtpConfig>,
    pub schedule: MonthlySchedule,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let soffice_binary = std::env::var("SOFFICE_BINARY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PdfConverter::resolve_binary());

        let schedule = MonthlySchedule {
            day: parsed_or("SCHEDULE_DAY", 1)?,
            hour: parsed_or("SCHEDULE_HOUR", 9)?,
            minute: parsed_or("SCHEDULE_MINUTE", 0)?,
            utc_offset_minutes: parsed_or("SCHEDULE_UTC_OFFSET_MINUTES", 0)?,
        };
        if !schedule.is_valid() {
            return Err(ConfigError::Invalid {
                name: "SCHEDULE_DAY/SCHEDULE_HOUR/SCHEDULE_MINUTE/SCHEDULE_UTC_OFFSET_MINUTES",
                value: format!(
                    "day {} at {:02}:{:02}, offset {} min",
                    schedule.day, schedule.hour, schedule.minute, schedule.utc_offset_minutes
                ),
            });
        }

        Ok(Self {
            port: parsed_or("PORT", 8080)?,
            allowed_origins,
            tenants_file: std::env::var("TENANTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tenants.toml")),
            soffice_binary,
            convert_timeout: Duration::from_secs(parsed_or("CONVERT_TIMEOUT_SECS", 60)?),
            workspace_dir: std::env::var("WORKSPACE_DIR").map(PathBuf::from).ok(),
            smtp: smtp_from_env()?,
            schedule,
        })
    }
}

fn smtp_from_env() -> Result<Option<SmtpConfig>, ConfigError> {
    let Ok(host) = std::env::var("SMTP_HOST") else {
        return Ok(None);
    };
    let from_email = require("MAIL_FROM_EMAIL")?;
    Ok(Some(SmtpConfig {
        host,
        port: parsed_or("SMTP_PORT", 587)?,
        user: require("SMTP_USER")?,
        password: require("SMTP_PASSWORD")?,
        from_name: std::env::var("MAIL_FROM_NAME")
            .unwrap_or_else(|_| "Invoice Service".to_string()),
        from_email,
    }))
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
