use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Aura";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Signature used in outbound patient emails.
pub const CLINIC_NAME: &str = "Aura Health";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EXTRACTION_MODEL: &str = "phi3:mini";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8085";
pub const DEFAULT_SMTP_PORT: u16 = 587;

pub const INTAKE_FORM_FILENAME: &str = "New Patient Intake Form.pdf";
pub const REPORT_FILENAME: &str = "admin_report.xlsx";

/// Tracing filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "warn,aura=info,aura_lib=info,tower_http=info"
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("AuraHealth"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Load `.env` from the working directory if present. Missing file is not an error.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Where dialogue checkpoints are kept between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointBackend {
    Memory,
    Sqlite,
}

/// Outbound mail server credentials. Present only when fully configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub intake_form_path: PathBuf,
    pub report_path: PathBuf,
    pub ollama_url: String,
    pub extraction_model: String,
    pub smtp: Option<SmtpSettings>,
    pub bind_addr: SocketAddr,
    pub checkpoints: CheckpointBackend,
}

impl AppConfig {
    /// Resolve configuration from the process environment (after `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = get("AURA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let intake_form_path = get("AURA_INTAKE_FORM")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("forms").join(INTAKE_FORM_FILENAME));

        let bind_raw = get("AURA_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "AURA_BIND_ADDR",
                value: bind_raw.clone(),
            })?;

        let checkpoints = match get("AURA_CHECKPOINTS").as_deref() {
            None | Some("memory") => CheckpointBackend::Memory,
            Some("sqlite") => CheckpointBackend::Sqlite,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "AURA_CHECKPOINTS",
                    value: other.to_string(),
                })
            }
        };

        let smtp = match (get("EMAIL_HOST"), get("EMAIL_HOST_USER"), get("EMAIL_HOST_PASSWORD")) {
            (Some(host), Some(username), Some(password)) => {
                let port = match get("EMAIL_PORT") {
                    Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                        key: "EMAIL_PORT",
                        value: raw.clone(),
                    })?,
                    None => DEFAULT_SMTP_PORT,
                };
                Some(SmtpSettings {
                    host,
                    port,
                    username,
                    password,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_path: data_dir.join("clinic.db"),
            report_path: data_dir.join(REPORT_FILENAME),
            intake_form_path,
            ollama_url: get("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            extraction_model: get("AURA_EXTRACTION_MODEL")
                .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
            smtp,
            bind_addr,
            checkpoints,
            data_dir,
        })
    }

    /// Make sure the data directory exists before opening the database.
    pub fn ensure_data_dir(&self) -> std::io::Result<&Path> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[("AURA_DATA_DIR", "/tmp/aura-test")])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/aura-test/clinic.db"));
        assert_eq!(config.extraction_model, "phi3:mini");
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.checkpoints, CheckpointBackend::Memory);
        assert!(config.smtp.is_none());
        assert!(config.intake_form_path.ends_with(INTAKE_FORM_FILENAME));
    }

    #[test]
    fn smtp_requires_host_user_and_password() {
        let partial = AppConfig::from_lookup(lookup(&[
            ("EMAIL_HOST", "smtp.example.com"),
            ("EMAIL_HOST_USER", "front-desk@example.com"),
        ]))
        .unwrap();
        assert!(partial.smtp.is_none());

        let full = AppConfig::from_lookup(lookup(&[
            ("EMAIL_HOST", "smtp.example.com"),
            ("EMAIL_HOST_USER", "front-desk@example.com"),
            ("EMAIL_HOST_PASSWORD", "secret"),
            ("EMAIL_PORT", "2525"),
        ]))
        .unwrap();
        let smtp = full.smtp.unwrap();
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.host, "smtp.example.com");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("EMAIL_HOST", "smtp.example.com"),
            ("EMAIL_HOST_USER", "u"),
            ("EMAIL_HOST_PASSWORD", "p"),
            ("EMAIL_PORT", "not-a-port"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "EMAIL_PORT", .. })));
    }

    #[test]
    fn checkpoint_backend_parsing() {
        let config = AppConfig::from_lookup(lookup(&[("AURA_CHECKPOINTS", "sqlite")])).unwrap();
        assert_eq!(config.checkpoints, CheckpointBackend::Sqlite);
        assert!(AppConfig::from_lookup(lookup(&[("AURA_CHECKPOINTS", "redis")])).is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("AURA_EXTRACTION_MODEL", "  ")])).unwrap();
        assert_eq!(config.extraction_model, DEFAULT_EXTRACTION_MODEL);
    }

    #[test]
    fn app_name_is_aura() {
        assert_eq!(APP_NAME, "Aura");
    }
}
