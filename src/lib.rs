pub mod api;
pub mod config;
pub mod core_state;
pub mod dashboard;
pub mod db;
pub mod dialogue;
pub mod extraction;
pub mod models;
pub mod notify;
pub mod reminders;
pub mod report;
pub mod scheduling;
pub mod seed;

use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::{CoreError, CoreState};
use crate::reminders::{ReminderReport, SimulatedNotifier};
use crate::report::ReportSummary;
use crate::seed::{SeedConfig, SeedReport};

/// Initialize tracing. `RUST_LOG` wins over the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Errors surfaced by the command-line entry points.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Report error: {0}")]
    Report(#[from] report::ReportError),
    #[error("Notification error: {0}")]
    Notify(#[from] notify::NotifyError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server error: {0}")]
    Server(String),
}

/// Serve the HTTP API until Ctrl-C.
pub async fn run_server(config: AppConfig) -> Result<(), RunError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::from_config(config)?);

    let checker = core.clone();
    let ready = tokio::task::spawn_blocking(move || checker.extraction_model_ready())
        .await
        .unwrap_or(false);
    if !ready {
        tracing::warn!(
            model = %core.config.extraction_model,
            url = %core.config.ollama_url,
            "Extraction model not available; run `ollama pull` before chatting"
        );
    }

    let mut server = api::start_api_server(core, bind_addr)
        .await
        .map_err(RunError::Server)?;
    tracing::info!(addr = %server.addr, "Listening");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    server.wait().await;
    Ok(())
}

/// Create the schema, fill it with synthetic data and write the intake form.
/// An already populated database is left alone.
pub fn run_seed(config: &AppConfig, seed_config: &SeedConfig) -> Result<Option<SeedReport>, RunError> {
    config.ensure_data_dir()?;
    let conn = db::open_database(&config.database_path)?;

    notify::ensure_intake_form(&config.intake_form_path)?;

    let existing = db::count_patients(&conn)?;
    if existing > 0 {
        tracing::info!(patients = existing, "Database already seeded, skipping");
        return Ok(None);
    }

    let report = seed::seed_database(
        &conn,
        seed_config,
        Local::now().date_naive(),
        &mut rand::thread_rng(),
    )?;
    Ok(Some(report))
}

/// One reminder sweep against the clinic database, with simulated delivery.
pub fn run_reminders(config: &AppConfig) -> Result<ReminderReport, RunError> {
    config.ensure_data_dir()?;
    let conn = db::open_database(&config.database_path)?;
    let report = reminders::run_sweep(&conn, &SimulatedNotifier, Local::now().naive_local())?;
    tracing::info!(
        first = report.first,
        second = report.second,
        third = report.third,
        "Reminder sweep complete"
    );
    Ok(report)
}

pub fn run_report(config: &AppConfig) -> Result<ReportSummary, RunError> {
    config.ensure_data_dir()?;
    let conn = db::open_database(&config.database_path)?;
    Ok(report::generate_admin_report(&conn, &config.report_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "AURA_DATA_DIR" => Some(dir.display().to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn seed_then_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let seeded = run_seed(
            &config,
            &SeedConfig {
                patients: 5,
                doctors: 2,
                days: 7,
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(seeded.patients, 5);
        assert!(seeded.slots > 0);
        assert!(config.intake_form_path.exists());

        // Second run leaves data alone
        assert!(run_seed(&config, &SeedConfig::default()).unwrap().is_none());

        let summary = run_report(&config).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(summary.path.exists());
    }

    #[test]
    fn reminders_on_empty_clinic() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let report = run_reminders(&config).unwrap();
        assert_eq!(report.total(), 0);
    }
}
