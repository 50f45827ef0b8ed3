//! Aura command-line entry point.
//!
//! Usage:
//!   aura serve                 HTTP API for the booking assistant
//!   aura seed [--patients N]   create and populate the clinic database
//!   aura remind                run one reminder sweep
//!   aura report                export appointments to a spreadsheet

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use aura_lib::config::AppConfig;
use aura_lib::seed::SeedConfig;
use aura_lib::RunError;

#[derive(Parser)]
#[command(name = "aura")]
#[command(version)]
#[command(about = "Conversational appointment booking for a medical clinic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve,

    /// Create the schema and insert synthetic patients, doctors and slots
    Seed {
        #[arg(long, default_value_t = 50)]
        patients: usize,

        #[arg(long, default_value_t = 3)]
        doctors: usize,

        /// Days of availability to generate, starting today
        #[arg(long, default_value_t = 14)]
        days: u32,
    },

    /// Send due appointment reminders (simulated delivery)
    Remind,

    /// Export booked appointments to an .xlsx workbook
    Report,
}

fn main() -> ExitCode {
    aura_lib::init_tracing();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), RunError> {
    let config = AppConfig::from_env()?;

    match command {
        Commands::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(aura_lib::run_server(config))
        }
        Commands::Seed {
            patients,
            doctors,
            days,
        } => {
            let seed_config = SeedConfig {
                patients,
                doctors,
                days,
            };
            match aura_lib::run_seed(&config, &seed_config)? {
                Some(report) => println!(
                    "Seeded {} patients, {} doctors ({}), {} slots into {}",
                    report.patients,
                    report.doctors.len(),
                    report.doctors.join(", "),
                    report.slots,
                    config.database_path.display()
                ),
                None => println!(
                    "{} already has patients; nothing to do",
                    config.database_path.display()
                ),
            }
            Ok(())
        }
        Commands::Remind => {
            let report = aura_lib::run_reminders(&config)?;
            println!(
                "Reminders sent: {} first, {} second, {} final",
                report.first, report.second, report.third
            );
            Ok(())
        }
        Commands::Report => {
            let summary = aura_lib::run_report(&config)?;
            println!(
                "Wrote {} appointments to {}",
                summary.rows,
                summary.path.display()
            );
            Ok(())
        }
    }
}
