//! Seeder Main Entry Point
//!
//! Seeds a PocketBase instance with the research platform fixtures, or
//! remaps the fixture ids offline.
//!
//! Usage: `seeder [seed|remap]` (default: `seed`)

use dotenv::dotenv;
use seeder::loader::JsonDirectorySource;
use seeder::{remap_directory, CanonicalIdGenerator, Dependencies, SeedError, Settings};
use std::env;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), SeedError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seeder=info,seeder_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| SeedError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "seeder",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| SeedError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "seeder",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

/// Subcommands of the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Remap,
}

impl Command {
    fn parse(arg: Option<&str>) -> Result<Self, SeedError> {
        match arg {
            None | Some("seed") => Ok(Self::Seed),
            Some("remap") => Ok(Self::Remap),
            Some(other) => Err(SeedError::config(format!(
                "Unknown command {}, expected seed or remap",
                other
            ))),
        }
    }
}

async fn seed() -> Result<ExitCode, SeedError> {
    let mut deps = match Dependencies::new() {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let report = deps.seeder.run().await?;
    if report.has_failures() {
        warn!(
            failures = report.failures.len(),
            "Seeding finished with failed records"
        );
        return Ok(ExitCode::FAILURE);
    }

    info!(dry_run = deps.settings.dry_run, "Seeding completed successfully");
    Ok(ExitCode::SUCCESS)
}

async fn remap() -> Result<ExitCode, SeedError> {
    let plan = Settings::plan_from_env()?;
    let source = JsonDirectorySource::new(Settings::data_dir_from_env());

    let summary = remap_directory(&source, &plan, CanonicalIdGenerator::random()).await?;
    info!(
        records = summary.records,
        references = summary.references,
        "Remap completed successfully"
    );
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode, SeedError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    let arg = env::args().nth(1);
    let command = Command::parse(arg.as_deref())?;
    info!(command = ?command, "Starting research platform seeder");

    let result = match command {
        Command::Seed => seed().await,
        Command::Remap => remap().await,
    };

    if let Err(e) = &result {
        error!(error = %e, "Seeder failed");
    }
    result
}
