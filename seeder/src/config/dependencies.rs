//! Dependency initialization and wiring for the seeder.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::loader::JsonDirectorySource;
use crate::orchestrator::Seeder;
use crate::SeedError;
use seeder_repository::config::{DEFAULT_POCKETBASE_URL, DEFAULT_TIMEOUT};
use seeder_repository::{Credentials, PocketBaseConfig, StoreSource};
use seeder_shared::SeedPlan;

/// Default directory holding the collection files.
const DEFAULT_DATA_DIR: &str = ".";

/// Identity used when no admin account is configured for a dry run.
const DRY_RUN_IDENTITY: &str = "dry-run";

/// Settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pocketbase_url: String,
    pub credentials: Credentials,
    pub data_dir: PathBuf,
    pub plan: SeedPlan,
    pub rng_seed: Option<u64>,
    pub timeout: Duration,
    pub dry_run: bool,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `POCKETBASE_URL`: PocketBase base URL (default: http://127.0.0.1:8090)
    /// - `POCKETBASE_ADMIN_EMAIL`: Admin identity (required unless dry run)
    /// - `POCKETBASE_ADMIN_PASSWORD`: Admin password (required unless dry run)
    /// - `SEED_DATA_DIR`: Directory with `{collection}.json` files (default: .)
    /// - `SEED_PLAN_PATH`: JSON seed plan (default: built-in research platform plan)
    /// - `SEED_RNG_SEED`: Seed for synthetic relationships (default: entropy)
    /// - `STORE_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)
    /// - `SEED_DRY_RUN`: Write into an in-memory store instead (default: false)
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Parsed settings
    /// * `Err(SeedError::ConfigError)` - If a value is missing or invalid
    pub fn from_env() -> Result<Self, SeedError> {
        let pocketbase_url =
            env::var("POCKETBASE_URL").unwrap_or_else(|_| DEFAULT_POCKETBASE_URL.to_string());
        let dry_run = match env::var("SEED_DRY_RUN") {
            Ok(value) => parse_flag("SEED_DRY_RUN", &value)?,
            Err(_) => false,
        };

        let identity = env::var("POCKETBASE_ADMIN_EMAIL").ok();
        let password = env::var("POCKETBASE_ADMIN_PASSWORD").ok();
        let credentials = match (identity, password) {
            (Some(identity), Some(password)) => Credentials::new(identity, password),
            _ if dry_run => Credentials::new(DRY_RUN_IDENTITY, ""),
            (None, _) => return Err(SeedError::config("POCKETBASE_ADMIN_EMAIL must be set")),
            (_, None) => return Err(SeedError::config("POCKETBASE_ADMIN_PASSWORD must be set")),
        };

        let data_dir = Self::data_dir_from_env();
        let plan = Self::plan_from_env()?;

        let rng_seed = match env::var("SEED_RNG_SEED") {
            Ok(value) => Some(value.parse::<u64>().map_err(|e| {
                SeedError::config(format!("Invalid SEED_RNG_SEED {}: {}", value, e))
            })?),
            Err(_) => None,
        };

        let timeout = match env::var("STORE_TIMEOUT_SECS") {
            Ok(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(SeedError::config(format!(
                        "Invalid STORE_TIMEOUT_SECS {}: expected a positive number of seconds",
                        value
                    )));
                }
            },
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            pocketbase_url,
            credentials,
            data_dir,
            plan,
            rng_seed,
            timeout,
            dry_run,
        })
    }

    /// `SEED_DATA_DIR`, or the current directory.
    pub fn data_dir_from_env() -> PathBuf {
        PathBuf::from(env::var("SEED_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()))
    }

    /// The plan at `SEED_PLAN_PATH`, or the built-in research platform plan.
    pub fn plan_from_env() -> Result<SeedPlan, SeedError> {
        let Ok(path) = env::var("SEED_PLAN_PATH") else {
            return Ok(SeedPlan::research_platform());
        };

        let body = std::fs::read_to_string(&path)
            .map_err(|e| SeedError::config(format!("Failed to read seed plan {}: {}", path, e)))?;
        SeedPlan::from_json_str(&body)
            .map_err(|e| SeedError::config(format!("Invalid seed plan {}: {}", path, e)))
    }

    /// Which store the settings point at.
    pub fn store_source(&self) -> StoreSource {
        if self.dry_run {
            StoreSource::dry_run()
        } else {
            StoreSource::pocketbase(
                PocketBaseConfig::new(self.pocketbase_url.clone()).with_timeout(self.timeout),
            )
        }
    }

    pub fn collection_source(&self) -> JsonDirectorySource {
        JsonDirectorySource::new(self.data_dir.clone())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, SeedError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "" | "0" | "false" | "no" => Ok(false),
        _ => Err(SeedError::config(format!(
            "Invalid {} {}: expected true or false",
            name, value
        ))),
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured seeder ready to run.
    pub seeder: Seeder,
    pub settings: Settings,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    pub fn new() -> Result<Self, SeedError> {
        Self::from_settings(Settings::from_env()?)
    }

    /// Wire the seeder from already parsed settings.
    pub fn from_settings(settings: Settings) -> Result<Self, SeedError> {
        info!(
            pocketbase_url = %settings.pocketbase_url,
            data_dir = %settings.data_dir.display(),
            collections = settings.plan.collections.len(),
            dry_run = settings.dry_run,
            timeout_secs = settings.timeout.as_secs(),
            "Initializing dependencies"
        );

        let store = settings.store_source().into_store()?;
        let source = settings.collection_source();

        let mut seeder = Seeder::new(
            store,
            Box::new(source),
            settings.plan.clone(),
            settings.credentials.clone(),
        );
        if let Some(seed) = settings.rng_seed {
            seeder = seeder.with_seed(seed);
        }

        Ok(Self { seeder, settings })
    }
}
