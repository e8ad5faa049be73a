pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::domain::model::DataSource;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Parser;

pub const API_KEY_ENV: &str = "GYM_BILLING_API_KEY";
pub const MAX_GRACE_DAYS: u32 = 90;

pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "gym-billing")]
#[command(about = "Reconcile membership payments and report what each member owes")]
pub struct CliConfig {
    /// Gym (tenant) to process
    #[arg(long)]
    pub gym_id: String,

    /// Directory with plans.csv, members.csv, memberships.csv and payments.csv
    #[arg(long, default_value = "./data")]
    pub input_dir: String,

    /// REST endpoint of the backend; overrides --input-dir when set
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// API key for the backend (falls back to GYM_BILLING_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "csv,json")]
    pub formats: Vec<String>,

    /// Reconcile as of this date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    #[arg(long, default_value = "0")]
    pub grace_days: u32,

    /// Only list overdue memberships in the report
    #[arg(long)]
    pub only_overdue: bool,

    /// Recorded as the actor in the audit log
    #[arg(long, default_value = "system")]
    pub actor: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn gym_id(&self) -> &str {
        &self.gym_id
    }

    fn data_source(&self) -> DataSource {
        match &self.api_endpoint {
            Some(endpoint) => DataSource::Api {
                endpoint: endpoint.clone(),
                api_key: self
                    .api_key
                    .clone()
                    .or_else(|| std::env::var(API_KEY_ENV).ok()),
            },
            None => DataSource::Local {
                dir: self.input_dir.clone(),
            },
        }
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(today)
    }

    fn grace_days(&self) -> u32 {
        self.grace_days
    }

    fn only_overdue(&self) -> bool {
        self.only_overdue
    }

    fn actor(&self) -> &str {
        &self.actor
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        validation::validate_gym_id("gym_id", &self.gym_id)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_output_formats("formats", &self.formats)?;
        validation::validate_range("grace_days", self.grace_days, 0, MAX_GRACE_DAYS)?;
        validation::validate_non_empty_string("actor", &self.actor)?;

        match self.data_source() {
            DataSource::Api { endpoint, api_key } => {
                validation::validate_url("api_endpoint", &endpoint)?;
                let api_key = validation::validate_required_field("api_key", &api_key)?;
                validation::validate_non_empty_string("api_key", api_key)?;
            }
            DataSource::Local { dir } => validation::validate_path("input_dir", &dir)?,
        }

        tracing::debug!("✅ CLI configuration validation passed");
        Ok(())
    }
}
