pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use crate::core::{
    engine::BillingEngine,
    pipeline::DuesPipeline,
    reconcile::{reconcile, BillingPeriod, PeriodStatus, ReconcileOptions, Reconciliation},
};
pub use domain::model::{
    BillingSnapshot, DataSource, Member, Membership, MembershipStatus, Payment, PaymentMethod,
    Plan,
};
pub use domain::{money::Money, month::YearMonth};
pub use utils::error::{BillingError, Result};
