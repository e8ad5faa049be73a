pub mod audit;
pub mod dues;
pub mod engine;
pub mod invoice;
pub mod pipeline;
pub mod reconcile;
pub mod register;
pub mod source;

pub use crate::domain::model::BillingSnapshot;
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::domain::report::DuesReport;
pub use crate::utils::error::Result;
