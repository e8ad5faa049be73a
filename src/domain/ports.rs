use crate::domain::model::{BillingSnapshot, DataSource};
use crate::domain::report::DuesReport;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn gym_id(&self) -> &str;
    fn data_source(&self) -> DataSource;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn as_of(&self) -> NaiveDate;
    fn grace_days(&self) -> u32;
    fn only_overdue(&self) -> bool;
    fn actor(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<BillingSnapshot>;
    async fn transform(&self, data: BillingSnapshot) -> Result<DuesReport>;
    async fn load(&self, report: DuesReport) -> Result<String>;
}
