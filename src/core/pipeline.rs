use crate::core::audit::{AuditAction, AuditEntry, AuditLog};
use crate::core::dues::build_dues_report;
use crate::core::reconcile::ReconcileOptions;
use crate::core::source::load_snapshot;
use crate::core::{BillingSnapshot, ConfigProvider, DuesReport, Pipeline, Storage};
use crate::utils::error::Result;
use reqwest::Client;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const REPORT_ARCHIVE: &str = "dues_report.zip";

pub struct DuesPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> DuesPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions::new(self.config.as_of()).with_grace_days(self.config.grace_days())
    }
}

/// 依設定的格式產生報表檔案內容
pub fn render_report(report: &DuesReport, formats: &[String]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();

    for format in formats {
        match format.as_str() {
            "csv" | "tsv" => {
                let delimiter = if format == "csv" { b',' } else { b'\t' };
                let mut writer = csv::WriterBuilder::new()
                    .delimiter(delimiter)
                    .from_writer(Vec::new());
                for row in &report.rows {
                    writer.serialize(row)?;
                }
                let data = writer
                    .into_inner()
                    .map_err(|e| crate::utils::error::BillingError::processing(e.to_string()))?;
                files.push((format!("dues.{}", format), data));
            }
            "json" => {
                files.push((
                    "dues.json".to_string(),
                    serde_json::to_vec_pretty(report)?,
                ));
            }
            other => {
                tracing::warn!("Ignoring unsupported output format '{}'", other);
            }
        }
    }

    files.push((
        "summary.json".to_string(),
        serde_json::to_vec_pretty(&report.summary)?,
    ));
    Ok(files)
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for DuesPipeline<S, C> {
    async fn extract(&self) -> Result<BillingSnapshot> {
        let gym_id = self.config.gym_id();
        let mut snapshot =
            load_snapshot(&self.config.data_source(), gym_id, &self.client).await?;

        let dropped = snapshot.retain_gym(gym_id);
        if dropped > 0 {
            tracing::warn!("⚠️ Dropped {} records belonging to other gyms", dropped);
        }

        tracing::debug!(
            "Snapshot for {}: {} plans, {} members, {} memberships, {} payments",
            gym_id,
            snapshot.plans.len(),
            snapshot.members.len(),
            snapshot.memberships.len(),
            snapshot.payments.len()
        );
        Ok(snapshot)
    }

    async fn transform(&self, data: BillingSnapshot) -> Result<DuesReport> {
        let options = self.reconcile_options();
        tracing::debug!(
            "Reconciling as of {} with {} grace days",
            options.as_of,
            options.grace_days
        );

        Ok(build_dues_report(
            &data,
            self.config.gym_id(),
            options,
            self.config.only_overdue(),
        ))
    }

    async fn load(&self, report: DuesReport) -> Result<String> {
        let output_path = format!("{}/{}", self.config.output_path(), REPORT_ARCHIVE);
        let files = render_report(&report, self.config.output_formats())?;

        tracing::debug!("Creating ZIP file with {} files", files.len());

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &files {
                zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                zip.write_all(data)?;
            }
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(REPORT_ARCHIVE, &zip_data).await?;

        let entry = AuditEntry::new(
            self.config.gym_id(),
            self.config.actor(),
            AuditAction::DuesReportGenerated,
            "dues_report",
            report.summary.as_of.to_string(),
        )
        .with_details(serde_json::to_value(&report.summary)?);
        AuditLog::new(&self.storage).record(&entry).await?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DataSource;
    use crate::utils::error::BillingError;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                BillingError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }
    }

    struct MockConfig {
        source: DataSource,
        formats: Vec<String>,
    }

    impl MockConfig {
        fn new(endpoint: String) -> Self {
            Self {
                source: DataSource::Api {
                    endpoint,
                    api_key: None,
                },
                formats: vec!["csv".to_string(), "json".to_string()],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn gym_id(&self) -> &str {
            "gym-a"
        }

        fn data_source(&self) -> DataSource {
            self.source.clone()
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn as_of(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        }

        fn grace_days(&self) -> u32 {
            0
        }

        fn only_overdue(&self) -> bool {
            false
        }

        fn actor(&self) -> &str {
            "test"
        }
    }

    fn mock_tables(server: &MockServer) {
        let tables = [
            (
                "/plans",
                serde_json::json!([
                    {"id": "monthly", "gym_id": "gym-a", "name": "Monthly", "duration_months": 1, "price_cents": 3000}
                ]),
            ),
            (
                "/members",
                serde_json::json!([
                    {"id": "mem-1", "gym_id": "gym-a", "full_name": "Ana Silva"}
                ]),
            ),
            (
                "/memberships",
                serde_json::json!([
                    {"id": "ms-1", "gym_id": "gym-a", "member_id": "mem-1", "plan_id": "monthly", "start_date": "2024-01-01"},
                    {"id": "ms-9", "gym_id": "gym-b", "member_id": "mem-9", "plan_id": "monthly", "start_date": "2024-01-01"}
                ]),
            ),
            (
                "/payments",
                serde_json::json!([
                    {"id": "pay-1", "gym_id": "gym-a", "membership_id": "ms-1", "payment_month": "2024-01", "amount_cents": 3000, "paid_on": "2024-01-02"}
                ]),
            ),
        ];

        for (path, body) in tables {
            server.mock(|when, then| {
                when.method(GET).path(path).query_param("gym_id", "eq.gym-a");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(body);
            });
        }
    }

    #[tokio::test]
    async fn test_extract_drops_other_gyms() {
        let server = MockServer::start();
        mock_tables(&server);

        let pipeline = DuesPipeline::new(MockStorage::new(), MockConfig::new(server.base_url()));
        let snapshot = pipeline.extract().await.unwrap();

        assert_eq!(snapshot.memberships.len(), 1);
        assert_eq!(snapshot.payments.len(), 1);
    }

    #[tokio::test]
    async fn test_full_run_writes_archive_and_audit() {
        let server = MockServer::start();
        mock_tables(&server);

        let storage = MockStorage::new();
        let pipeline = DuesPipeline::new(storage.clone(), MockConfig::new(server.base_url()));

        let snapshot = pipeline.extract().await.unwrap();
        let report = pipeline.transform(snapshot).await.unwrap();
        assert_eq!(report.rows[0].periods_owed, 2);

        let path = pipeline.load(report).await.unwrap();
        assert_eq!(path, "test_output/dues_report.zip");

        let zip_data = storage.get_file(REPORT_ARCHIVE).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"dues.csv".to_string()));
        assert!(names.contains(&"dues.json".to_string()));
        assert!(names.contains(&"summary.json".to_string()));

        let audit = storage.get_file("audit.log").await.unwrap();
        let audit = String::from_utf8(audit).unwrap();
        assert!(audit.contains("dues_report_generated"));
    }

    #[tokio::test]
    async fn test_extract_api_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(500);
        });

        let pipeline = DuesPipeline::new(MockStorage::new(), MockConfig::new(server.base_url()));
        let result = pipeline.extract().await;
        assert!(matches!(
            result,
            Err(BillingError::ApiStatusError { status: 500, .. })
        ));
    }

    #[test]
    fn test_render_tsv_uses_tabs() {
        let report = DuesReport {
            summary: crate::domain::report::DuesSummary {
                gym_id: "gym-a".into(),
                as_of: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                memberships: 0,
                overdue: 0,
                periods_owed: 0,
                amount_owed: crate::domain::money::Money::ZERO,
                skipped: 0,
            },
            rows: vec![],
            skipped: vec![],
        };
        let files = render_report(&report, &["tsv".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "dues.tsv");
        assert_eq!(files[1].0, "summary.json");
    }
}
