use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

/// Runs a billing pipeline phase by phase.
pub struct BillingEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> BillingEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting billing run...");
        self.monitor.log_phase("start");

        tracing::info!("Extracting billing data...");
        let snapshot = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} memberships and {} payments",
            snapshot.memberships.len(),
            snapshot.payments.len()
        );
        self.monitor.log_phase("extract");

        tracing::info!("Reconciling memberships...");
        let report = self.pipeline.transform(snapshot).await?;
        tracing::info!(
            "Reconciled {} memberships: {} overdue, {} owed",
            report.summary.memberships,
            report.summary.overdue,
            report.summary.amount_owed
        );
        if !report.skipped.is_empty() {
            tracing::warn!("⚠️ {} memberships skipped", report.skipped.len());
        }
        self.monitor.log_phase("transform");

        tracing::info!("Writing dues report...");
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_phase("load");
        self.monitor.log_final();

        Ok(output_path)
    }
}
