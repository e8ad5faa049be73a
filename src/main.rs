use clap::Parser;
use gym_billing::core::ConfigProvider;
use gym_billing::utils::{logger, validation::Validate};
use gym_billing::{BillingEngine, CliConfig, DuesPipeline, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init(config.verbose, config.json_logs);

    tracing::info!("Starting gym-billing for gym {}", config.gym_id);
    tracing::debug!(
        "Output: {} ({}), grace days: {}",
        config.output_path,
        config.formats.join(","),
        config.grace_days
    );

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("📅 Reconciling as of {}", config.as_of());

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 Process monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = DuesPipeline::new(storage, config);
    let engine = BillingEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Dues report completed successfully!");
            println!("✅ Dues report completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Billing run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 依嚴重程度決定結束碼
            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
