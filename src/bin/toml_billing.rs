use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use gym_billing::config::toml_config::TomlConfig;
use gym_billing::core::{ConfigProvider, Pipeline};
use gym_billing::utils::{logger, validation::Validate};
use gym_billing::{BillingEngine, DataSource, DuesPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-billing")]
#[command(about = "Membership dues report driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "billing.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the reconciliation date from config
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Reconcile and print the summary without writing the report
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init(args.verbose, config.json_logs());
    tracing::info!("🚀 Starting TOML-based billing run");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 套用命令列覆蓋設定
    if let Some(as_of) = args.as_of {
        config.billing.as_of = Some(as_of);
        tracing::info!("🔧 Reconciliation date overridden to: {}", as_of);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = DuesPipeline::new(storage, config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        return perform_dry_run(&pipeline).await;
    }

    let engine = BillingEngine::new_with_monitoring(pipeline, monitor_enabled);
    match engine.run().await {
        Ok(output_path) => {
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
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Gym: {}", config.gym_id());
    match &config.source {
        DataSource::Local { dir } => println!("  Source: local CSV exports in {}", dir),
        DataSource::Api { endpoint, .. } => println!("  Source: {}", endpoint),
    }
    println!("  As of: {}", config.as_of());
    println!("  Grace days: {}", config.grace_days());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if config.only_overdue() {
        println!("  Rows: overdue memberships only");
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

async fn perform_dry_run(pipeline: &DuesPipeline<LocalStorage, TomlConfig>) -> anyhow::Result<()> {
    let snapshot = pipeline
        .extract()
        .await
        .context("failed to extract billing data")?;
    println!("📊 Extracted:");
    println!("  Plans: {}", snapshot.plans.len());
    println!("  Members: {}", snapshot.members.len());
    println!("  Memberships: {}", snapshot.memberships.len());
    println!("  Payments: {}", snapshot.payments.len());

    let report = pipeline
        .transform(snapshot)
        .await
        .context("failed to reconcile memberships")?;
    let summary = &report.summary;
    println!();
    println!("🧮 Reconciliation as of {}:", summary.as_of);
    println!("  Memberships: {}", summary.memberships);
    println!("  Overdue: {}", summary.overdue);
    println!("  Periods owed: {}", summary.periods_owed);
    println!("  Amount owed: {}", summary.amount_owed);

    for skipped in &report.skipped {
        println!("  ⚠️ Skipped {}: {}", skipped.membership_id, skipped.reason);
    }

    println!();
    println!("✅ Dry run complete. Run without --dry-run to write the report.");
    Ok(())
}
