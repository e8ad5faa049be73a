use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use gym_billing::core::audit::{AuditAction, AuditEntry, AuditLog};
use gym_billing::core::invoice::Invoice;
use gym_billing::core::register::{close_register, RegisterSession};
use gym_billing::core::source::parse_csv;
use gym_billing::core::Storage;
use gym_billing::utils::logger;
use gym_billing::{LocalStorage, Money, Payment};

#[derive(Parser)]
#[command(name = "register-close")]
#[command(about = "Close a cash register for one business day")]
struct Args {
    #[arg(long)]
    gym_id: String,

    #[arg(long)]
    register_id: String,

    /// Business date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// Cash in the drawer when the register opened, e.g. 100.00
    #[arg(long, default_value = "0")]
    opening_float: Money,

    /// Cash counted in the drawer at closing, e.g. 245.50
    #[arg(long)]
    counted_cash: Money,

    /// JSON file with the day's POS invoices
    #[arg(long)]
    invoices: String,

    /// CSV file with membership payments
    #[arg(long)]
    payments: Option<String>,

    #[arg(long, default_value = "./output")]
    output_path: String,

    #[arg(long, default_value = "system")]
    actor: String,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let invoices: Vec<Invoice> = {
        let data = std::fs::read(&args.invoices)
            .with_context(|| format!("failed to read invoices from {}", args.invoices))?;
        serde_json::from_slice(&data).context("invoices file is not valid JSON")?
    };

    let payments: Vec<Payment> = match &args.payments {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read payments from {}", path))?;
            parse_csv(&data)?
        }
        None => Vec::new(),
    };

    tracing::info!(
        "Closing register {} for {} ({} invoices, {} payments loaded)",
        args.register_id,
        args.date,
        invoices.len(),
        payments.len()
    );

    let session = RegisterSession {
        gym_id: args.gym_id.clone(),
        register_id: args.register_id.clone(),
        business_date: args.date,
        opening_float: args.opening_float,
    };

    let closing = match close_register(&session, &invoices, &payments, args.counted_cash) {
        Ok(closing) => closing,
        Err(e) => {
            tracing::error!("❌ Register closing failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    };

    if closing.is_balanced() {
        tracing::info!("✅ Register balanced: expected {}", closing.expected_cash);
    } else {
        tracing::warn!(
            "⚠️ Register off by {} (expected {}, counted {})",
            closing.difference,
            closing.expected_cash,
            closing.counted_cash
        );
    }

    let json = serde_json::to_vec_pretty(&closing)?;
    let storage = LocalStorage::new(args.output_path.clone());
    let file_name = format!("register_{}_{}.json", closing.register_id, closing.business_date);
    storage.write_file(&file_name, &json).await?;

    let entry = AuditEntry::new(
        &closing.gym_id,
        &args.actor,
        AuditAction::RegisterClosed,
        "register",
        &closing.register_id,
    )
    .with_details(serde_json::json!({
        "business_date": closing.business_date,
        "expected_cash_cents": closing.expected_cash,
        "counted_cash_cents": closing.counted_cash,
        "difference_cents": closing.difference,
    }));
    AuditLog::new(&storage).record(&entry).await?;

    println!("{}", String::from_utf8_lossy(&json));
    println!("📁 Closing saved to: {}/{}", args.output_path, file_name);
    Ok(())
}
