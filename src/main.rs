use azcost::azure::{acquire_token, ArmClient, Credential};
use azcost::billing::calculator::format_currency;
use azcost::billing::{resolve_pricing, CostReport};
use azcost::cli::Cli;
use azcost::config::{Config, ConfigLoader};
use azcost::core::{run, DataSource, Phase, RunOptions, StatusTracker};
use azcost::report::{export_all, ExportOutcome};
use azcost::utils::http::build_client;
use azcost::utils::{block_on, init_logging, load_inventory};
use std::sync::Arc;

/// Rows of each section in the console summary
const SUMMARY_ROWS: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    // Handle configuration commands
    if cli.init {
        Config::init(cli.config.as_deref())?;
        return Ok(());
    }

    if cli.print {
        let config = ConfigLoader::load(cli.config.as_deref()).unwrap_or_else(|_| Config::default());
        config.print()?;
        return Ok(());
    }

    if cli.check {
        let config = ConfigLoader::load(cli.config.as_deref())?;
        config.check()?;
        println!("✓ Configuration valid");
        return Ok(());
    }

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.check()?;

    let log_file = optional_path(&config, &config.output.log_file);
    init_logging(cli.verbose, log_file.as_deref())?;

    let config = Arc::new(config);
    let mut status = StatusTracker::new(optional_path(&config, &config.output.status_file));

    let report = match block_on(execute(Arc::clone(&config), &cli, &mut status)) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            status.fail(&e.to_string());
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    status.phase(Phase::Exporting);
    let outcome = export_all(&report, &config.output);
    status.complete();

    print_summary(&report, &outcome);
    Ok(())
}

fn optional_path(config: &Config, file: &str) -> Option<std::path::PathBuf> {
    if file.trim().is_empty() {
        None
    } else {
        Some(config.output.path_for(file))
    }
}

/// Authenticate, resolve pricing and estimate every subscription
async fn execute(
    config: Arc<Config>,
    cli: &Cli,
    status: &mut StatusTracker,
) -> azcost::error::Result<CostReport> {
    let http = build_client(config.azure.request_timeout_secs)?;

    let source = match &cli.inventory {
        Some(path) => {
            let records = load_inventory(path)?;
            tracing::info!(file = %path.display(), records = records.len(), "Loaded inventory");
            DataSource::inventory(records)
        }
        None => {
            status.phase(Phase::Authenticating);
            let credential = Credential::from_env();
            let token = acquire_token(&credential, &http, &config.azure).await?;
            let client = ArmClient::new(http.clone(), token, config.azure.clone());
            DataSource::azure(client, &config).await
        }
    };

    status.phase(Phase::Pricing);
    let pricing = resolve_pricing(&config, &http).await;
    tracing::info!(source = %pricing.source, regions = pricing.regions.len(), "Pricing resolved");

    let options = RunOptions {
        subscription_id: cli.subscription_id.clone(),
        inventory: cli.inventory.clone(),
    };
    run(config, source, pricing, &options, status).await
}

fn print_summary(report: &CostReport, outcome: &ExportOutcome) {
    println!();
    println!("Azure log ingestion cost estimate");
    println!(
        "  Subscriptions: {}   Failed: {}   Pricing: {}",
        report.subscriptions.len(),
        report.failures.len(),
        report.pricing.source
    );
    println!("  Estimated monthly total: {}", format_currency(report.grand_total));

    if !report.top_subscriptions.is_empty() {
        println!();
        println!("Top subscriptions:");
        for top in report.top_subscriptions.iter().take(SUMMARY_ROWS) {
            println!(
                "  {:>2}. {:<40} {:>16}",
                top.rank,
                top.subscription_name,
                format_currency(top.monthly_cost)
            );
        }
    }

    for (key, groups) in report.groupings() {
        if groups.is_empty() {
            continue;
        }
        println!();
        println!("By {}:", key.title().to_lowercase());
        for group in groups.iter().take(SUMMARY_ROWS) {
            println!(
                "  {:<43} {:>16}  ({} subs)",
                group.label,
                format_currency(group.monthly_cost),
                group.subscription_count
            );
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("Failed subscriptions:");
        for failure in &report.failures {
            println!("  {}: {}", failure.subscription_name, failure.error);
        }
    }

    println!();
    for path in &outcome.written {
        println!("  wrote {}", path.display());
    }
    for (path, error) in &outcome.failed {
        println!("  FAILED {}: {}", path.display(), error);
    }
}
