use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traxcry::client::{CoinGeckoClient, SpotRestClient};
use traxcry::config::ScreenerConfig;
use traxcry::core::constants::DEFAULT_CONFIG_PATH;
use traxcry::scout::VolumeScanner;
use traxcry::util::print_report;

#[derive(Parser, Debug)]
#[command(name = "traxcry", about = "Screens exchange pairs for daily volume spikes")]
struct Args {
    /// TOML configuration file; defaults apply when it is missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Maximum candle requests in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn init_tracing() -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", "traxcry.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    // Console output goes to stderr so --json stays machine readable
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Keep the file writer alive for the whole process
    std::mem::forget(guard);

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let mut config = ScreenerConfig::load(&args.config)?;
    if let Some(concurrency) = args.concurrency {
        config.scan.concurrency = concurrency;
    }
    config.validate()?;

    let exchange = SpotRestClient::from_config(&config)?;
    let metadata = CoinGeckoClient::from_config(&config)?;

    info!(
        exchange = %config.exchange.id,
        max_market_cap = config.filter.max_market_cap,
        min_daily_volume = config.filter.min_daily_volume,
        days = config.spike.days,
        ratio_threshold = config.spike.ratio_threshold,
        max_price_change_pct = config.spike.max_price_change_pct,
        concurrency = config.scan.concurrency,
        "Starting volume spike screen"
    );

    let scanner = VolumeScanner::new(&config, Arc::new(exchange), Arc::new(metadata));
    let report = scanner.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialise logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("Screening aborted: {:#}", e);
        std::process::exit(1);
    }
}
