//! foldmon binary
//!
//! Connects to one Folding@Home client, subscribes to its status feeds and
//! logs what it reports. Reconnects after network failures.
//!
//! Usage:
//!   foldmon [host] [port] [password]

mod config;
mod monitor;

use config::MonitorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("foldmon - Monitor a Folding@Home client");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  foldmon [host] [port] [password]");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FOLDMON_HOST         Client host (default: 127.0.0.1)");
    eprintln!("  FOLDMON_PORT         Command port (default: 36330)");
    eprintln!("  FOLDMON_PASSWORD     Command password (default: none)");
    eprintln!("  FOLDMON_UPDATE_SECS  Refresh interval in seconds (default: 5)");
    eprintln!("  RUST_LOG             Log filter (default: foldmon=info,foldmon_client=info)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foldmon=info,foldmon_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("-h" | "--help" | "help")) {
        print_usage();
        return Ok(());
    }

    let config = match MonitorConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Monitoring {}:{} (updates every {:?})",
        config.host,
        config.port,
        config.update_interval
    );

    monitor::run(config).await
}
