//! Dashgate - Entry Point
//!
//! Serves the dashboard behind the access gate and, when `WEBHOOK_URL` is set,
//! runs the daily password notifier alongside it.

use dashgate::dashboard::shutdown_signal;
use dashgate::{Config, DailyNotifier, DashboardServer};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Dashgate v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let notifier_handle = match DailyNotifier::from_config(&config) {
        Some(notifier) => Arc::new(notifier).schedule(shutdown_rx),
        None => {
            warn!("WEBHOOK_URL not set - daily password notifier disabled");
            None
        }
    };

    let server = DashboardServer::new(&config);
    let result = server
        .run_until(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await;

    if let Some(handle) = notifier_handle {
        handle.abort();
    }

    result.map_err(|e| anyhow::anyhow!(e))
}

fn print_help() {
    println!("Dashgate v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: dashgate [--help]");
    println!();
    println!("Environment variables:");
    println!("  TIMEZONE             IANA zone for rotation and schedule (default: UTC)");
    println!("  BASIC_AUTH_USER      Required username (default: admin)");
    println!("  PASSWORD_MODE        DAILY or STATIC (default: DAILY)");
    println!("  DAILY_SECRET         Prefix of the daily password");
    println!("  STATIC_PASSWORD      Password in STATIC mode");
    println!("  PASSWORD_GRACE       Accept yesterday's password (default: false)");
    println!("  ALLOWED_IPS          Comma-separated CIDR list (default: 127.0.0.1/32)");
    println!("  WEBHOOK_URL          Daily password notification endpoint");
    println!("  NOTIFY_TIME          Local HH:MM of the notification (default: 09:00)");
    println!("  DASHBOARD_BIND_ADDR  Listen address (default: 0.0.0.0)");
    println!("  DASHBOARD_PORT       Listen port (default: 8080)");
    println!("  LOG_FORMAT           'json' for structured logs");
}
