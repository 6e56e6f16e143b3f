use std::path::PathBuf;

use clap::Parser;
use co2mini_exporter::{Config, HidApiTransport, MetricsRegistry, MonitorLoop, server};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "co2mini-exporter")]
#[command(about = "Prometheus exporter for co2mini USB CO2 monitors")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "co2mini-exporter.toml")]
    config: PathBuf,
}

// hidapi calls use block_in_place, which needs the multi-threaded runtime.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "co2mini_exporter=info,co2mini_core=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };
    config.apply_env()?;

    let metrics = MetricsRegistry::new()?;

    let http_addr = config.server.http_addr();
    let listener = TcpListener::bind(http_addr).await?;
    info!(port = config.server.port, "Exporter listening");
    info!(
        interval_secs = config.monitor.poll_interval().as_secs_f64(),
        "Polling interval"
    );

    let metrics_for_http = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(listener, metrics_for_http).await {
            error!(error = ?e, "HTTP server error");
        }
    });

    let transport = HidApiTransport::new()?;
    let mut monitor = MonitorLoop::new(transport, metrics, config.monitor);

    // Never cancelled: the exporter runs until the process is terminated.
    let cancel = CancellationToken::new();
    monitor.run(cancel).await;

    Ok(())
}
