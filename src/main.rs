//! txstream binary entry point
//!
//! Runs the detection loop until interrupted (Ctrl-C) or until
//! `max_observations` is reached.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use txstream_rs::config::{write_sample_config, ConfigLoader};
use txstream_rs::history::load_history;
use txstream_rs::logging::init_logging;
use txstream_rs::sink::{spawn_presenter, ChannelSink, ChartSink, FanoutSink, LogSink, RollingChart};
use txstream_rs::StreamController;

/// Streaming transaction anomaly detector
#[derive(Parser, Debug)]
#[command(name = "txstream")]
#[command(about = "Flags anomalous transaction values in a simulated stream", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TXSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Historical CSV used to pre-train the detector
    #[arg(long)]
    history: Option<PathBuf>,

    /// Column of the historical CSV to read
    #[arg(long)]
    history_column: Option<String>,

    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many observations
    #[arg(long)]
    max_observations: Option<u64>,

    /// Pacing delay between observations in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Log level or filter expression
    #[arg(long)]
    log_level: Option<String>,

    /// Disable the live terminal chart
    #[arg(long)]
    no_chart: bool,

    /// Write a sample configuration file and exit
    #[arg(long, value_name = "PATH")]
    generate_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.generate_config {
        write_sample_config(path)?;
        println!("sample configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = ConfigLoader::new()
        .load_from_file(cli.config.as_deref())
        .load_from_env()
        .build()?;

    if let Some(path) = cli.history {
        config.history_path = Some(path);
    }
    if let Some(column) = cli.history_column {
        config.history_column = Some(column);
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.max_observations.is_some() {
        config.max_observations = cli.max_observations;
    }
    if let Some(ms) = cli.pacing_ms {
        config.pacing_delay_ms = ms;
    }
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    let chart_enabled = !cli.no_chart;
    if chart_enabled {
        // チャートが端末を使うのでログはファイルへ
        config.log.console_enabled = false;
    }
    config.validate().context("Configuration rejected")?;

    let log_handle = init_logging(&config.log)?;

    let history = match &config.history_path {
        Some(path) => match load_history(path, config.history_column.as_deref()) {
            Ok(values) => Some(values),
            Err(e) => {
                warn!(error = %e, "historical dataset unavailable");
                None
            }
        },
        None => None,
    };

    let mut sinks = FanoutSink::new().with(LogSink::new());
    let presenter = if chart_enabled {
        let (channel, receiver) = ChannelSink::new(config.sink_queue_capacity);
        sinks = sinks.with(channel);
        Some(spawn_presenter(
            receiver,
            ChartSink::new(RollingChart::default(), std::io::stdout()),
        ))
    } else {
        None
    };

    let mut controller = StreamController::from_config(&config, sinks);
    controller.bootstrap(history.as_deref());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let stats = controller.run(shutdown).await;

    // 送信側を閉じて描画タスクを終わらせる
    drop(controller);
    if let Some(handle) = presenter {
        match handle.await {
            Ok(rendered) => info!(rendered, "presenter finished"),
            Err(e) => warn!(error = %e, "presenter task failed"),
        }
    }

    info!(summary = %serde_json::to_string(&stats)?, "run summary");
    log_handle.shutdown();
    Ok(())
}
