//! connwatch Binary Entry Point
//!
//! `connwatch monitor` probes hosts and appends observations to a log file.
//! `connwatch analyze` reads a log back and prints a report.
//! Core functionality is provided by the `connwatch` library crate.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use connwatch::{
    Dialect, LogReader, LogWriter, Report, Scheduler,
    config::{AppConfig, parse_duration, parse_session_duration},
    record::{LEGACY_HOST, validate_host},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// connwatch - Connectivity Monitor
#[derive(Parser, Debug)]
#[command(name = "connwatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "CONNWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe hosts periodically and log each observation
    Monitor(MonitorArgs),
    /// Summarize a connectivity log
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Host to probe; repeat for several (overrides config file)
    #[arg(long = "host", value_name = "HOST", env = "CONNWATCH_HOSTS", value_delimiter = ',')]
    hosts: Vec<String>,

    /// Time between passes, e.g. `1s`, `500ms`
    #[arg(long, value_parser = parse_duration, env = "CONNWATCH_INTERVAL")]
    interval: Option<Duration>,

    /// Session length, e.g. `1h`, or `forever`
    #[arg(long, value_parser = parse_session_length, env = "CONNWATCH_DURATION")]
    duration: Option<SessionLength>,

    /// Upper bound on a single probe
    #[arg(long, value_parser = parse_duration, env = "CONNWATCH_TIMEOUT")]
    timeout: Option<Duration>,

    /// Ping output dialect (`unix` or `windows`)
    #[arg(long, env = "CONNWATCH_DIALECT")]
    dialect: Option<Dialect>,

    /// Log file path
    #[arg(long, env = "CONNWATCH_LOG_FILE")]
    log_file: Option<String>,

    /// Keep existing log content instead of starting fresh
    #[arg(long)]
    append: bool,

    /// Flush every line to disk with fsync
    #[arg(long)]
    sync: bool,
}

/// Bounded session length, or `None` for `forever`.
#[derive(Debug, Clone, Copy)]
struct SessionLength(Option<Duration>);

fn parse_session_length(s: &str) -> Result<SessionLength, String> {
    parse_session_duration(s).map(SessionLength)
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Log file path
    #[arg(long, env = "CONNWATCH_LOG_FILE")]
    log_file: Option<String>,

    /// Print a section per host
    #[arg(long)]
    by_host: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Host assigned to lines written without a host field
    #[arg(long, default_value = LEGACY_HOST, value_parser = parse_legacy_host)]
    legacy_host: String,
}

fn parse_legacy_host(s: &str) -> Result<String, String> {
    validate_host(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,connwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file, if any
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Monitor(args) => monitor(config, args).await,
        Command::Analyze(args) => analyze(config, args),
    }
}

/// Run one monitoring session until its duration elapses or a signal arrives.
async fn monitor(
    mut config: AppConfig,
    args: MonitorArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    // Apply CLI/env overrides (CLI > ENV > config file)
    if !args.hosts.is_empty() {
        config.monitor.hosts = args.hosts;
    }
    if let Some(interval) = args.interval {
        config.monitor.interval = interval;
    }
    if let Some(SessionLength(duration)) = args.duration {
        config.monitor.duration = duration;
    }
    if let Some(timeout) = args.timeout {
        config.probe.timeout = timeout;
    }
    if let Some(dialect) = args.dialect {
        config.probe.dialect = Some(dialect);
    }
    if let Some(path) = args.log_file {
        config.log.path = path;
    }
    config.log.append |= args.append;
    config.log.sync |= args.sync;
    config.validate()?;

    let prober = config.probe.build_prober();
    tracing::info!(
        "Probe: {} ({}), timeout {}",
        config.probe.program,
        prober.dialect(),
        humantime::format_duration(config.probe.timeout),
    );

    let log_path = config.log.resolved_path();
    let writer = LogWriter::open(&log_path, config.log.open_mode())?.with_sync_data(config.log.sync);

    let mut scheduler = Scheduler::new(config.monitor, prober, writer)?;
    tracing::info!("Press Ctrl+C to stop");

    // Appends are synchronous, so dropping the session future never leaves
    // a partial line behind.
    let outcome = tokio::select! {
        result = scheduler.run() => Some(result),
        _ = shutdown_signal() => None,
    };

    match outcome {
        Some(Ok(report)) => {
            tracing::info!(
                "Session {}: {} passes, {} online, {} offline",
                report.state,
                report.passes,
                report.online,
                report.offline
            );
        }
        Some(Err(e)) => return Err(e.into()),
        None => {
            tracing::info!(
                "Session stopped: {} observations written to {}",
                scheduler.writer().lines_written(),
                log_path.display()
            );
        }
    }

    Ok(())
}

/// Read a log file and print its report.
fn analyze(config: AppConfig, args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = match args.log_file {
        Some(path) => PathBuf::from(path),
        None => config.log.resolved_path(),
    };

    let reader = LogReader::open(&path)?.with_legacy_host(args.legacy_host);

    let (observations, stats) = reader.read_all()?;
    if stats.skipped > 0 {
        tracing::warn!("Skipped {} malformed lines in {}", stats.skipped, path.display());
    }

    let report = Report::new(observations, stats);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("No data in {}", path.display());
        return Ok(());
    }

    print_report(&report, &path, args.by_host);
    Ok(())
}

fn print_report(report: &Report, path: &std::path::Path, by_host: bool) {
    println!("Connectivity report for {}", path.display());
    println!(
        "Lines parsed: {}, skipped: {}",
        report.stats.parsed, report.stats.skipped
    );
    println!();
    println!("{}", report.overall);

    if by_host {
        for (host, summary) in &report.hosts {
            println!();
            println!("[{host}]");
            println!("{summary}");
        }
    }

    println!();
    if report.outages.is_empty() {
        println!("No outages");
    } else {
        println!("Outages ({}):", report.outages.len());
        for outage in &report.outages {
            println!("  {outage}");
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
