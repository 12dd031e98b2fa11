use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

mod cli;

use cli::Cli;
use cli::commands::{Commands, WatchArgs};
use storewatch::codec::{IdFormat, encode_record_id, encode_sequence_str};
use storewatch::config::Config;
use storewatch::monitor::{IterationStats, Monitor, MonitorSettings};
use storewatch::probe::{HttpStoreClient, ProbeRequest};
use storewatch::report::{ConsoleReporter, Level, LogReporter, Reporter};
use storewatch::rpc::HttpRpcClient;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storewatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("storewatch.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: Config) -> Result<i32> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_watch_command(cli, &WatchArgs::default(), config).await,
        Some(Commands::Watch(args)) => handle_watch_command(cli, args, config).await,
        Some(Commands::Encode {
            value,
            checkpoint,
            hex,
        }) => {
            handle_encode_command(value, *checkpoint, *hex, &config)?;
            Ok(0)
        }
    }
}

async fn handle_watch_command(cli: &Cli, args: &WatchArgs, mut config: Config) -> Result<i32> {
    args.apply(&mut config);
    let settings = MonitorSettings::from_config(&config).context("Invalid configuration")?;

    let reporter: Arc<dyn Reporter> = if cli.quiet {
        Arc::new(LogReporter)
    } else {
        Arc::new(ConsoleReporter::new(cli.is_verbose()))
    };

    reporter.emit(Level::Info, "Store watch starting");
    reporter.emit(Level::Info, &format!("  - Nodes: {}", settings.endpoints.len()));
    for endpoint in &settings.endpoints {
        reporter.emit(Level::Info, &format!("      {}", endpoint));
    }
    reporter.emit(Level::Info, &format!("  - Query: {:?}", settings.query));
    reporter.emit(Level::Info, &format!("  - Store: {}", settings.store_base_url));
    reporter.emit(
        Level::Info,
        &format!(
            "  - Timeouts: store {:.2}s, rpc {:.2}s",
            settings.store_timeout.as_secs_f64(),
            settings.rpc_timeout.as_secs_f64()
        ),
    );
    reporter.emit(
        Level::Info,
        &format!("  - Loop delay: {:.2}s", settings.loop_delay.as_secs_f64()),
    );
    reporter.emit(Level::Info, "  - Retry: none (a fatal response stops the run)");

    let rpc = Arc::new(HttpRpcClient::new().context("Failed to create RPC client")?);
    let store = Arc::new(HttpStoreClient::new().context("Failed to create store client")?);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current iteration");
            let _ = cancel_tx.send(true);
        }
        // A second interrupt abandons the in-flight iteration
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt, exiting immediately");
            std::process::exit(0);
        }
    });

    let monitor = Monitor::new(rpc, store, settings, reporter);
    let mut stats = IterationStats::new();
    let reason = monitor.run(&mut stats, cancel_rx).await;

    Ok(reason.exit_code())
}

fn handle_encode_command(value: &str, checkpoint: bool, hex: bool, config: &Config) -> Result<()> {
    info!("Encoding {} (checkpoint: {}, hex: {})", value, checkpoint, hex);

    let key = if checkpoint {
        encode_sequence_str(value)?
    } else {
        let format = if hex { IdFormat::Hex } else { config.rpc.id_format };
        encode_record_id(value, format)?
    };

    println!("{} {}", "Lookup key:".green(), key);
    println!("{} {}", "Raw bytes:".green(), hex::encode(key.to_bytes()));
    for resource in config
        .store
        .resources
        .iter()
        .filter(|r| r.is_checkpoint_keyed() == checkpoint)
    {
        let request = ProbeRequest::new(key.clone(), *resource, value);
        println!("  {:<22} {}", resource.display_name(), request.url(&config.store.base_url));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    let code = run_application(&cli, config).await.context("Application failed")?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
