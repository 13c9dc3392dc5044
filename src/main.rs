use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use customer_etl::app::notify_use_case::NotifyUseCase;
use customer_etl::app::transform_use_case::{InvocationResult, TransformUseCase};
use customer_etl::config::Config;
use customer_etl::constants;
use customer_etl::infra::fs_object_store::FsObjectStore;
use customer_etl::infra::log_notifier::LogNotifier;
use customer_etl::observability::metrics;
use customer_etl::logging;
use customer_etl::trigger::{ObjectLocation, TriggerEvent};

#[derive(Parser)]
#[command(name = "customer_etl")]
#[command(about = "Clean, enrich and validate one customer export per invocation")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the object store root directory
    #[arg(long)]
    store_root: Option<PathBuf>,

    /// Print the Prometheus metrics snapshot to stderr when done
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform one source object
    Run {
        /// Source bucket
        #[arg(long)]
        bucket: String,
        /// Source object key
        #[arg(long)]
        key: String,
        /// Reference "now" for the recency filter (RFC 3339); defaults to the wall clock
        #[arg(long)]
        reference_time: Option<DateTime<Utc>>,
    },
    /// Transform the object named by a storage notification JSON file
    Handle {
        /// Path to the notification JSON
        #[arg(long)]
        event: PathBuf,
        /// Reference "now" for the recency filter (RFC 3339); defaults to the wall clock
        #[arg(long)]
        reference_time: Option<DateTime<Utc>>,
    },
    /// Send balance notices for a transformed object, in name order
    Notify {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?
        .with_env_overrides()?;
    if let Some(root) = &cli.store_root {
        config.store.root = root.clone();
    }
    Ok(config)
}

fn print_result(result: &InvocationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_guard = logging::init_logging(&config.logging.dir);
    if let Err(e) = metrics::init() {
        warn!("Metrics disabled: {}", e);
    }

    let store = Arc::new(FsObjectStore::new(config.store.root.clone()));
    info!("Object store rooted at {}", store.root().display());

    let exit_code = match cli.command {
        Commands::Run { ref bucket, ref key, reference_time } => {
            let use_case = TransformUseCase::new(store, &config.pipeline);
            let event = TriggerEvent::for_object(bucket.clone(), key.clone());
            let result = use_case
                .handle(&event, reference_time.unwrap_or_else(Utc::now))
                .await;
            print_result(&result)?;
            i32::from(!result.is_success())
        }
        Commands::Handle { ref event, reference_time } => {
            let bytes = std::fs::read(event)
                .with_context(|| format!("Failed to read {}", event.display()))?;
            let use_case = TransformUseCase::new(store, &config.pipeline);
            let result = match TriggerEvent::from_json(&bytes) {
                Ok(event) => {
                    use_case
                        .handle(&event, reference_time.unwrap_or_else(Utc::now))
                        .await
                }
                Err(e) => InvocationResult::failure(&e),
            };
            print_result(&result)?;
            i32::from(!result.is_success())
        }
        Commands::Notify { ref bucket, ref key } => {
            let use_case = NotifyUseCase::new(store, Arc::new(LogNotifier));
            let summary = use_case
                .notify_object(&ObjectLocation::new(bucket.clone(), key.clone()))
                .await
                .context("Failed to send balance notices")?;
            println!("sent={} skipped={}", summary.sent, summary.skipped);
            0
        }
    };

    if cli.print_metrics {
        if let Some(snapshot) = metrics::render() {
            eprintln!("{}", snapshot);
        }
    }

    if exit_code != 0 {
        // process::exit skips destructors; flush the file log first
        drop(log_guard);
        std::process::exit(exit_code);
    }
    Ok(())
}
