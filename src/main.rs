use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use pricewarden::config::AppConfig;
use pricewarden::fetcher::PageFetcher;
use pricewarden::notifier::NotificationDispatcher;
use pricewarden::progress::SyncProgressTracker;
use pricewarden::reconciler::Reconciler;
use pricewarden::scheduler::{Scheduler, Task, Trigger};
use pricewarden::store::{SqliteStore, Store};
use pricewarden::PriceExtractor;

#[derive(Parser)]
#[command(name = "pricewarden")]
#[command(about = "Supplier price reconciliation and discrepancy alerting")]
struct Cli {
    /// Database connection string override
    #[arg(long)]
    database_url: Option<String>,

    /// Merchant store base URL override
    #[arg(long)]
    store_url: Option<String>,

    /// Merchant store API credential override
    #[arg(long)]
    store_api_key: Option<String>,

    /// Disable the recurring schedule
    #[arg(long)]
    no_scheduler: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the reconciliation service (default)
    Run,
    /// Execute a single tracked reconciliation run and exit
    Check,
    /// Show the latest progress record for a job type
    Progress { job_type: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewarden=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(url) = cli.store_url {
        config.store.url = url;
    }
    if let Some(key) = cli.store_api_key {
        config.store.api_key = Some(key);
    }
    if cli.no_scheduler {
        config.scheduler.enabled = false;
    }
    config.validate()?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&config.database).await?);
    let tracker = Arc::new(SyncProgressTracker::new(Arc::clone(&store)));
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store),
        PageFetcher::new(&config.fetcher)?,
        PriceExtractor::new(config.extractor.clone()),
        NotificationDispatcher::new(config.notifications.clone(), Arc::clone(&store)),
        config.reconciler.clone(),
    ));

    match cli.command.unwrap_or(Command::Run) {
        Command::Check => {
            let summary = reconciler.run_tracked(&tracker).await?;
            println!(
                "checked={} updated={} errors={}",
                summary.checked, summary.updated, summary.errors
            );
        }
        Command::Progress { job_type } => match tracker.get(&job_type).await? {
            Some(progress) => println!("{}", serde_json::to_string_pretty(&progress)?),
            None => println!("No progress recorded for {}", job_type),
        },
        Command::Run => {
            info!("Starting PriceWarden for {}", config.store.url);

            let scheduler = Scheduler::new();
            if config.scheduler.enabled {
                let task = reconciliation_task(Arc::clone(&reconciler), Arc::clone(&tracker));
                scheduler
                    .start_job(
                        "price-check",
                        Trigger::Interval {
                            every: Duration::from_secs(
                                config.scheduler.check_interval_minutes * 60,
                            ),
                        },
                        task,
                    )
                    .await;

                let task = reconciliation_task(Arc::clone(&reconciler), Arc::clone(&tracker));
                scheduler
                    .start_job(
                        "daily-price-check",
                        Trigger::DailyAt {
                            hour: config.scheduler.daily_check_hour,
                            minute: config.scheduler.daily_check_minute,
                            utc_offset_hours: config.scheduler.utc_offset_hours,
                        },
                        task,
                    )
                    .await;
            } else {
                info!("Scheduler disabled, running idle");
            }

            tokio::signal::ctrl_c().await?;
            info!("Shutting down...");
            scheduler.stop_all().await;
        }
    }

    Ok(())
}

fn reconciliation_task(reconciler: Arc<Reconciler>, tracker: Arc<SyncProgressTracker>) -> Task {
    Arc::new(move || {
        let reconciler = Arc::clone(&reconciler);
        let tracker = Arc::clone(&tracker);
        Box::pin(async move {
            reconciler.run_tracked(&tracker).await?;
            Ok(())
        })
    })
}
