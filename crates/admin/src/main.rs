use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use storage::{
    Database,
    models::FilterTuple,
    repository::{RankingsCacheRepository, RankingsJobRepository, RecordRepository},
    services::{JobCoordinator, Materializer},
    traits::{CacheStore, JobStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "swim-admin")]
#[command(about = "Swim rankings cache and job administration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Rebuild the cache for a filter tuple right away, without queueing a job
    Materialize {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value_t = 30)]
        fetch_timeout_secs: u64,
    },
    /// Queue a materialization job for the API workers
    Submit {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Run pending jobs in this process until none are left
    Work {
        #[arg(long, default_value_t = 30)]
        fetch_timeout_secs: u64,
    },
    /// Show recent jobs, or a single job
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Mark jobs stuck in running as failed so their tuples can be rebuilt
    FailStuck {
        /// Fail this running job regardless of its age
        #[arg(long)]
        id: Option<Uuid>,

        #[arg(long, default_value_t = 900)]
        older_than_secs: u64,
    },
    /// Delete every cached ranking row
    ClearCache {
        /// Required; this cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    stroke: String,

    #[arg(long)]
    distance: u16,

    #[arg(long)]
    course: String,

    #[arg(long, default_value = "all")]
    gender: String,

    #[arg(long, default_value = "all")]
    age_group: String,

    #[arg(long, default_value = "all")]
    region: String,

    #[arg(long, default_value = "all")]
    lsc: String,

    #[arg(long, default_value = "all")]
    season: String,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<FilterTuple, Box<dyn std::error::Error>> {
        let filter = FilterTuple::from_parts(
            &self.stroke,
            self.distance,
            &self.course,
            &self.gender,
            &self.age_group,
            &self.region,
            &self.lsc,
            &self.season,
        )?;
        Ok(filter)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("swim_admin={},storage={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::new(&cli.database_url).await?;

    match cli.command {
        Commands::Migrate => {
            db.run_migrations().await?;
            tracing::info!("✓ Migrations applied");
        }
        Commands::Materialize {
            filter,
            fetch_timeout_secs,
        } => {
            let filter = filter.to_filter()?;
            let total = materializer(&db, fetch_timeout_secs)
                .materialize_job(&filter)
                .await?;
            tracing::info!("✓ Cached {} rows for {}", total, filter);
        }
        Commands::Submit { filter } => {
            let job = coordinator(&db).submit(filter.to_filter()?).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Commands::Work { fetch_timeout_secs } => {
            let processed = coordinator(&db)
                .run_pending(&materializer(&db, fetch_timeout_secs))
                .await?;
            tracing::info!("✓ Processed {} jobs", processed);
        }
        Commands::Jobs { limit, id } => {
            let coordinator = coordinator(&db);
            match id {
                Some(id) => {
                    let job = coordinator.get(id).await?;
                    println!("{}", serde_json::to_string_pretty(&job)?);
                }
                None => {
                    for job in coordinator.list(limit).await? {
                        println!(
                            "{}  {:<9}  {:>6}  {}  {}",
                            job.id,
                            job.status,
                            job.total_records
                                .map(|n| n.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                            job.created_at.format("%Y-%m-%d %H:%M:%S"),
                            job.filter_key
                        );
                    }
                }
            }
        }
        Commands::FailStuck {
            id,
            older_than_secs,
        } => {
            let coordinator = coordinator(&db);
            match id {
                Some(id) => {
                    let job = coordinator.store().fail(id, "failed by operator").await?;
                    tracing::warn!("Marked job {} ({}) as failed", job.id, job.filter_key);
                }
                None => {
                    let expired = coordinator
                        .expire_stale(Duration::from_secs(older_than_secs))
                        .await?;
                    tracing::info!("✓ Failed {} stuck jobs", expired.len());
                }
            }
        }
        Commands::ClearCache { yes } => {
            if !yes {
                return Err("refusing to clear the rankings cache without --yes".into());
            }
            let removed = RankingsCacheRepository::new(db.pool()).clear_all().await?;
            tracing::warn!("Cleared {} cached ranking rows", removed);
        }
    }

    Ok(())
}

fn materializer(db: &Database, fetch_timeout_secs: u64) -> Materializer {
    Materializer::new(
        Arc::new(RecordRepository::new(db.pool())),
        Arc::new(RankingsCacheRepository::new(db.pool())),
    )
    .with_fetch_timeout(Duration::from_secs(fetch_timeout_secs))
}

fn coordinator(db: &Database) -> JobCoordinator {
    let jobs: Arc<dyn JobStore> = Arc::new(RankingsJobRepository::new(db.pool()));
    JobCoordinator::new(jobs)
}
