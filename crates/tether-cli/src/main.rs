use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether_core::app::{
    Engine, EngineBuilder, TaskProcessor, WorkerGroup, WorkerReport, WorkerView, parse_payload,
};
use tether_core::config::{EngineConfig, WorkerConfig};
use tether_core::domain::{QueueStats, TaskId, TaskStatus, WorkerId, WorkerRecord};
use tether_core::impls::{MemoryEventSink, SqliteStore};

#[derive(Parser)]
#[command(name = "tether")]
#[command(version)]
#[command(about = "Task queue with leases, worker fleet and lease recovery")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct EngineArgs {
    /// SQLite file shared by producers, workers and the janitor
    #[arg(long, env = "TETHER_DB", default_value = "tether.db")]
    db: PathBuf,

    #[arg(long, env = "TETHER_LEASE_TIMEOUT_SECS", default_value_t = 30)]
    lease_timeout_secs: u64,

    /// Rescues allowed before an expired task is abandoned
    #[arg(long, env = "TETHER_MAX_RETRIES", default_value_t = 1)]
    max_retries: u32,

    #[arg(long, env = "TETHER_SWEEP_INTERVAL_SECS", default_value_t = 30)]
    sweep_interval_secs: u64,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_lease_timeout(Duration::from_secs(self.lease_timeout_secs))
            .with_max_retries(self.max_retries)
            .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs))
    }

    fn open(&self) -> Result<Engine> {
        let store = SqliteStore::open(&self.db)
            .with_context(|| format!("open database {}", self.db.display()))?;
        let engine = EngineBuilder::sqlite(store)
            .config(self.config())
            .build()?;
        Ok(engine)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task; PAYLOAD is any JSON value
    Enqueue { payload: String },
    /// Show one task
    Status { task_id: String },
    /// Count tasks per status
    Stats,
    /// List tasks (failures first when unfiltered)
    List {
        /// pending | processing | success | failure
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Requeue a failed task with a fresh retry budget
    Retry { task_id: String },
    /// Requeue every failed task
    RetryAll,
    /// Reclaim expired leases until interrupted
    Janitor,
    /// Worker fleet commands
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },
    /// Run an in-memory fleet with misbehaving workers and print what happened
    Demo(DemoArgs),
}

#[derive(Subcommand)]
enum WorkerCommands {
    Register { name: String },
    List,
    Revoke { worker_id: String },
    Heartbeat { worker_id: String },
    /// Active workers without a heartbeat for THRESHOLD seconds
    Silent {
        #[arg(long, default_value_t = 120)]
        threshold_secs: u64,
    },
    /// Lease the next task as this worker
    Acquire { worker_id: String },
    Complete {
        worker_id: String,
        task_id: String,
        /// JSON result
        result: String,
    },
    Fail {
        worker_id: String,
        task_id: String,
        message: String,
    },
    /// Poll for tasks and echo their payloads until interrupted
    Run {
        worker_id: String,
        #[arg(long, default_value_t = 5000)]
        poll_interval_ms: u64,
        #[arg(long, default_value_t = 60)]
        heartbeat_interval_secs: u64,
    },
}

#[derive(Args)]
struct DemoArgs {
    #[arg(long, default_value_t = 4)]
    workers: usize,
    #[arg(long, default_value_t = 40)]
    tasks: usize,
    /// Probability that a worker stalls past its lease
    #[arg(long, default_value_t = 0.15)]
    stall_rate: f64,
    /// Probability that processing reports an error
    #[arg(long, default_value_t = 0.1)]
    fail_rate: f64,
    #[arg(long, default_value_t = 400)]
    lease_timeout_ms: u64,
    #[arg(long, default_value_t = 60)]
    deadline_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo(args) => run_demo_command(&cli.engine, args).await,
        Commands::Worker { command } => run_worker_command(&cli.engine, command).await,
        command => run_queue_command(&cli.engine, command).await,
    }
}

async fn run_queue_command(engine_args: &EngineArgs, command: Commands) -> Result<()> {
    let engine = engine_args.open()?;
    let queue = engine.queue();

    match command {
        Commands::Enqueue { payload } => {
            let task_id = queue.enqueue(parse_payload(&payload)?).await?;
            print_json(&serde_json::json!({ "task_id": task_id }))
        }
        Commands::Status { task_id } => print_json(&queue.get_status(parse_task_id(&task_id)?).await?),
        Commands::Stats => print_json(&queue.stats().await?),
        Commands::List { status, limit } => {
            let status = status
                .map(|s| s.parse::<TaskStatus>())
                .transpose()?;
            print_json(&queue.list_tasks(status, limit).await?)
        }
        Commands::Retry { task_id } => print_json(&queue.retry(parse_task_id(&task_id)?).await?),
        Commands::RetryAll => {
            let requeued = queue.retry_all_failed().await?;
            print_json(&serde_json::json!({ "requeued": requeued }))
        }
        Commands::Janitor => {
            let handle = engine.janitor().spawn();
            tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
            info!("shutdown requested");
            handle.shutdown_and_join().await;
            Ok(())
        }
        Commands::Worker { .. } | Commands::Demo(_) => Err(anyhow!("not a queue command")),
    }
}

async fn run_worker_command(engine_args: &EngineArgs, command: WorkerCommands) -> Result<()> {
    let engine = engine_args.open()?;
    let fleet = engine.fleet();
    let gateway = engine.gateway();

    match command {
        WorkerCommands::Register { name } => {
            print_json(&WorkerView::from(fleet.register_worker(&name).await?))
        }
        WorkerCommands::List => print_json(&worker_views(fleet.list_workers().await?)),
        WorkerCommands::Revoke { worker_id } => print_json(&WorkerView::from(
            fleet.revoke_worker(parse_worker_id(&worker_id)?).await?,
        )),
        WorkerCommands::Heartbeat { worker_id } => print_json(&WorkerView::from(
            gateway.heartbeat(parse_worker_id(&worker_id)?).await?,
        )),
        WorkerCommands::Silent { threshold_secs } => print_json(&worker_views(
            fleet
                .silent_workers(Duration::from_secs(threshold_secs))
                .await?,
        )),
        WorkerCommands::Acquire { worker_id } => {
            print_json(&gateway.acquire(parse_worker_id(&worker_id)?).await?)
        }
        WorkerCommands::Complete {
            worker_id,
            task_id,
            result,
        } => print_json(
            &gateway
                .complete(
                    parse_task_id(&task_id)?,
                    parse_worker_id(&worker_id)?,
                    parse_payload(&result)?,
                )
                .await?,
        ),
        WorkerCommands::Fail {
            worker_id,
            task_id,
            message,
        } => print_json(
            &gateway
                .fail(parse_task_id(&task_id)?, parse_worker_id(&worker_id)?, message)
                .await?,
        ),
        WorkerCommands::Run {
            worker_id,
            poll_interval_ms,
            heartbeat_interval_secs,
        } => {
            let config = WorkerConfig::default()
                .with_poll_interval(Duration::from_millis(poll_interval_ms))
                .with_heartbeat_interval(Duration::from_secs(heartbeat_interval_secs));
            config.validate()?;

            let worker_id = parse_worker_id(&worker_id)?;
            fleet.authorize(worker_id).await?;

            let group = WorkerGroup::spawn(vec![engine.worker_loop(
                worker_id,
                Arc::new(EchoProcessor),
                config,
            )]);
            tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
            info!("shutdown requested, finishing in-flight task");
            print_json(&group.shutdown_and_join().await)
        }
    }
}

/// `{"echo": payload}`
struct EchoProcessor;

#[async_trait]
impl TaskProcessor for EchoProcessor {
    async fn process(&self, payload: &serde_json::Value) -> Result<serde_json::Value, String> {
        Ok(serde_json::json!({ "echo": payload }))
    }
}

/// Randomly stalls past the lease or reports an error.
struct FlakyProcessor {
    stall_rate: f64,
    fail_rate: f64,
    stall_for: Duration,
}

#[async_trait]
impl TaskProcessor for FlakyProcessor {
    async fn process(&self, payload: &serde_json::Value) -> Result<serde_json::Value, String> {
        let roll: f64 = rand::random();
        if roll < self.stall_rate {
            tokio::time::sleep(self.stall_for).await;
            return Ok(serde_json::json!({ "late": payload }));
        }
        if roll < self.stall_rate + self.fail_rate {
            return Err("simulated processing error".to_string());
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(serde_json::json!({ "echo": payload }))
    }
}

#[derive(Serialize)]
struct DemoSummary {
    stats: QueueStats,
    workers: WorkerReport,
    rescued: usize,
    abandoned: usize,
    timed_out: bool,
}

async fn run_demo_command(engine_args: &EngineArgs, args: DemoArgs) -> Result<()> {
    if args.workers == 0 {
        return Err(anyhow!("--workers must be at least 1"));
    }

    let lease_timeout = Duration::from_millis(args.lease_timeout_ms);
    let events = MemoryEventSink::new();
    let engine = EngineBuilder::in_memory()
        .config(
            EngineConfig::default()
                .with_lease_timeout(lease_timeout)
                .with_max_retries(engine_args.max_retries)
                .with_sweep_interval(lease_timeout / 2),
        )
        .event_sink(Arc::new(events.clone()))
        .build()?;

    for i in 0..args.tasks {
        engine.queue().enqueue(serde_json::json!({ "n": i })).await?;
    }

    let processor = Arc::new(FlakyProcessor {
        stall_rate: args.stall_rate,
        fail_rate: args.fail_rate,
        stall_for: lease_timeout * 3,
    });
    let worker_config = WorkerConfig::default()
        .with_poll_interval(Duration::from_millis(50))
        .with_heartbeat_interval(Duration::from_secs(1))
        .with_error_backoff(Duration::from_millis(100));

    let mut loops = Vec::with_capacity(args.workers);
    for i in 0..args.workers {
        let worker = engine.fleet().register_worker(&format!("demo-{i}")).await?;
        loops.push(engine.worker_loop(worker.worker_id, processor.clone(), worker_config.clone()));
    }

    let janitor = engine.janitor().spawn();
    let group = WorkerGroup::spawn(loops);
    info!(workers = group.len(), tasks = args.tasks, "demo fleet started");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.deadline_secs);
    let timed_out = loop {
        let stats = engine.queue().stats().await?;
        if stats.pending == 0 && stats.in_flight == 0 {
            break false;
        }
        if tokio::time::Instant::now() >= deadline {
            break true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    let workers = group.shutdown_and_join().await;
    janitor.shutdown_and_join().await;

    print_json(&DemoSummary {
        stats: engine.queue().stats().await?,
        workers,
        rescued: events.count("task_rescued"),
        abandoned: events.count("task_abandoned"),
        timed_out,
    })
}

fn parse_task_id(s: &str) -> Result<TaskId> {
    s.parse().with_context(|| format!("invalid task id: {s}"))
}

fn parse_worker_id(s: &str) -> Result<WorkerId> {
    s.parse().with_context(|| format!("invalid worker id: {s}"))
}

fn worker_views(workers: Vec<WorkerRecord>) -> Vec<WorkerView> {
    workers.into_iter().map(WorkerView::from).collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
