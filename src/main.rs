use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Channel;
use tonic::Code;
use tracing_subscriber::EnvFilter;

use jobring::config::{CoordinatorConfig, RingConfig, WorkerConfig};
use jobring::node::CoordinatorNode;
use jobring::proto::coordinator_service_client::CoordinatorServiceClient;
use jobring::proto::{GetRingStatusRequest, SubmitJobRequest};
use jobring::shutdown::install_shutdown_handler;
use jobring::worker::{LoggingHandler, WorkerAgent};

#[derive(Parser, Debug)]
#[command(name = "jobring")]
#[command(version)]
#[command(about = "Slot-ring coordinator for file-based worker jobs")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the coordinator
    Coordinator(CoordinatorArgs),

    /// Run a worker agent against a coordinator
    Worker(WorkerArgs),

    /// Job submission commands
    Job {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: JobCommands,
    },

    /// Ring inspection commands
    Ring {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: RingCommands,
    },
}

// =============================================================================
// Coordinator Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct CoordinatorArgs {
    /// Address to listen on for gRPC
    #[arg(long, default_value = "127.0.0.1:8880")]
    listen: SocketAddr,

    /// Port for the HTTP dashboard (optional)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Number of slots in the ring (fixed for the coordinator's lifetime)
    #[arg(long, default_value = "12")]
    slots: usize,

    /// Heartbeat age after which a worker stops receiving new jobs
    #[arg(long, default_value = "5000")]
    soft_timeout_ms: u64,

    /// Heartbeat age after which a worker is evicted and its jobs rebalanced
    #[arg(long, default_value = "10000")]
    hard_timeout_ms: u64,

    /// Liveness monitor tick interval
    #[arg(long, default_value = "3000")]
    monitor_interval_ms: u64,
}

// =============================================================================
// Worker Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct WorkerArgs {
    /// Coordinator address
    #[arg(long, default_value = "http://127.0.0.1:8880")]
    coordinator: String,

    /// Address this worker registers under
    #[arg(long)]
    address: String,

    #[arg(long, default_value = "2000")]
    heartbeat_interval_ms: u64,

    #[arg(long, default_value = "1000")]
    pull_interval_ms: u64,
}

// =============================================================================
// Client Arguments (shared by job and ring commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Coordinator address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:8880")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum JobCommands {
    /// Submit one or more jobs by filename
    Submit {
        #[arg(required = true)]
        filenames: Vec<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum RingCommands {
    /// Show every slot in the ring
    Status,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct JobSubmitOutput {
    filename: String,
    slot: Option<u32>,
    error: Option<String>,
}

#[derive(Serialize)]
struct SlotOutput {
    index: u32,
    address: Option<String>,
    eligible: bool,
    queued_jobs: u32,
    heartbeat_age_ms: Option<i64>,
}

#[derive(Serialize)]
struct RingStatusOutput {
    slots: Vec<SlotOutput>,
    lost_jobs: u64,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn connect(args: &ClientArgs) -> Result<CoordinatorServiceClient<Channel>, Box<dyn std::error::Error>> {
    let channel = Channel::from_shared(args.addr.clone())?.connect().await?;
    Ok(CoordinatorServiceClient::new(channel))
}

// =============================================================================
// Coordinator and Worker
// =============================================================================

async fn run_coordinator(args: CoordinatorArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let ring = RingConfig::new(args.slots)
        .with_timeouts(args.soft_timeout_ms, args.hard_timeout_ms)
        .with_monitor_interval(args.monitor_interval_ms);

    let mut config = CoordinatorConfig::new(args.listen, ring);
    if let Some(port) = args.dashboard_port {
        config = config.with_dashboard(SocketAddr::new(args.listen.ip(), port));
    }

    tracing::info!(
        listen_addr = %config.listen_addr,
        dashboard_addr = ?config.dashboard_addr,
        slots = config.ring.slot_count,
        soft_timeout_ms = config.ring.soft_timeout_ms,
        hard_timeout_ms = config.ring.hard_timeout_ms,
        monitor_interval_ms = config.ring.monitor_interval_ms,
        "Starting coordinator"
    );

    let shutdown = install_shutdown_handler();
    let node = CoordinatorNode::new(config)?;
    node.run(shutdown).await?;
    Ok(())
}

async fn run_worker(args: WorkerArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = WorkerConfig::new(args.coordinator, args.address)
        .with_intervals(args.heartbeat_interval_ms, args.pull_interval_ms);

    tracing::info!(
        coordinator = %config.coordinator_addr,
        address = %config.address,
        "Starting worker"
    );

    let handler = Arc::new(LoggingHandler::new(config.address.clone()));
    let shutdown = install_shutdown_handler();
    let agent = WorkerAgent::connect(config, handler).await?;
    agent.run(shutdown).await;
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_job_submit(
    client: &mut CoordinatorServiceClient<Channel>,
    filenames: Vec<String>,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut outputs = Vec::with_capacity(filenames.len());
    let mut failed = false;

    for filename in filenames {
        match client
            .submit_job(SubmitJobRequest {
                filename: filename.clone(),
            })
            .await
        {
            Ok(response) => outputs.push(JobSubmitOutput {
                filename,
                slot: Some(response.into_inner().slot),
                error: None,
            }),
            Err(status) => {
                failed = true;
                let error = if status.code() == Code::Unavailable {
                    format!("{} (retry after backoff)", status.message())
                } else {
                    status.message().to_string()
                };
                outputs.push(JobSubmitOutput {
                    filename,
                    slot: None,
                    error: Some(error),
                });
            }
        }
    }

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        OutputFormat::Table => {
            println!("{:<30} RESULT", "FILENAME");
            println!("{}", "-".repeat(50));
            for out in &outputs {
                match (&out.slot, &out.error) {
                    (Some(slot), _) => println!("{:<30} slot {}", out.filename, slot),
                    (None, Some(e)) => println!("{:<30} failed: {}", out.filename, e),
                    (None, None) => println!("{:<30} unknown", out.filename),
                }
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn handle_ring_status(
    client: &mut CoordinatorServiceClient<Channel>,
    output_format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .get_ring_status(GetRingStatusRequest {})
        .await?
        .into_inner();

    match output_format {
        OutputFormat::Json => {
            let output = RingStatusOutput {
                lost_jobs: response.lost_jobs,
                slots: response
                    .slots
                    .into_iter()
                    .map(|s| {
                        let bound = !s.address.is_empty();
                        SlotOutput {
                            index: s.index,
                            address: bound.then_some(s.address),
                            eligible: s.eligible,
                            queued_jobs: s.queued_jobs,
                            heartbeat_age_ms: bound.then_some(s.heartbeat_age_ms),
                        }
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("Ring Status");
            println!("{}", "=".repeat(60));
            println!("{:<6} {:<25} {:<10} {:<7} AGE", "SLOT", "ADDRESS", "STATE", "QUEUED");
            println!("{}", "-".repeat(60));
            for slot in response.slots {
                if slot.address.is_empty() {
                    println!("{:<6} {:<25} {:<10} {:<7} -", slot.index, "-", "empty", 0);
                    continue;
                }
                let state = if slot.eligible { "[+] live" } else { "[-] stale" };
                println!(
                    "{:<6} {:<25} {:<10} {:<7} {}ms",
                    slot.index, slot.address, state, slot.queued_jobs, slot.heartbeat_age_ms
                );
            }
            println!();
            println!("Jobs lost to evictions: {}", response.lost_jobs);
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Coordinator(coordinator_args) => {
            run_coordinator(coordinator_args).await?;
        }
        Commands::Worker(worker_args) => {
            run_worker(worker_args).await?;
        }
        Commands::Job { client, command } => {
            let mut grpc_client = connect(&client).await?;
            match command {
                JobCommands::Submit { filenames } => {
                    handle_job_submit(&mut grpc_client, filenames, &client.output).await?;
                }
            }
        }
        Commands::Ring { client, command } => {
            let mut grpc_client = connect(&client).await?;
            match command {
                RingCommands::Status => {
                    handle_ring_status(&mut grpc_client, &client.output).await?;
                }
            }
        }
    }

    Ok(())
}
