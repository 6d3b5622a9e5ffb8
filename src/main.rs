use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use utility_work_orders::config::WorkOrderEngineConfig;
use utility_work_orders::conflict::ConflictEngine;
use utility_work_orders::persistence::{load_store, save_store, FileSnapshotPersistence};
use utility_work_orders::telemetry::init_telemetry;
use utility_work_orders::{CreateWorkOrder, Role, WorkOrderId, WorkOrderService, WorkOrderStatus};

#[derive(Parser)]
#[command(name = "work-orders")]
#[command(about = "Admit, approve and track utility work orders")]
#[command(long_about = "Planners request work at a site, managers approve or reject it and field \
                       technicians carry it out. New requests that overlap active work are \
                       flagged as conflicts at admission.")]
struct Cli {
    /// Override the snapshot file from configuration
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request new work at a location (planner)
    Create {
        #[arg(long)]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Radius of the work zone in meters
        #[arg(long)]
        radius: f64,
        #[arg(long, default_value = "planner")]
        role: Role,
    },
    /// List every work order in creation order
    List,
    /// Show a single work order
    Get { id: WorkOrderId },
    /// Request a status change, e.g. `status 3 APPROVED --role manager`
    Status {
        id: WorkOrderId,
        status: WorkOrderStatus,
        #[arg(long)]
        role: Role,
    },
    /// Re-run conflict detection for a blocked order (manager)
    Reevaluate {
        id: WorkOrderId,
        #[arg(long, default_value = "manager")]
        role: Role,
    },
    /// Manager approval queue
    Queue,
    /// Field technician board
    Board,
    /// All orders, newest first
    Calendar,
    /// Print the effective configuration as TOML, or write it to a file
    Config {
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

impl Commands {
    fn mutates_store(&self) -> bool {
        matches!(
            self,
            Commands::Create { .. } | Commands::Status { .. } | Commands::Reevaluate { .. }
        )
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = WorkOrderEngineConfig::load_env_file();
    let config = WorkOrderEngineConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.observability)?;

    if let Commands::Config { write } = &cli.command {
        return match write {
            Some(path) => {
                config.save_to_file(path)?;
                tracing::info!(path = %path.display(), "Configuration written");
                Ok(())
            }
            None => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        };
    }

    let snapshot_path = cli
        .snapshot
        .clone()
        .unwrap_or_else(|| config.storage.snapshot_path.clone());
    let persistence = FileSnapshotPersistence::new(snapshot_path);

    // Held from load to save so concurrent runs see each other's writes
    let mut snapshot_lock = persistence.lock()?;
    let lock_path = snapshot_lock.path().to_path_buf();
    let _guard = snapshot_lock
        .acquire()
        .with_context(|| format!("Failed to lock {}", lock_path.display()))?;

    let store = Arc::new(
        load_store(&persistence)
            .await
            .with_context(|| format!("Failed to load {}", persistence.path().display()))?,
    );
    let engine = ConflictEngine::with_protected_assets(config.conflict.protected_assets.clone())
        .context("Invalid protected asset in configuration")?;
    let service = WorkOrderService::new(store.clone(), engine);

    let output = match &cli.command {
        Commands::Create {
            description,
            lat,
            lon,
            radius,
            role,
        } => {
            let request = CreateWorkOrder::new(description.clone(), *lat, *lon, *radius);
            to_json(&service.create_work_order(*role, request)?)?
        }
        Commands::List => to_json(&service.list_work_orders())?,
        Commands::Get { id } => to_json(&service.get_work_order(*id)?)?,
        Commands::Status { id, status, role } => {
            to_json(&service.update_status(*id, *status, *role)?)?
        }
        Commands::Reevaluate { id, role } => to_json(&service.reevaluate(*id, *role)?)?,
        Commands::Queue => to_json(&service.approval_queue())?,
        Commands::Board => to_json(&service.field_tech_board())?,
        Commands::Calendar => to_json(&service.calendar())?,
        // Handled before the store is loaded
        Commands::Config { .. } => return Ok(()),
    };

    if cli.command.mutates_store() {
        save_store(&persistence, &store)
            .await
            .with_context(|| format!("Failed to save {}", persistence.path().display()))?;
    }
    println!("{output}");
    service.metrics().log_stats();
    Ok(())
}
