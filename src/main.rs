use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fabric_blueprint::bulk::{self, BulkSummary, Workflow};
use fabric_blueprint::payloads::LagMode;
use fabric_blueprint::{list_blueprints, BlueprintHandle, Config, Outcome, Session};

#[derive(Parser)]
#[command(name = "fabric-blueprint", version, about = "Query and mutate fabric controller blueprints")]
struct Cli {
    #[command(flatten)]
    conn: Connection,

    #[command(subcommand)]
    cmd: Commands,
}

/// Overrides for the controller settings read from the environment
#[derive(Args)]
struct Connection {
    #[arg(long, global = true, env = "CONTROLLER_HOST")]
    host: Option<String>,
    #[arg(long, global = true, env = "CONTROLLER_PORT")]
    port: Option<u16>,
    #[arg(long, global = true, env = "CONTROLLER_USER")]
    user: Option<String>,
    #[arg(long, global = true, env = "CONTROLLER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity and list blueprints
    Check {
        /// Also resolve this blueprint label
        #[arg(long)]
        blueprint: Option<String>,
    },
    /// Create generic systems from a CSV file
    ImportGenericSystems {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Attach IP link templates and address them from a CSV file
    ImportIpLinks {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Create single-VLAN connectivity templates from a CSV file
    ImportVlanCts {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Bundle generic-system links into LAGs
    AssignLacp {
        #[arg(long)]
        blueprint: String,
        #[arg(long, default_value = "lacp_active")]
        lag_mode: LagMode,
        /// Generic system labels, numbered link1, link2, ... in this order
        #[arg(required = true)]
        systems: Vec<String>,
    },
    /// Move a virtual network into another routing zone
    RelocateVn {
        #[arg(long)]
        blueprint: String,
        /// Virtual network label or VNI
        #[arg(long)]
        vn: String,
        #[arg(long)]
        routing_zone: String,
    },
    /// Discard staged changes of a blueprint
    Revert {
        #[arg(long)]
        blueprint: String,
    },
}

impl Connection {
    fn apply(self, cfg: &mut Config) {
        if let Some(host) = self.host {
            cfg.host = host;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(user) = self.user {
            cfg.username = user;
        }
        if let Some(password) = self.password {
            cfg.password = password;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fabric_blueprint=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load();
    cli.conn.apply(&mut cfg);

    if cfg.host.is_empty() {
        anyhow::bail!("controller host not set (use --host or CONTROLLER_HOST)");
    }

    // Bulk inputs are validated before anything touches the controller
    let items = match &cli.cmd {
        Commands::ImportGenericSystems { file } => Some(read_input(Workflow::GenericSystems, file)?),
        Commands::ImportIpLinks { file } => Some(read_input(Workflow::IpLinks, file)?),
        Commands::ImportVlanCts { file } => Some(read_input(Workflow::VlanCts, file)?),
        _ => None,
    };

    tracing::info!("Connecting to {}", cfg.api_root());
    let session = Session::connect(&cfg)
        .await
        .with_context(|| format!("login to {} failed", cfg.host))?;

    let result = run(&session, cli.cmd, items).await;

    if let Err(e) = session.logout().await {
        tracing::warn!("Logout failed: {}", e);
    }
    let ok = result?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn read_input(workflow: Workflow, file: &Path) -> Result<Vec<bulk::BulkItem>> {
    bulk::read_items_from_path(workflow, file).with_context(|| format!("reading {}", file.display()))
}

/// Run one command; `Ok(false)` means it completed with per-item failures
async fn run(session: &Session, cmd: Commands, items: Option<Vec<bulk::BulkItem>>) -> Result<bool> {
    match cmd {
        Commands::Check { blueprint } => {
            let version = session.version().await?;
            println!("controller api version: {}", version.get("version").unwrap_or(&version));
            for bp in list_blueprints(session).await? {
                println!("{}\t{}", bp.id, bp.label);
            }
            if let Some(label) = blueprint {
                let bp = BlueprintHandle::open(session, &label).await?;
                println!("blueprint '{}' resolves to {}", bp.label(), bp.id());
            }
            Ok(true)
        }
        Commands::ImportGenericSystems { .. } | Commands::ImportIpLinks { .. } | Commands::ImportVlanCts { .. } => {
            let summary = BulkSummary::collect(bulk::run_bulk(session, items.unwrap_or_default())).await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(!summary.has_failures())
        }
        Commands::AssignLacp {
            blueprint,
            lag_mode,
            systems,
        } => {
            let bp = BlueprintHandle::open(session, &blueprint).await?;
            let labels: Vec<&str> = systems.iter().map(String::as_str).collect();
            report(bp.assign_lacp(&labels, lag_mode).await)
        }
        Commands::RelocateVn {
            blueprint,
            vn,
            routing_zone,
        } => {
            let bp = BlueprintHandle::open(session, &blueprint).await?;
            report(bp.relocate_virtual_network(&vn, &routing_zone).await)
        }
        Commands::Revert { blueprint } => {
            let bp = BlueprintHandle::open(session, &blueprint).await?;
            bp.revert().await?;
            println!("reverted staged changes of '{}'", blueprint);
            Ok(true)
        }
    }
}

fn report(outcome: Outcome) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(!outcome.is_failure())
}
