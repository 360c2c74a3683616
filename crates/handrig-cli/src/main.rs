//! Handrig - Main entry point
//!
//! Inspects rig joint bindings and replays recorded tracking sessions
//! against a rig description.

mod rig;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use handrig_core::config::{load_config, save_default_config};
use handrig_core::{Hierarchy, NodeArena, RigDescription};

#[derive(Parser, Debug)]
#[command(name = "handrig")]
#[command(about = "Hand tracking rig binding and session replay")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "handrig.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind a rig and list its joint bindings
    Discover {
        /// Rig description (JSON)
        #[arg(short, long)]
        rig: PathBuf,
    },
    /// Replay a recorded tracking session against a rig
    Replay {
        /// Rig description (JSON)
        #[arg(short, long)]
        rig: PathBuf,

        /// Recorded session (JSON)
        #[arg(short, long)]
        session: PathBuf,

        /// Write the final rig pose as a rig description
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a default configuration file
    InitConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Handrig v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::InitConfig => {
            save_default_config(&args.config)
                .with_context(|| format!("writing {}", args.config.display()))?;
            println!("Wrote default configuration to {}", args.config.display());
        }
        Command::Discover { rig: rig_path } => {
            let config = load_config(&args.config)?;
            let arena = load_rig(&rig_path)?;
            let (animator, missing) = rig::bind_rig(&config, &arena)?;

            println!(
                "{} hand, root {}",
                config.hand.handedness,
                animator
                    .root()
                    .map(|root| arena.name(root).to_string())
                    .unwrap_or_else(|| "<none>".to_string())
            );
            println!("Bound {} joints:", animator.table().len());
            for line in rig::describe_bindings(&animator, &arena) {
                println!("  {}", line);
            }
            if !missing.is_empty() {
                println!("Missing: {}", missing.join(", "));
            }
        }
        Command::Replay {
            rig: rig_path,
            session: session_path,
            output,
        } => {
            let config = load_config(&args.config)?;
            let mut arena = load_rig(&rig_path)?;
            let recorded = session::Session::from_file(&session_path)?;
            let (mut animator, _) = rig::bind_rig(&config, &arena)?;

            let reports =
                session::replay(&recorded, config.hand.update_types, &mut arena, &mut animator);
            for report in &reports {
                println!("{}", serde_json::to_string(report)?);
            }

            if let Some(output) = output {
                let description = arena.to_description();
                std::fs::write(&output, description.to_json()?)
                    .with_context(|| format!("writing {}", output.display()))?;
                info!(path = %output.display(), "Wrote posed rig");
            }
        }
    }

    Ok(())
}

fn load_rig(path: &Path) -> Result<NodeArena> {
    let description = RigDescription::from_file(path)
        .with_context(|| format!("loading rig {}", path.display()))?;
    let arena = NodeArena::from_description(&description);
    info!(path = %path.display(), nodes = arena.len(), "Loaded rig");
    Ok(arena)
}
