//! upkeep - package update controller
//!
//! The CLI loads the configuration and a host fixture, starts the controller
//! service against the simulated backend, runs one command through a
//! `ControllerHandle` and renders the resulting snapshot.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info, warn};
use upkeep_backend::{Backend, ChannelWriter, HostFixture, MemoryBackend};
use upkeep_config::Config;
use upkeep_engine::{ControllerHandle, ControllerService, Snapshot, UpdateController};
use upkeep_events::EventReceiver;
use upkeep_types::{ActionKind, ColorChoice, OutputFormat, Package};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting upkeep v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref())
        .await
        .map_err(CliError::Config)?;
    config.merge_env().map_err(CliError::Config)?;
    apply_cli_config(&mut config, &cli.global);
    config.validate().map_err(CliError::Config)?;

    let fixture = match &cli.global.fixture {
        Some(path) => HostFixture::load(path).await.map_err(CliError::Config)?,
        None => HostFixture::default(),
    };

    let (backend_sender, backend_receiver) = upkeep_backend::channel();
    let backend = Arc::new(MemoryBackend::from_fixture(&fixture, backend_sender));
    let (event_sender, event_receiver) = upkeep_events::channel();

    let controller = UpdateController::new(
        Arc::clone(&backend) as Arc<dyn Backend>,
        backend as Arc<dyn ChannelWriter>,
        config.clone(),
        event_sender,
    );
    let (service, handle) = ControllerService::new(controller, backend_receiver);
    let service_task = tokio::spawn(service.run());

    let json_output = cli.global.json || config.general.default_output == OutputFormat::Json;
    let renderer = OutputRenderer::new(json_output, config.general.color);

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    } && config.general.default_output != OutputFormat::Plain;
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_output);

    info!(command = cli.command.name(), "Running command");
    let result =
        execute_command_with_events(cli.command, &handle, event_receiver, &mut event_handler)
            .await;

    // The service may already be gone; either way it is done after this.
    let _ = handle.shutdown().await;
    if let Err(e) = service_task.await {
        warn!("Controller service task failed: {}", e);
    }

    renderer.render_result(&result?)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    handle: &ControllerHandle,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, handle));
    let mut events_open = true;

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(message) = event_receiver.try_recv() {
                    event_handler.handle_event(message);
                }
                return result;
            }

            message = event_receiver.recv(), if events_open => {
                match message {
                    Some(message) => event_handler.handle_event(message),
                    None => events_open = false,
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    handle: &ControllerHandle,
) -> Result<CommandResult, CliError> {
    // Every command starts from the snapshot of the initial pass.
    let snapshot = handle.settled().await?;
    if !snapshot.available && !matches!(command, Commands::Watch) {
        return Err(CliError::Rejected(
            "the package management backend is not running".to_string(),
        ));
    }

    match command {
        Commands::List { updates } => Ok(CommandResult::Packages(select_packages(
            snapshot.packages,
            updates,
        ))),

        Commands::Repos => Ok(CommandResult::Repositories(snapshot.repositories)),

        Commands::Check => {
            require(
                handle.check_for_updates().await?,
                "a reconciliation pass is already running",
            )?;
            let snapshot = handle.settled().await?;
            Ok(CommandResult::Packages(select_packages(
                snapshot.packages,
                true,
            )))
        }

        Commands::Update { packages } => {
            let snapshot = apply(handle, ActionKind::Update, packages).await?;
            Ok(CommandResult::Packages(snapshot.packages))
        }

        Commands::Remove { packages } => {
            let snapshot = apply(handle, ActionKind::Remove, packages).await?;
            Ok(CommandResult::Packages(snapshot.packages))
        }

        Commands::EnableRepo { id } => {
            require(
                handle.enable_repository(id.as_str(), true).await?,
                &format!("cannot enable repository '{id}'"),
            )?;
            let snapshot = handle.settled().await?;
            Ok(CommandResult::Repositories(snapshot.repositories))
        }

        Commands::DisableRepo { id } => {
            require(
                handle.enable_repository(id.as_str(), false).await?,
                &format!("cannot disable repository '{id}'"),
            )?;
            let snapshot = handle.settled().await?;
            Ok(CommandResult::Repositories(snapshot.repositories))
        }

        Commands::Watch => {
            tokio::signal::ctrl_c().await?;
            Ok(CommandResult::Success("Stopped watching.".to_string()))
        }
    }
}

async fn apply(
    handle: &ControllerHandle,
    kind: ActionKind,
    packages: Vec<String>,
) -> Result<Snapshot, CliError> {
    require(
        handle.apply(kind, packages).await?,
        &format!("the {kind} request was refused"),
    )?;
    handle.settled().await.map_err(CliError::from)
}

fn require(accepted: bool, reason: &str) -> Result<(), CliError> {
    if accepted {
        Ok(())
    } else {
        Err(CliError::Rejected(reason.to_string()))
    }
}

fn select_packages(packages: Vec<Package>, updates_only: bool) -> Vec<Package> {
    if updates_only {
        packages
            .into_iter()
            .filter(|package| package.update_available)
            .collect()
    } else {
        packages
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
}

fn log_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("upkeep").join("logs"))
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    // JSON mode keeps stdout clean; only a debug log file is allowed.
    if debug_enabled {
        if let Some(log_dir) = log_dir() {
            match create_log_file(&log_dir) {
                Ok((file, path)) => {
                    tracing_subscriber::fmt()
                        .json()
                        .with_writer(file)
                        .with_env_filter(
                            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                                |_| {
                                    tracing_subscriber::EnvFilter::new(
                                        "info,upkeep=debug,upkeep_engine=debug",
                                    )
                                },
                            ),
                        )
                        .init();
                    if !json_mode {
                        eprintln!("Debug logging enabled: {}", path.display());
                    }
                    return;
                }
                Err(e) => {
                    if !json_mode {
                        eprintln!("Warning: Failed to create log file: {e}");
                    }
                }
            }
        }
    }

    if json_mode {
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn,upkeep=warn,upkeep_engine=warn")
                }),
            )
            .init();
    }
}

fn create_log_file(log_dir: &std::path::Path) -> std::io::Result<(std::fs::File, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!(
        "upkeep-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));
    let file = std::fs::File::create(&path)?;
    Ok((file, path))
}
