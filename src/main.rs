//! deskctl: command-line front end.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  clap CLI ──▶ JsonConfigFile (ConfigPort) ──▶ DeskConfig │
//! │           ──▶ PresetStore (PresetLookup)                 │
//! │           ──▶ DeskController<SimulatedDesk, PresetStore> │
//! │                 on an edge-executor LocalExecutor        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Movement commands run against the simulated desk and print the final
//! state as JSON.  Preset commands edit the preset file directly.

#![deny(unused_must_use)]

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use deskctl::adapters::config_file::JsonConfigFile;
use deskctl::adapters::log_sink::LogEventSink;
use deskctl::adapters::sim_link::SimulatedDesk;
use deskctl::app::commands::DeskCommand;
use deskctl::app::ports::ConfigPort;
use deskctl::app::service::{DeskController, DeskExecutor, Health};
use deskctl::config::DeskConfig;
use deskctl::presets::PresetStore;
use deskctl::state::DeskState;

// ── CLI ───────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "deskctl", version, about = "Supervised standing-desk controller")]
struct Cli {
    /// Desk configuration file (JSON); defaults apply when missing
    #[arg(long, default_value = "desk.json")]
    config: PathBuf,

    /// Preset file (JSON); created on first edit
    #[arg(long, default_value = "presets.json")]
    presets: PathBuf,

    /// Simulated desk starting height in mm (default: mid-range)
    #[arg(long)]
    start_height: Option<i32>,

    /// Simulated travel per command in mm
    #[arg(long, default_value_t = 10)]
    sim_step: i32,

    /// Simulated obstruction height in mm
    #[arg(long)]
    obstruction: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Move to an absolute height
    Height { mm: i32 },
    /// Move to a named preset
    Preset { name: String },
    /// List presets
    Presets,
    /// Add a preset
    PresetAdd { name: String, mm: i32 },
    /// Remove a preset
    PresetRemove { name: String },
    /// Change a preset's height
    PresetSet { name: String, mm: i32 },
    /// Print the controller state
    State,
}

#[derive(Serialize)]
struct StateReport {
    state: DeskState,
    health: Health,
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = JsonConfigFile::new(&cli.config)
        .load()
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let presets = PresetStore::load(&cli.presets, config.bounds())
        .with_context(|| format!("loading presets from {}", cli.presets.display()))?;

    match cli.command {
        Command::Presets => print_json(&presets.list()),
        Command::PresetAdd { ref name, mm } => print_json(&presets.add(name, mm)?),
        Command::PresetRemove { ref name } => print_json(&presets.remove(name)?),
        Command::PresetSet { ref name, mm } => print_json(&presets.update_height(name, mm)?),
        Command::Height { mm } => run_controller(&cli, config, presets, Some(DeskCommand::SetHeight(mm))),
        Command::Preset { ref name } => run_controller(
            &cli,
            config,
            presets,
            Some(DeskCommand::ApplyPreset(name.clone())),
        ),
        Command::State => run_controller(&cli, config, presets, None),
    }
}

/// Drive the controller against the simulated desk until movement ends.
fn run_controller(
    cli: &Cli,
    config: DeskConfig,
    presets: PresetStore,
    command: Option<DeskCommand>,
) -> Result<()> {
    let start = cli.start_height.unwrap_or_else(|| config.bounds().midpoint());
    let mut desk = SimulatedDesk::new(start).with_step_mm(cli.sim_step);
    if let Some(h) = cli.obstruction {
        desk = desk.with_obstruction(h);
    }

    let executor = Rc::new(DeskExecutor::new());
    let controller = DeskController::new(
        Rc::clone(&executor),
        desk,
        presets,
        Rc::new(LogEventSink::new()),
        &config,
    );

    let report = futures_lite::future::block_on(executor.run(async move {
        if let Some(cmd) = command {
            controller.handle_command(cmd).await?;
            if let Some(report) = controller.wait_for_movement().await {
                info!(
                    "movement to {}mm: {} after {} attempt(s)",
                    report.target_mm, report.outcome, report.attempts
                );
            }
        }
        Ok::<_, deskctl::Error>(StateReport {
            state: controller.get_state(),
            health: controller.health(),
        })
    }))?;

    print_json(&report)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
