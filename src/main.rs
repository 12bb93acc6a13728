//! # Dot Matrix Zones Application Entry Point
//!
//! Drives a zone controller against the console display: inspect the saved
//! zones, save new ones from submitted form fields, apply a single command,
//! or run the once-per-second refresh loop while reading commands from stdin.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use dotmatrix_zones::config::{Config, CONFIG_FILE};
use dotmatrix_zones::controller::DotMatrixController;
use dotmatrix_zones::form::{form_from_zones, FormFields};
use dotmatrix_zones::renderer::ConsoleDriver;
use dotmatrix_zones::storage::FileSettingsStore;
use dotmatrix_zones::store::ZoneStore;
use dotmatrix_zones::template::VariableTemplates;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

type Controller = DotMatrixController<FileSettingsStore, ConsoleDriver, VariableTemplates>;

#[derive(Parser)]
#[command(name = "dotmatrix-zones")]
#[command(about = "Zone controller for chained LED dot-matrix displays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the saved zones and how they lay out
    Show {
        /// Print the settings form fields as JSON instead
        #[arg(long)]
        form: bool,
    },
    /// Save zones from settings form fields
    Save {
        /// Form fields as a JSON object of strings
        #[arg(short, long)]
        form: String,
    },
    /// Apply one runtime command, e.g. "dotmatrix txt 1 Hello"
    Command {
        /// Command text
        text: String,
    },
    /// Refresh clock zones every second and read commands from stdin
    Run,
}

fn init_logging() -> anyhow::Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_controller(config: &Config) -> Controller {
    let backend = FileSettingsStore::new(&config.storage.dir);
    let store = ZoneStore::new(backend, config.storage.slot, config.expected_zones());
    let templates = VariableTemplates::new(config.templates.variables.clone());
    DotMatrixController::new(store, ConsoleDriver::new(), templates)
}

/// Save zones from form fields and keep the submitted zone count in the
/// config, so zones beyond the old count stay active after a restart.
fn save_form(
    controller: &mut Controller,
    config: &mut Config,
    config_path: &Path,
    fields: &FormFields,
) -> anyhow::Result<u16> {
    let num_devices = controller.save_from_form(fields)?;

    let zone_count = i32::from(fields.zone_count());
    if config.display.zone_count != zone_count {
        config.display.zone_count = zone_count;
        config
            .save(config_path)
            .context("zones saved, but the zone count was not")?;
    }
    Ok(num_devices)
}

/// Load and configure, keeping going on a layout the display can't take.
fn start(controller: &mut Controller) {
    if let Err(e) = controller.begin() {
        warn!("zones not configured: {e}");
    }
}

async fn run(mut controller: Controller) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("refreshing every second, reading commands from stdin");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if controller.once_per_second(&Local::now()) {
                    controller.driver().print();
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("stdin closed, stopping");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match controller.handle_command(&line) {
                    Ok(_) => controller.driver().print(),
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let mut config = Config::load_from_path(&cli.config);
    let mut controller = build_controller(&config);

    match cli.command {
        Commands::Show { form } => {
            start(&mut controller);
            if form {
                let fields = form_from_zones(controller.zones());
                println!("{}", serde_json::to_string_pretty(&fields)?);
            } else {
                println!("{}", serde_json::to_string_pretty(controller.zones())?);
                controller.driver().print();
            }
        }
        Commands::Save { form } => {
            let fields: FormFields =
                serde_json::from_str(&form).context("form must be a JSON object of strings")?;
            let num_devices = save_form(&mut controller, &mut config, &cli.config, &fields)?;
            println!("saved, {num_devices} modules in use");
            controller.driver().print();
        }
        Commands::Command { text } => {
            start(&mut controller);
            controller.handle_command(&text)?;
            controller.driver().print();
        }
        Commands::Run => {
            start(&mut controller);
            controller.driver().print();

            // Create Tokio runtime for the refresh loop
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(controller))?;
        }
    }

    Ok(())
}
