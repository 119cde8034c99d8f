//! symcfg CLI: resolve peripheral configurations and inspect the device and
//! processor definitions they are resolved against.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use manifest::SymcfgManifest;

#[derive(Parser)]
#[command(name = "symcfg", version, about = "Peripheral configuration resolver")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a symcfg.toml manifest in the current directory
    Init {
        /// Project name
        name: String,
        /// Processor name
        #[arg(long, default_value = "ATSAME70Q21B")]
        processor: String,
    },
    /// Instantiate the manifest's components and print the resolved configuration
    Resolve {
        /// Manifest path (default: nearest symcfg.toml)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Include hidden symbols in text output
        #[arg(long)]
        hidden: bool,
        /// Print the SHA-256 digest of the resolved snapshot
        #[arg(long)]
        digest: bool,
    },
    /// Show available components and peripheral capabilities
    Components {
        /// Restrict the capability table to the modules of this device file
        #[arg(long)]
        device: Option<PathBuf>,
        /// Only list modules offering this capability (e.g., UART, MEMORY)
        #[arg(long)]
        capability: Option<String>,
    },
    /// Manage processor definitions
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Inspect device descriptions
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum TargetAction {
    /// List built-in and project processors
    List,
    /// Show details of a processor
    Describe {
        /// Processor name
        name: String,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
    /// Write a new .target.toml seeded from a built-in processor
    Add {
        /// Processor name
        name: String,
    },
    /// Validate a processor definition
    Validate {
        /// Processor name
        name: String,
    },
}

#[derive(Subcommand)]
enum DeviceAction {
    /// List device descriptions in the project's devices/ directory
    List,
    /// Validate a device description file
    Validate {
        /// Path of the .device.toml file
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(log_level(verbose))
        .init()
        .context("installing the logger")
}

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose)?;
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name, processor } => commands::init::run(&cwd, &name, &processor),

        Commands::Resolve {
            manifest,
            format,
            hidden,
            digest,
        } => {
            let (manifest, project_dir) = match manifest {
                Some(path) => {
                    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.clone());
                    (SymcfgManifest::load(&path)?, dir)
                }
                None => load_manifest_required(&cwd)?,
            };
            commands::resolve::run(&project_dir, &manifest, format, hidden, digest)
        }

        Commands::Components { device, capability } => {
            commands::components::run(device.as_deref(), capability.as_deref())
        }

        Commands::Target { action } => {
            let project_dir = project_dir_or(&cwd)?;
            match action {
                TargetAction::List => commands::target::list(&project_dir),
                TargetAction::Describe { name, format } => {
                    commands::target::describe(&name, &project_dir, format.as_deref())
                }
                TargetAction::Add { name } => commands::target::add(&name, &project_dir),
                TargetAction::Validate { name } => commands::target::validate(&name, &project_dir),
            }
        }

        Commands::Device { action } => match action {
            DeviceAction::List => commands::device::list(&project_dir_or(&cwd)?),
            DeviceAction::Validate { path } => commands::device::validate(&path),
        },
    }
}

/// Directory of the nearest manifest, or `cwd` when there is none.
fn project_dir_or(cwd: &Path) -> anyhow::Result<PathBuf> {
    Ok(SymcfgManifest::find_and_load(cwd)?
        .map(|(_, dir)| dir)
        .unwrap_or_else(|| cwd.to_path_buf()))
}

fn load_manifest_required(cwd: &Path) -> anyhow::Result<(SymcfgManifest, PathBuf)> {
    SymcfgManifest::find_and_load(cwd)?.ok_or_else(|| {
        anyhow::anyhow!(
            "no {} found in {} or any parent directory",
            manifest::MANIFEST_FILE,
            cwd.display()
        )
    })
}
