// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;

use sporenet_common::config::{Framework, ProjectConfig, Target, DEFAULT_SCRIPTS_DIR};

use crate::commands::{self, Session};
use crate::prompt::{Interactive, NonInteractive, Prompter};
use crate::runner::Runner;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "sporenet", version)]
#[command(about = "Convert ML models into ESP32 firmware and flash them")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Never prompt; fail when a required value is missing
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Project config file (default: ./sporenet.config.json if present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a model and build ESP32 firmware around it
    Build(BuildArgs),

    /// Flash built firmware to a board
    Flash(FlashArgs),

    /// Open a serial monitor on a board
    Monitor(MonitorArgs),

    /// Create a new project directory
    Init {
        /// Project name
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Check for required tools and install Python dependencies
    Setup {
        /// Only report missing tools, do not install anything
        #[arg(long)]
        check_only: bool,
    },

    /// Write an ESP-IDF firmware project without Python
    Generate {
        /// Converted .tflite model to embed
        #[arg(short, long, value_name = "FILE")]
        model: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "firmware")]
        output: PathBuf,
    },

    /// Write a C header embedding a converted model
    Header {
        /// Converted .tflite model
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Header path (default: model path with .h extension)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List detected serial ports
    Ports,
}

#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Model file (.h5, .pb, .pt, .onnx)
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Source framework: tensorflow, pytorch or onnx
    #[arg(short, long)]
    pub framework: Option<Framework>,

    /// Target chip: esp32, esp32s2, esp32s3 or esp32c3
    #[arg(short, long)]
    pub target: Option<Target>,

    /// Quantize the model (default)
    #[arg(long, overrides_with = "no_quantize")]
    pub quantize: bool,

    /// Keep float weights
    #[arg(long, overrides_with = "quantize")]
    pub no_quantize: bool,

    /// Output directory for the converted model and firmware
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Directory holding convert.py and generate_firmware.py
    #[arg(long, value_name = "DIR", env = "SPORENET_SCRIPTS_DIR", default_value = DEFAULT_SCRIPTS_DIR)]
    pub scripts_dir: PathBuf,
}

impl BuildArgs {
    /// Quantization as given on the command line, if at all.
    pub fn quantize_flag(&self) -> Option<bool> {
        match (self.quantize, self.no_quantize) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct FlashArgs {
    /// Serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long, env = "SPORENET_PORT")]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Target chip
    #[arg(short, long)]
    pub target: Option<Target>,

    /// Firmware binary (default: <output>/firmware/build/sporenet.bin)
    #[arg(long, value_name = "FILE")]
    pub firmware: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct MonitorArgs {
    /// Serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long, env = "SPORENET_PORT")]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// ESP-IDF project used by `idf.py monitor` (default: <output>/firmware)
    #[arg(long, value_name = "DIR")]
    pub firmware_dir: Option<PathBuf>,
}

fn load_project(explicit: Option<&PathBuf>) -> Result<Option<ProjectConfig>> {
    match explicit {
        Some(path) => ProjectConfig::load(path)
            .map(Some)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let cwd = env::current_dir().context("Failed to read current directory")?;
            Ok(ProjectConfig::discover(&cwd)?)
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let interactive = !cli.non_interactive && console::user_attended();
    let mut prompter: Box<dyn Prompter> = if interactive {
        Box::new(Interactive::new())
    } else {
        Box::new(NonInteractive)
    };

    let project = match cli.command {
        // these never read a project config
        Commands::Init { .. }
        | Commands::Setup { .. }
        | Commands::Header { .. }
        | Commands::Ports => None,
        _ => load_project(cli.config.as_ref())?,
    };
    if let Some(p) = &project {
        debug!(name = %p.name, "loaded project config");
    }

    let mut session = Session {
        project,
        prompter: prompter.as_mut(),
        runner: Runner::new(cli.verbose > 0),
    };

    match cli.command {
        Commands::Build(args) => commands::build(&mut session, &args),
        Commands::Flash(args) => commands::flash(&mut session, &args),
        Commands::Monitor(args) => commands::monitor(&mut session, &args),
        Commands::Init { name } => commands::init(&mut session, name),
        Commands::Setup { check_only } => commands::setup(&mut session, check_only),
        Commands::Generate { model, output } => commands::generate(&mut session, model, &output),
        Commands::Header { file, output } => commands::header(&file, output),
        Commands::Ports => commands::ports(),
    }
}
