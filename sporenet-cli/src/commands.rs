// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use console::style;
use crc::{Crc, CRC_32_ISO_HDLC};
use tracing::{debug, info, warn};

use sporenet_common::config::{BuildConfig, ProjectConfig, CONVERTED_MODEL_NAME};
use sporenet_common::pipeline::{Pipeline, Step};
use sporenet_common::templates;
use sporenet_common::tools::{self, CONVERT_SCRIPT, GENERATE_SCRIPT, REQUIRED_TOOLS};

use crate::cli::{BuildArgs, FlashArgs, MonitorArgs};
use crate::prompt::Prompter;
use crate::resolve;
use crate::runner::{RunError, Runner};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// State shared by the commands of one invocation.
pub struct Session<'a> {
    pub project: Option<ProjectConfig>,
    pub prompter: &'a mut dyn Prompter,
    pub runner: Runner,
}

/// Convert the model, generate the firmware project and compile it.
pub fn build(session: &mut Session, args: &BuildArgs) -> Result<()> {
    let cfg = resolve::build_config(args, session.project.as_ref(), session.prompter)?;

    if !cfg.model.exists() {
        bail!("Model file not found: {}", cfg.model.display());
    }
    for script in [CONVERT_SCRIPT, GENERATE_SCRIPT] {
        let path = cfg.scripts_dir.join(script);
        if !path.is_file() {
            bail!(
                "Script not found: {} (set --scripts-dir or SPORENET_SCRIPTS_DIR)",
                path.display()
            );
        }
    }

    println!("SporeNet build");
    println!("  Model:        {}", cfg.model.display());
    println!("  Framework:    {}", cfg.framework);
    println!("  Target:       {}", cfg.target.display_name());
    println!(
        "  Quantization: {}",
        if cfg.quantize { "enabled" } else { "disabled" }
    );
    println!("  Output:       {}", cfg.output_dir.display());
    println!();

    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("Failed to create {}", cfg.output_dir.display()))?;

    let mut pipeline = Pipeline::build();
    for (n, step) in Step::ALL.into_iter().enumerate() {
        pipeline.start(step)?;
        let message = format!("[{}/{}] {}", n + 1, pipeline.len(), step.description());
        match run_build_step(&session.runner, &cfg, step, &message) {
            Ok(()) => pipeline.complete(step)?,
            Err(e) => {
                pipeline.fail(step)?;
                return Err(e.context(format!("Build failed at step '{}'", step)));
            }
        }
    }
    debug_assert!(pipeline.is_finished());

    let bin = cfg.firmware_bin();
    println!();
    println!("Build complete!");
    println!("  Model:    {}", cfg.converted_model().display());
    println!("  Firmware: {}", bin.display());
    println!("Use 'sporenet flash --port <PORT>' to flash the device.");

    Ok(())
}

fn run_build_step(runner: &Runner, cfg: &BuildConfig, step: Step, message: &str) -> Result<()> {
    match step {
        Step::Convert => {
            runner.run_step(&tools::convert(cfg), message)?;
            let model = cfg.converted_model();
            if !model.is_file() {
                bail!("Converter did not produce {}", model.display());
            }
        }
        Step::Generate => runner.run_step(&tools::generate_firmware(cfg), message)?,
        Step::Compile => {
            let dir = cfg.firmware_dir();
            if !dir.is_dir() {
                bail!("Firmware project not found: {}", dir.display());
            }
            match runner.run_step(&tools::compile_idf(cfg), message) {
                Err(RunError::NotFound { program }) => {
                    warn!("{} not available, falling back to make", program);
                    runner.run_step(&tools::compile_make(cfg), message)?;
                }
                other => other?,
            }
        }
    }
    Ok(())
}

fn detected_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!("serial port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Flash the built firmware with esptool.
pub fn flash(session: &mut Session, args: &FlashArgs) -> Result<()> {
    let ports = if args.port.is_some() {
        Vec::new()
    } else {
        detected_ports()
    };
    let cfg = resolve::flash_config(args, session.project.as_ref(), session.prompter, &ports)?;

    if !cfg.firmware.is_file() {
        bail!(
            "Firmware not found: {}. Run 'sporenet build' first.",
            cfg.firmware.display()
        );
    }
    let firmware = fs::read(&cfg.firmware)
        .with_context(|| format!("Failed to read {}", cfg.firmware.display()))?;

    println!(
        "Firmware: {} ({} bytes, CRC32: 0x{:08x})",
        cfg.firmware.display(),
        firmware.len(),
        CRC32.checksum(&firmware)
    );
    println!(
        "Target:   {} at 0x{:x}",
        cfg.target.display_name(),
        cfg.target.flash_offset()
    );
    println!("Port:     {} @ {} baud", cfg.port, cfg.baud);
    println!();

    session.runner.run(&tools::flash(&cfg))?;

    println!();
    println!("Firmware flashed successfully!");
    println!(
        "Use 'sporenet monitor --port {}' to view the serial output.",
        cfg.port
    );

    Ok(())
}

/// Open a serial monitor, falling back to pyserial's miniterm.
pub fn monitor(session: &mut Session, args: &MonitorArgs) -> Result<()> {
    let ports = if args.port.is_some() {
        Vec::new()
    } else {
        detected_ports()
    };
    let cfg = resolve::monitor_config(args, session.project.as_ref(), session.prompter, &ports)?;

    println!("Monitoring {} @ {} baud (Ctrl+] to exit)", cfg.port, cfg.baud);

    // idf.py monitor needs the project directory for symbol decoding.
    let primary = if cfg.firmware_dir.is_dir() {
        match session.runner.run(&tools::monitor_idf(&cfg)) {
            Ok(()) => return Ok(()),
            Err(e) => Some(e),
        }
    } else {
        info!(
            "{} not found, skipping idf.py monitor",
            cfg.firmware_dir.display()
        );
        None
    };
    if let Some(e) = &primary {
        warn!("idf.py monitor failed: {}", e);
    }

    let fallback = tools::monitor_miniterm(&cfg);
    println!("Falling back to: {}", fallback);
    session
        .runner
        .run(&fallback)
        .context("Serial monitor failed; install ESP-IDF or pyserial ('sporenet setup')")?;

    Ok(())
}

/// Create a new project directory in the current directory.
pub fn init(session: &mut Session, name: Option<String>) -> Result<()> {
    let name = resolve::project_name(name, session.prompter)?;
    let cwd = env::current_dir().context("Failed to read current directory")?;

    let created = templates::init_project(&cwd, &name)?;
    info!(count = created.len(), "project created");

    println!("Created project '{}':", name);
    for path in &created {
        let rel = path.strip_prefix(&cwd).unwrap_or(path);
        println!("  {}", rel.display());
    }
    println!();
    println!("Next steps:");
    println!("  cd {}", name);
    println!("  cp path/to/model.h5 models/model.h5");
    println!("  sporenet build");

    Ok(())
}

/// Check the environment and install the Python dependencies.
pub fn setup(session: &mut Session, check_only: bool) -> Result<()> {
    let path_var = env::var_os("PATH").unwrap_or_default();

    println!("Checking tools:");
    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        match tools::find_in_path(tool.program, &path_var) {
            Some(path) => println!(
                "  {} {:<12} {}",
                style("found").green(),
                tool.program,
                path.display()
            ),
            None if tool.required => {
                println!(
                    "  {} {:<12} {}",
                    style("missing").red(),
                    tool.program,
                    tool.hint
                );
                missing.push(tool.program);
            }
            None => println!(
                "  {} {:<12} {}",
                style("optional").yellow(),
                tool.program,
                tool.hint
            ),
        }
    }
    match env::var_os("IDF_PATH") {
        Some(p) => println!("  IDF_PATH = {}", PathBuf::from(p).display()),
        None => println!("  IDF_PATH is not set"),
    }
    println!();

    if !missing.is_empty() {
        bail!("Missing required tools: {}", missing.join(", "));
    }
    if check_only {
        println!("Environment OK.");
        return Ok(());
    }

    let install = tools::setup_install();
    println!("Installing Python dependencies: {}", install);
    session.runner.run(&install)?;

    println!();
    println!("Setup complete. Create a project with 'sporenet init <NAME>'.");
    Ok(())
}

/// Write the firmware project natively.
pub fn generate(session: &mut Session, model: Option<PathBuf>, output: &Path) -> Result<()> {
    let model = model.or_else(|| {
        session.project.as_ref().map(|p| p.output_dir.join(CONVERTED_MODEL_NAME))
    });

    let embedded = templates::generate_firmware_project(output, model.as_deref())?;

    println!("ESP32 firmware project written to {}/", output.display());
    match (embedded, &model) {
        (Some(len), Some(path)) => println!("  Model:  {} ({} bytes)", path.display(), len),
        (None, Some(path)) => println!(
            "  Model:  {} not found, using placeholder data",
            path.display()
        ),
        (_, None) => println!("  Model:  placeholder data"),
    }
    println!();
    println!("Next steps:");
    println!("  cd {}", output.display());
    println!("  ./build.sh");

    Ok(())
}

/// Write a C header for a converted model.
pub fn header(file: &Path, output: Option<PathBuf>) -> Result<()> {
    if !file.is_file() {
        bail!("Model file not found: {}", file.display());
    }
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let out = output.unwrap_or_else(|| templates::header_path_for(file));

    fs::write(&out, templates::render_model_header(&bytes))
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Header written: {} ({} bytes)", out.display(), bytes.len());
    Ok(())
}

/// List serial ports and what is attached to them.
pub fn ports() -> Result<()> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports detected.");
        return Ok(());
    }

    for port in ports {
        match port.port_type {
            serialport::SerialPortType::UsbPort(usb) => println!(
                "{}  USB {:04x}:{:04x} {}",
                port.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            other => println!("{}  {:?}", port.port_name, other),
        }
    }
    Ok(())
}
