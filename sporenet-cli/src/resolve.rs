// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Merge command-line flags, the project config and prompts into the
//! parameters each command runs with.
//!
//! Precedence is flag (or environment) first, then `sporenet.config.json`,
//! then a prompt, then the built-in default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use sporenet_common::config::{
    default_firmware_bin, BuildConfig, FlashConfig, Framework, MonitorConfig, ProjectConfig,
    Target, DEFAULT_BAUD, DEFAULT_OUTPUT_DIR, FIRMWARE_DIR_NAME,
};

use crate::cli::{BuildArgs, FlashArgs, MonitorArgs};
use crate::prompt::Prompter;

pub fn build_config(
    args: &BuildArgs,
    project: Option<&ProjectConfig>,
    prompter: &mut dyn Prompter,
) -> Result<BuildConfig> {
    let model = match args
        .model
        .clone()
        .or_else(|| project.and_then(|p| p.model.clone()))
    {
        Some(m) => m,
        None => PathBuf::from(prompter.input("Model file", "--model <FILE>", None)?),
    };

    let framework = match args.framework.or(project.map(|p| p.framework)) {
        Some(f) => f,
        None => {
            let items: Vec<String> = Framework::ALL.iter().map(|f| f.to_string()).collect();
            let guess = Framework::from_model_path(&model)
                .and_then(|g| Framework::ALL.iter().position(|f| *f == g));
            Framework::ALL[prompter.select("Model framework", "--framework", &items, guess)?]
        }
    };

    let target = match args.target.or(project.map(|p| p.target)) {
        Some(t) => t,
        None => select_target(prompter)?,
    };

    let quantize = match args.quantize_flag().or(project.map(|p| p.quantize)) {
        Some(q) => q,
        None => prompter.confirm("Quantize model to int8?", true)?,
    };

    Ok(BuildConfig {
        model,
        framework,
        target,
        quantize,
        output_dir: output_dir(args.output.as_deref(), project),
        scripts_dir: args.scripts_dir.clone(),
    })
}

pub fn flash_config(
    args: &FlashArgs,
    project: Option<&ProjectConfig>,
    prompter: &mut dyn Prompter,
    available_ports: &[String],
) -> Result<FlashConfig> {
    let port = port(args.port.as_deref(), project, prompter, available_ports)?;
    let firmware = args
        .firmware
        .clone()
        .unwrap_or_else(|| default_firmware_bin(&output_dir(None, project)));

    Ok(FlashConfig {
        port,
        baud: baud(args.baud, project),
        target: args
            .target
            .or(project.map(|p| p.target))
            .unwrap_or_default(),
        firmware,
    })
}

pub fn monitor_config(
    args: &MonitorArgs,
    project: Option<&ProjectConfig>,
    prompter: &mut dyn Prompter,
    available_ports: &[String],
) -> Result<MonitorConfig> {
    let port = port(args.port.as_deref(), project, prompter, available_ports)?;
    let firmware_dir = args
        .firmware_dir
        .clone()
        .unwrap_or_else(|| output_dir(None, project).join(FIRMWARE_DIR_NAME));

    Ok(MonitorConfig {
        port,
        baud: baud(args.baud, project),
        firmware_dir,
    })
}

pub fn project_name(name: Option<String>, prompter: &mut dyn Prompter) -> Result<String> {
    match name {
        Some(n) => Ok(n),
        None => prompter.input("Project name", "<NAME>", Some("sporenet-project")),
    }
}

fn select_target(prompter: &mut dyn Prompter) -> Result<Target> {
    let items: Vec<String> = Target::ALL
        .iter()
        .map(|t| t.display_name().to_string())
        .collect();
    let idx = prompter.select("Target hardware", "--target", &items, Some(0))?;
    Ok(Target::ALL[idx])
}

fn output_dir(flag: Option<&Path>, project: Option<&ProjectConfig>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| project.map(|p| p.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn baud(flag: Option<u32>, project: Option<&ProjectConfig>) -> u32 {
    flag.or(project.map(|p| p.serial.baud))
        .unwrap_or(DEFAULT_BAUD)
}

fn port(
    flag: Option<&str>,
    project: Option<&ProjectConfig>,
    prompter: &mut dyn Prompter,
    available_ports: &[String],
) -> Result<String> {
    if let Some(p) = flag.or_else(|| project.and_then(|p| p.serial.port.as_deref())) {
        return Ok(p.to_string());
    }

    if available_ports.is_empty() {
        return prompter
            .input("Serial port", "--port <PORT>", None)
            .context("No serial ports detected");
    }

    // A single detected port is offered as the default.
    let default = (available_ports.len() == 1).then_some(0);
    let idx = prompter.select("Serial port", "--port <PORT>", available_ports, default)?;
    Ok(available_ports[idx].clone())
}
