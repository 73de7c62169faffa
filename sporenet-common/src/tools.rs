// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command lines for the external tools the CLI drives.
//!
//! Nothing here spawns a process. Each function returns a [`ToolInvocation`]
//! describing the program, its arguments and working directory, so the exact
//! command lines can be checked without Python or ESP-IDF installed.

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{BuildConfig, FlashConfig, MonitorConfig};

pub const PYTHON: &str = "python3";
pub const IDF: &str = "idf.py";
pub const MAKE: &str = "make";
pub const ESPTOOL: &str = "esptool.py";

pub const CONVERT_SCRIPT: &str = "convert.py";
pub const GENERATE_SCRIPT: &str = "generate_firmware.py";

/// Python packages installed by `sporenet setup`.
pub const PYTHON_PACKAGES: [&str; 4] = ["tensorflow", "numpy", "esptool", "pyserial"];

/// One external process call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for a in args {
            self = self.arg(a);
        }
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for ToolInvocation {
    /// Shell-like rendering, quoting arguments that contain whitespace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            if a.is_empty() || a.contains(char::is_whitespace) {
                write!(f, " '{}'", a)?;
            } else {
                write!(f, " {}", a)?;
            }
        }
        Ok(())
    }
}

// --- build pipeline ---

/// Model conversion and quantization.
pub fn convert(cfg: &BuildConfig) -> ToolInvocation {
    ToolInvocation::new(PYTHON)
        .arg(cfg.scripts_dir.join(CONVERT_SCRIPT))
        .arg("--model")
        .arg(&cfg.model)
        .arg("--framework")
        .arg(cfg.framework.as_str())
        .arg("--output")
        .arg(cfg.converted_model())
        .arg(if cfg.quantize {
            "--quantize"
        } else {
            "--no-quantize"
        })
}

/// Firmware project generation around the converted model.
pub fn generate_firmware(cfg: &BuildConfig) -> ToolInvocation {
    ToolInvocation::new(PYTHON)
        .arg(cfg.scripts_dir.join(GENERATE_SCRIPT))
        .arg("--target")
        .arg(cfg.target.generator_platform())
        .arg("--output")
        .arg(cfg.firmware_dir())
        .arg("--model")
        .arg(cfg.converted_model())
}

/// ESP-IDF build of the generated firmware project.
pub fn compile_idf(cfg: &BuildConfig) -> ToolInvocation {
    ToolInvocation::new(IDF)
        .arg(format!("-DIDF_TARGET={}", cfg.target.chip()))
        .arg("build")
        .current_dir(cfg.firmware_dir())
}

/// Plain `make` build, used when `idf.py` is not available.
pub fn compile_make(cfg: &BuildConfig) -> ToolInvocation {
    ToolInvocation::new(MAKE).current_dir(cfg.firmware_dir())
}

// --- device ---

pub fn flash(cfg: &FlashConfig) -> ToolInvocation {
    ToolInvocation::new(ESPTOOL)
        .arg("--chip")
        .arg(cfg.target.chip())
        .arg("--port")
        .arg(&cfg.port)
        .arg("--baud")
        .arg(cfg.baud.to_string())
        .arg("write_flash")
        .arg(format!("0x{:x}", cfg.target.flash_offset()))
        .arg(&cfg.firmware)
}

pub fn monitor_idf(cfg: &MonitorConfig) -> ToolInvocation {
    ToolInvocation::new(IDF)
        .arg("-p")
        .arg(&cfg.port)
        .arg("-b")
        .arg(cfg.baud.to_string())
        .arg("monitor")
        .current_dir(&cfg.firmware_dir)
}

pub fn monitor_miniterm(cfg: &MonitorConfig) -> ToolInvocation {
    ToolInvocation::new(PYTHON)
        .args(["-m", "serial.tools.miniterm"])
        .arg(&cfg.port)
        .arg(cfg.baud.to_string())
}

// --- setup ---

/// An external tool the environment check looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequiredTool {
    pub program: &'static str,
    pub required: bool,
    pub hint: &'static str,
}

pub const REQUIRED_TOOLS: [RequiredTool; 4] = [
    RequiredTool {
        program: PYTHON,
        required: true,
        hint: "install Python 3.8 or later",
    },
    RequiredTool {
        program: "pip3",
        required: true,
        hint: "install pip for Python 3",
    },
    RequiredTool {
        program: IDF,
        required: false,
        hint: "install ESP-IDF and source its export.sh",
    },
    RequiredTool {
        program: ESPTOOL,
        required: false,
        hint: "installed by 'sporenet setup' (pip package esptool)",
    },
];

pub fn setup_install() -> ToolInvocation {
    ToolInvocation::new(PYTHON)
        .args(["-m", "pip", "install", "--upgrade"])
        .args(PYTHON_PACKAGES)
}

/// Locate `program` in a `PATH`-style list of directories.
///
/// Names containing a path separator are checked directly.
pub fn find_in_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    env::split_paths(path_var)
        .map(|dir| dir.join(program))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
