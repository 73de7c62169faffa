// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Project configuration and the parameter types shared by every command.
//!
//! The on-disk form is `sporenet.config.json`, written by `sporenet init` and
//! read back by the other commands to fill in parameters that were not given
//! on the command line.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// --- Defaults ---

pub const CONFIG_FILE_NAME: &str = "sporenet.config.json";
pub const DEFAULT_BAUD: u32 = 115_200;
pub const DEFAULT_OUTPUT_DIR: &str = "build";
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";
pub const DEFAULT_MODEL_PATH: &str = "models/model.h5";
pub const PROJECT_VERSION: &str = "0.1.0";

/// File name of the converted model inside the output directory.
pub const CONVERTED_MODEL_NAME: &str = "converted_model.tflite";
/// Name of the generated firmware project inside the output directory.
pub const FIRMWARE_DIR_NAME: &str = "firmware";
/// Application image produced by ESP-IDF, relative to the firmware project.
pub const FIRMWARE_BIN_PATH: &str = "build/sporenet.bin";

/// Errors produced by the shared library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown framework '{0}' (expected one of: tensorflow, pytorch, onnx)")]
    UnknownFramework(String),

    #[error("unknown target '{0}' (expected one of: esp32, esp32s2, esp32s3, esp32c3)")]
    UnknownTarget(String),

    #[error("directory {} already exists", .0.display())]
    ProjectExists(PathBuf),

    #[error("invalid project name '{0}': use letters, digits, '-' or '_'")]
    InvalidProjectName(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

// --- Framework ---

/// Source framework of the model being converted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    Tensorflow,
    Pytorch,
    Onnx,
}

impl Framework {
    pub const ALL: [Framework; 3] = [Framework::Tensorflow, Framework::Pytorch, Framework::Onnx];

    /// Name passed to the converter's `--framework` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Tensorflow => "tensorflow",
            Framework::Pytorch => "pytorch",
            Framework::Onnx => "onnx",
        }
    }

    /// Guess the framework from a model file extension.
    pub fn from_model_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "h5" | "keras" | "pb" => Some(Framework::Tensorflow),
            "pt" | "pth" => Some(Framework::Pytorch),
            "onnx" => Some(Framework::Onnx),
            _ => None,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tensorflow" | "tf" | "keras" => Ok(Framework::Tensorflow),
            "pytorch" | "torch" => Ok(Framework::Pytorch),
            "onnx" => Ok(Framework::Onnx),
            _ => Err(Error::UnknownFramework(s.to_string())),
        }
    }
}

// --- Target ---

/// Target microcontroller of the generated firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Esp32,
    Esp32s2,
    Esp32s3,
    Esp32c3,
}

impl Target {
    pub const ALL: [Target; 4] = [
        Target::Esp32,
        Target::Esp32s2,
        Target::Esp32s3,
        Target::Esp32c3,
    ];

    /// Chip name as understood by `esptool.py --chip` and `IDF_TARGET`.
    pub fn chip(self) -> &'static str {
        match self {
            Target::Esp32 => "esp32",
            Target::Esp32s2 => "esp32s2",
            Target::Esp32s3 => "esp32s3",
            Target::Esp32c3 => "esp32c3",
        }
    }

    /// Platform name for the firmware generator's `--target`, which only
    /// distinguishes chip families. The exact chip goes to `IDF_TARGET`.
    pub fn generator_platform(self) -> &'static str {
        match self {
            Target::Esp32 | Target::Esp32s2 | Target::Esp32s3 | Target::Esp32c3 => "esp32",
        }
    }

    /// Flash offset of the second-stage bootloader, where the merged image goes.
    pub fn flash_offset(self) -> u32 {
        match self {
            Target::Esp32 | Target::Esp32s2 => 0x1000,
            Target::Esp32s3 | Target::Esp32c3 => 0x0,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Target::Esp32 => "ESP32 (Xtensa LX6, 520KB SRAM)",
            Target::Esp32s2 => "ESP32-S2 (Xtensa LX7, 320KB SRAM)",
            Target::Esp32s3 => "ESP32-S3 (Xtensa LX7, vector extensions)",
            Target::Esp32c3 => "ESP32-C3 (RISC-V, 400KB SRAM)",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chip())
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "esp32" => Ok(Target::Esp32),
            "esp32s2" => Ok(Target::Esp32s2),
            "esp32s3" => Ok(Target::Esp32s3),
            "esp32c3" => Ok(Target::Esp32c3),
            _ => Err(Error::UnknownTarget(s.to_string())),
        }
    }
}

// --- Resolved command parameters ---

/// Parameters of the `build` pipeline after flags, config and prompts are merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    pub model: PathBuf,
    pub framework: Framework,
    pub target: Target,
    pub quantize: bool,
    pub output_dir: PathBuf,
    pub scripts_dir: PathBuf,
}

impl BuildConfig {
    pub fn converted_model(&self) -> PathBuf {
        self.output_dir.join(CONVERTED_MODEL_NAME)
    }

    pub fn firmware_dir(&self) -> PathBuf {
        self.output_dir.join(FIRMWARE_DIR_NAME)
    }

    pub fn firmware_bin(&self) -> PathBuf {
        self.firmware_dir().join(FIRMWARE_BIN_PATH)
    }
}

/// Parameters of `flash`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashConfig {
    pub port: String,
    pub baud: u32,
    pub target: Target,
    pub firmware: PathBuf,
}

/// Parameters of `monitor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorConfig {
    pub port: String,
    pub baud: u32,
    pub firmware_dir: PathBuf,
}

/// Default firmware image for an output directory.
pub fn default_firmware_bin(output_dir: &Path) -> PathBuf {
    output_dir.join(FIRMWARE_DIR_NAME).join(FIRMWARE_BIN_PATH)
}

// --- sporenet.config.json ---

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: DEFAULT_BAUD,
        }
    }
}

fn default_baud() -> u32 {
    DEFAULT_BAUD
}

fn default_quantize() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Contents of `sporenet.config.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub framework: Framework,
    #[serde(default)]
    pub target: Target,
    #[serde(default = "default_quantize")]
    pub quantize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub serial: SerialConfig,
}

impl ProjectConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: PROJECT_VERSION.to_string(),
            framework: Framework::default(),
            target: Target::default(),
            quantize: true,
            model: Some(PathBuf::from(DEFAULT_MODEL_PATH)),
            output_dir: default_output_dir(),
            serial: SerialConfig::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `sporenet.config.json` from `dir` if it exists.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: PathBuf::from(CONFIG_FILE_NAME),
            source,
        })?;
        text.push('\n');
        Ok(text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?).map_err(|e| Error::io(path, e))
    }
}
