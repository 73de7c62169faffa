// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and utilities for the sporenet CLI.
//!
//! Everything here is free of process handling so it can be tested without
//! Python, ESP-IDF or a board attached:
//! - `config`: project configuration, frameworks and targets
//! - `tools`: command lines for the external tools
//! - `pipeline`: build step state tracking
//! - `templates`: project and firmware files

pub mod config;
pub mod pipeline;
pub mod templates;
pub mod tools;

// Re-export commonly used types
pub use config::{BuildConfig, Error, FlashConfig, Framework, MonitorConfig, ProjectConfig, Target};
pub use config::{CONFIG_FILE_NAME, DEFAULT_BAUD, DEFAULT_OUTPUT_DIR, DEFAULT_SCRIPTS_DIR};
pub use pipeline::{Pipeline, Step, StepState, TransitionError};
pub use tools::ToolInvocation;
