// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Interactive prompts for values not given on the command line.

use anyhow::{bail, Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

/// Source of values the user did not pass as flags.
///
/// `flag` names the command-line option that would have supplied the value,
/// for implementations that cannot ask.
pub trait Prompter {
    fn input(&mut self, prompt: &str, flag: &str, default: Option<&str>) -> Result<String>;

    fn select(
        &mut self,
        prompt: &str,
        flag: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// Terminal prompts.
#[derive(Default)]
pub struct Interactive {
    theme: ColorfulTheme,
}

impl Interactive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for Interactive {
    fn input(&mut self, prompt: &str, _flag: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme);
        input.with_prompt(prompt);
        if let Some(d) = default {
            input.default(d.to_string());
        }
        let value = input.interact_text().context("Failed to read input")?;
        Ok(value.trim().to_string())
    }

    fn select(
        &mut self,
        prompt: &str,
        _flag: &str,
        items: &[String],
        default: Option<usize>,
    ) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default.unwrap_or(0))
            .interact()
            .context("Failed to read selection")
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .context("Failed to read confirmation")
    }
}

/// Used with `--non-interactive` or when stdout is not a terminal: takes the
/// default when there is one, fails otherwise.
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn input(&mut self, prompt: &str, flag: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(d) => Ok(d.to_string()),
            None => bail!("{} is required: pass {}", prompt, flag),
        }
    }

    fn select(
        &mut self,
        prompt: &str,
        flag: &str,
        _items: &[String],
        default: Option<usize>,
    ) -> Result<usize> {
        match default {
            Some(i) => Ok(i),
            None => bail!("{} is required: pass {}", prompt, flag),
        }
    }

    fn confirm(&mut self, _prompt: &str, default: bool) -> Result<bool> {
        Ok(default)
    }
}
