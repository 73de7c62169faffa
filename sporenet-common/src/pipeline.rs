// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Build pipeline step tracking - pure logic without process handling.
//!
//! Each step moves `Pending -> Running -> Completed | Failed`. A step may
//! only start once every step before it has completed, so a failed step
//! stops the pipeline.

use std::fmt;

/// Steps of `sporenet build`, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Convert,
    Generate,
    Compile,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Convert, Step::Generate, Step::Compile];

    pub fn name(self) -> &'static str {
        match self {
            Step::Convert => "convert",
            Step::Generate => "generate",
            Step::Compile => "compile",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::Convert => "Converting and quantizing model",
            Step::Generate => "Generating ESP32 firmware project",
            Step::Compile => "Compiling firmware",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepState {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("step {step} cannot go from {from:?} to {to:?}")]
    Invalid {
        step: Step,
        from: StepState,
        to: StepState,
    },
    #[error("step {step} cannot start before {blocked_by} completes")]
    Blocked { step: Step, blocked_by: Step },
    #[error("step {0} is not part of this pipeline")]
    UnknownStep(Step),
}

/// Ordered set of steps and their current states.
#[derive(Clone, Debug)]
pub struct Pipeline {
    steps: Vec<(Step, StepState)>,
}

impl Pipeline {
    pub fn new(steps: &[Step]) -> Self {
        Self {
            steps: steps.iter().map(|s| (*s, StepState::Pending)).collect(),
        }
    }

    /// Pipeline for `sporenet build`.
    pub fn build() -> Self {
        Self::new(&Step::ALL)
    }

    pub fn steps(&self) -> impl Iterator<Item = (Step, StepState)> + '_ {
        self.steps.iter().copied()
    }

    pub fn state(&self, step: Step) -> Option<StepState> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, state)| *state)
    }

    pub fn start(&mut self, step: Step) -> Result<(), TransitionError> {
        let idx = self.index(step)?;
        if let Some((blocked_by, _)) = self.steps[..idx]
            .iter()
            .find(|(_, state)| *state != StepState::Completed)
        {
            return Err(TransitionError::Blocked {
                step,
                blocked_by: *blocked_by,
            });
        }
        self.transition(idx, StepState::Pending, StepState::Running)
    }

    pub fn complete(&mut self, step: Step) -> Result<(), TransitionError> {
        let idx = self.index(step)?;
        self.transition(idx, StepState::Running, StepState::Completed)
    }

    pub fn fail(&mut self, step: Step) -> Result<(), TransitionError> {
        let idx = self.index(step)?;
        self.transition(idx, StepState::Running, StepState::Failed)
    }

    /// The step currently running, if any.
    pub fn current(&self) -> Option<Step> {
        self.steps
            .iter()
            .find(|(_, state)| *state == StepState::Running)
            .map(|(s, _)| *s)
    }

    pub fn failed_step(&self) -> Option<Step> {
        self.steps
            .iter()
            .find(|(_, state)| *state == StepState::Failed)
            .map(|(s, _)| *s)
    }

    /// True once every step completed or any step failed.
    pub fn is_finished(&self) -> bool {
        self.failed_step().is_some()
            || self
                .steps
                .iter()
                .all(|(_, state)| *state == StepState::Completed)
    }

    /// Number of completed steps.
    pub fn completed(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, state)| *state == StepState::Completed)
            .count()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn index(&self, step: Step) -> Result<usize, TransitionError> {
        self.steps
            .iter()
            .position(|(s, _)| *s == step)
            .ok_or(TransitionError::UnknownStep(step))
    }

    fn transition(
        &mut self,
        idx: usize,
        from: StepState,
        to: StepState,
    ) -> Result<(), TransitionError> {
        let (step, state) = &mut self.steps[idx];
        if *state != from {
            return Err(TransitionError::Invalid {
                step: *step,
                from: *state,
                to,
            });
        }
        *state = to;
        Ok(())
    }
}
