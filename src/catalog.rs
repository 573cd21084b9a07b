//! Experiment catalog.
//!
//! Every HCP task experiment was acquired twice per subject (phase encoding
//! RL, then LR) and is annotated with an ordered list of conditions.  The
//! condition order is load-bearing: [`crate::events::load_events`] returns
//! per-condition frame sets in this order and [`crate::average::average_frames`]
//! looks them up by position.
use anyhow::Result;

use crate::error::ContrastError;

/// Phase-encoding direction of each run slot, used in EV directory names.
pub const RUN_DIRECTIONS: [&str; 2] = ["RL", "LR"];

/// One task experiment: its two absolute run indices and its conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub name: String,
    pub runs: [usize; 2],
    pub conditions: Vec<String>,
}

impl Experiment {
    pub fn new(name: &str, runs: [usize; 2], conditions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            runs,
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Absolute run index for `slot` (0 = first acquisition, 1 = second).
    pub fn run_index(&self, slot: usize) -> Result<usize> {
        self.runs
            .get(slot)
            .copied()
            .ok_or_else(|| ContrastError::InvalidRunSlot(slot).into())
    }

    /// Position of `condition` in the condition list.
    pub fn condition_index(&self, condition: &str) -> Result<usize> {
        self.conditions
            .iter()
            .position(|c| c == condition)
            .ok_or_else(|| {
                ContrastError::UnknownCondition {
                    experiment: self.name.clone(),
                    condition: condition.to_string(),
                }
                .into()
            })
    }

    /// EV directory name for a run slot, e.g. `tfMRI_WM_RL`.
    pub fn task_key(&self, slot: usize) -> Result<String> {
        let dir = RUN_DIRECTIONS
            .get(slot)
            .ok_or(ContrastError::InvalidRunSlot(slot))?;
        Ok(format!("tfMRI_{}_{}", self.name, dir))
    }
}

/// Name-ordered collection of experiments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    experiments: Vec<Experiment>,
}

impl Catalog {
    pub fn new(experiments: Vec<Experiment>) -> Self {
        Self { experiments }
    }

    /// The seven task experiments of the HCP release.
    pub fn hcp() -> Self {
        Self::new(vec![
            Experiment::new("MOTOR", [5, 6], &["lf", "rf", "lh", "rh", "t", "cue"]),
            Experiment::new(
                "WM",
                [7, 8],
                &[
                    "0bk_body", "0bk_faces", "0bk_places", "0bk_tools",
                    "2bk_body", "2bk_faces", "2bk_places", "2bk_tools",
                ],
            ),
            Experiment::new("EMOTION", [9, 10], &["fear", "neut"]),
            Experiment::new("GAMBLING", [11, 12], &["loss", "win"]),
            Experiment::new("LANGUAGE", [13, 14], &["math", "story"]),
            Experiment::new("RELATIONAL", [15, 16], &["match", "relation"]),
            Experiment::new("SOCIAL", [17, 18], &["mental", "rnd"]),
        ])
    }

    pub fn get(&self, name: &str) -> Result<&Experiment> {
        self.experiments
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ContrastError::UnknownExperiment(name.to_string()).into())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.experiments.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.iter()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::hcp()
    }
}
