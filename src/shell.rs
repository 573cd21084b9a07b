//! Presentation shell: selection state, background submission, status text
//! and the retained result, independent of any particular UI toolkit.
//!
//! A front end drives it like this:
//!
//! ```text
//! select_cond_a / select_cond_b / select_hemisphere
//! submit()            → worker starts, status "Computing…"
//! pump() (every tick) → status "Computing… (42.0%)", then "Done."
//! export_csv / render_chart / project_surface on the retained result
//! ```
//!
//! At most one computation is in flight.  A failed computation leaves the
//! previous successful result in place.
use anyhow::Result;
use ndarray::Array1;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::Experiment;
use crate::chart::render_summary_chart;
use crate::config::AnalysisConfig;
use crate::contrast::{ContrastRequest, GroupContrast};
use crate::error::ContrastError;
use crate::regions::{Hemisphere, RegionTable};
use crate::summary::SummaryTable;
use crate::surface::SurfaceMap;
use crate::task::{ContrastTask, TaskEvent, TaskHandle};

pub const STATUS_IDLE: &str = "Select conditions and click Compute Contrast";
pub const STATUS_DONE: &str = "Done.";

/// The user's current choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub cond_a: String,
    pub cond_b: String,
    pub hemisphere: Hemisphere,
}

impl Selection {
    /// Both conditions must exist in `experiment` and differ.
    pub fn validate(&self, experiment: &Experiment) -> Result<()> {
        experiment.condition_index(&self.cond_a)?;
        experiment.condition_index(&self.cond_b)?;
        if self.cond_a == self.cond_b {
            return Err(ContrastError::InvalidSelection(self.cond_a.clone()).into());
        }
        Ok(())
    }
}

/// Conditions offered for one selector: every condition except `other`.
pub fn condition_choices<'a>(experiment: &'a Experiment, other: Option<&str>) -> Vec<&'a str> {
    experiment
        .conditions
        .iter()
        .map(String::as_str)
        .filter(|c| Some(*c) != other)
        .collect()
}

/// A completed computation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub contrast: GroupContrast,
    pub summary: SummaryTable,
}

pub struct Shell {
    cfg: Arc<AnalysisConfig>,
    experiment: Experiment,
    base_dir: PathBuf,
    subject_count: usize,
    regions: RegionTable,
    selection: Selection,
    status: String,
    running: Option<TaskHandle>,
    result: Option<AnalysisResult>,
}

impl Shell {
    /// Start with the first condition against the second one offered for it.
    pub fn new(
        cfg: Arc<AnalysisConfig>,
        experiment: &str,
        base_dir: impl Into<PathBuf>,
        regions: RegionTable,
    ) -> Result<Self> {
        let experiment = cfg.catalog.get(experiment)?.clone();
        let cond_a = experiment.conditions.first().cloned().unwrap_or_default();
        let cond_b = {
            let others = condition_choices(&experiment, Some(cond_a.as_str()));
            others.get(1).or(others.first()).map(|s| s.to_string()).unwrap_or_default()
        };
        let subject_count = cfg.n_subjects;
        Ok(Self {
            cfg,
            experiment,
            base_dir: base_dir.into(),
            subject_count,
            regions,
            selection: Selection { cond_a, cond_b, hemisphere: Hemisphere::Left },
            status: STATUS_IDLE.to_string(),
            running: None,
            result: None,
        })
    }

    /// Limit the cohort, e.g. while developing against a partial download.
    pub fn with_subject_count(mut self, n: usize) -> Self {
        self.subject_count = n;
        self
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Choices for the second selector given the current first condition.
    pub fn cond_b_choices(&self) -> Vec<&str> {
        condition_choices(&self.experiment, Some(self.selection.cond_a.as_str()))
    }

    /// Change the first condition.  If the second one collides with it, the
    /// second is reset to the first remaining choice.
    pub fn select_cond_a(&mut self, cond: &str) -> Result<()> {
        self.experiment.condition_index(cond)?;
        self.selection.cond_a = cond.to_string();
        if self.selection.cond_b == self.selection.cond_a {
            let first = self.cond_b_choices().first().map(|s| s.to_string()).unwrap_or_default();
            self.selection.cond_b = first;
        }
        Ok(())
    }

    /// Change the second condition; it must be one of [`Shell::cond_b_choices`].
    /// Picking the first condition fails with
    /// [`ContrastError::InvalidSelection`] and leaves the selection as it was.
    pub fn select_cond_b(&mut self, cond: &str) -> Result<()> {
        self.experiment.condition_index(cond)?;
        if cond == self.selection.cond_a {
            return Err(ContrastError::InvalidSelection(cond.to_string()).into());
        }
        self.selection.cond_b = cond.to_string();
        Ok(())
    }

    pub fn select_hemisphere(&mut self, hemisphere: Hemisphere) {
        self.selection.hemisphere = hemisphere;
    }

    /// Start a computation for the current selection.
    ///
    /// # Errors
    ///
    /// * [`ContrastError::Busy`] while another computation is running.
    /// * [`ContrastError::InvalidSelection`] for identical conditions; nothing
    ///   else changes.
    pub fn submit(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(ContrastError::Busy.into());
        }
        if let Err(e) = self.selection.validate(&self.experiment) {
            warn!(error = %e, "selection rejected");
            return Err(e);
        }
        let request = ContrastRequest {
            experiment: self.experiment.name.clone(),
            cond_a: self.selection.cond_a.clone(),
            cond_b: self.selection.cond_b.clone(),
            base_dir: self.base_dir.clone(),
            subject_count: self.subject_count,
        };
        self.running = Some(ContrastTask::spawn(self.cfg.clone(), request)?);
        self.status = "Computing…".to_string();
        Ok(())
    }

    /// Apply every pending worker event.
    ///
    /// Returns `Some(outcome)` on the call that observes completion; an
    /// `Err` outcome is the failure to surface to the user.
    pub fn pump(&mut self) -> Option<Result<()>> {
        let events = self.running.as_mut()?.poll();
        let mut finished = None;
        for ev in events {
            match ev {
                TaskEvent::Progress { done, total } => self.status = progress_text(done, total),
                TaskEvent::Finished(result) => finished = Some(result),
            }
        }
        let result = finished?;
        self.running = None;
        Some(self.complete(result))
    }

    /// Block until the running computation (if any) completes.
    pub fn wait(&mut self) -> Result<()> {
        let Some(handle) = self.running.take() else {
            return Ok(());
        };
        let status = &mut self.status;
        let result = handle.wait_with(|done, total| {
            *status = progress_text(done, total);
            info!(done, total, "{}", status);
        });
        self.complete(result)
    }

    fn complete(&mut self, result: Result<GroupContrast>) -> Result<()> {
        let outcome = result.and_then(|contrast| {
            let summary = contrast.summarize(&self.regions)?;
            Ok(AnalysisResult { contrast, summary })
        });
        match outcome {
            Ok(done) => {
                self.result = Some(done);
                self.status = STATUS_DONE.to_string();
                Ok(())
            }
            Err(e) => {
                self.status = format!("Error: {e:#}");
                Err(e)
            }
        }
    }

    fn require_result(&self) -> Result<&AnalysisResult> {
        self.result.as_ref().ok_or_else(|| ContrastError::NoResult.into())
    }

    /// Export the retained summary as CSV.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        self.require_result()?.summary.save_csv(path)
    }

    /// Render the retained summary as a grouped bar chart (SVG).
    pub fn render_chart(&self, path: &Path) -> Result<()> {
        let result = self.require_result()?;
        render_summary_chart(&result.summary, &result.contrast.title(), path)
    }

    /// Per-vertex contrast for the selected hemisphere.
    pub fn project_surface(&self, map: &SurfaceMap) -> Result<Array1<f64>> {
        let result = self.require_result()?;
        map.project(&result.contrast.vector, self.selection.hemisphere)
    }
}

fn progress_text(done: usize, total: usize) -> String {
    let pct = if total == 0 { 0.0 } else { done as f64 / total as f64 * 100.0 };
    format!("Computing… ({pct:.1}%)")
}
