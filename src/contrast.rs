//! Subject- and group-level condition contrasts.
//!
//! ```text
//! for subject in 0..N
//!   for run in {0, 1}
//!     signal  = load_series(.., remove_mean = true)     [R, T]
//!     events  = load_events(..)
//!     v[cond][run] = average_frames(signal, events, cond)   [R]
//!   contrast[subject] = mean_run(v[a]) − mean_run(v[b])     [R]
//! group = mean_subject(contrast)                             [R]
//! ```
//!
//! Any missing or malformed input aborts the whole computation; no partial
//! group result is ever produced.
use anyhow::{Context, Result};
use ndarray::Array1;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::average::average_frames;
use crate::config::AnalysisConfig;
use crate::error::ContrastError;
use crate::events::load_events;
use crate::regions::RegionTable;
use crate::summary::SummaryTable;
use crate::timeseries::load_series;

/// Per-condition vectors of one subject, each averaged over both runs.
///
/// Each run's signal and events are loaded once and shared by all
/// `conditions`.
pub fn subject_condition_vectors(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    conditions: &[&str],
    base_dir: &Path,
) -> Result<Vec<Array1<f64>>> {
    let exp = cfg.catalog.get(experiment)?;
    let mut sums = vec![Array1::<f64>::zeros(cfg.n_regions); conditions.len()];
    let n_runs = exp.runs.len();

    for run_slot in 0..n_runs {
        let signal = load_series(cfg, subject, experiment, run_slot, base_dir, true)?;
        let events = load_events(cfg, subject, experiment, run_slot, base_dir)?;
        for (sum, cond) in sums.iter_mut().zip(conditions) {
            let v = average_frames(&signal, &events, exp, cond)
                .with_context(|| format!("subject {subject}, {experiment} run {run_slot}"))?;
            *sum += &v;
        }
    }

    Ok(sums.into_iter().map(|s| s / n_runs as f64).collect())
}

/// Run-averaged per-region response of one subject to `condition`.
pub fn condition_vector(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    condition: &str,
    base_dir: &Path,
) -> Result<Array1<f64>> {
    let mut v = subject_condition_vectors(cfg, subject, experiment, &[condition], base_dir)?;
    Ok(v.remove(0))
}

/// `vector(cond_a) − vector(cond_b)` for one subject.
pub fn subject_contrast(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    cond_a: &str,
    cond_b: &str,
    base_dir: &Path,
) -> Result<Array1<f64>> {
    let v = subject_condition_vectors(cfg, subject, experiment, &[cond_a, cond_b], base_dir)?;
    Ok(&v[0] - &v[1])
}

/// Group-mean contrast between two conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupContrast {
    pub experiment: String,
    pub cond_a: String,
    pub cond_b: String,
    pub n_subjects: usize,
    /// One value per region, region-axis order.
    pub vector: Array1<f64>,
}

impl GroupContrast {
    /// Join with the region labels and average per (network, hemisphere).
    pub fn summarize(&self, regions: &RegionTable) -> Result<SummaryTable> {
        SummaryTable::from_contrast(&self.vector, regions)
    }

    /// Chart/report title, e.g. `Group contrast: 2bk_body – 0bk_body`.
    pub fn title(&self) -> String {
        format!("Group contrast: {} – {}", self.cond_a, self.cond_b)
    }
}

/// Mean over subjects `0..subject_count` of [`subject_contrast`].
///
/// `progress(done, total)` is called after each subject completes.
///
/// # Errors
///
/// [`ContrastError::NoSubjects`] for `subject_count == 0`; otherwise the first
/// error raised by any subject, which aborts the computation.
pub fn compute_group_contrast(
    cfg: &AnalysisConfig,
    experiment: &str,
    cond_a: &str,
    cond_b: &str,
    base_dir: &Path,
    subject_count: usize,
    mut progress: impl FnMut(usize, usize),
) -> Result<GroupContrast> {
    if subject_count == 0 {
        return Err(ContrastError::NoSubjects.into());
    }
    let exp = cfg.catalog.get(experiment)?;
    exp.condition_index(cond_a)?;
    exp.condition_index(cond_b)?;

    info!(experiment, cond_a, cond_b, subjects = subject_count, "computing group contrast");
    let mut sum = Array1::<f64>::zeros(cfg.n_regions);
    for subject in 0..subject_count {
        let c = subject_contrast(cfg, subject, experiment, cond_a, cond_b, base_dir)?;
        sum += &c;
        debug!(subject, "subject contrast done");
        progress(subject + 1, subject_count);
    }

    Ok(GroupContrast {
        experiment: experiment.to_string(),
        cond_a: cond_a.to_string(),
        cond_b: cond_b.to_string(),
        n_subjects: subject_count,
        vector: sum / subject_count as f64,
    })
}

/// Everything needed to run one group computation, detached from any caller
/// state so it can be moved onto a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContrastRequest {
    pub experiment: String,
    pub cond_a: String,
    pub cond_b: String,
    pub base_dir: PathBuf,
    pub subject_count: usize,
}

impl ContrastRequest {
    pub fn run(&self, cfg: &AnalysisConfig, progress: impl FnMut(usize, usize)) -> Result<GroupContrast> {
        compute_group_contrast(
            cfg,
            &self.experiment,
            &self.cond_a,
            &self.cond_b,
            &self.base_dir,
            self.subject_count,
            progress,
        )
    }
}
