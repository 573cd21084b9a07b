//! Parcellated BOLD time series.
//!
//! Layout: `<base>/subjects/<subject>/timeseries/bold<run>_<atlas_suffix>.npy`,
//! one `[region, timepoint]` array per subject and absolute run index.
use anyhow::Result;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::ContrastError;
use crate::normalize::remove_region_mean_inplace;
use crate::npy;

/// Path of the time series for `subject` and run slot `run_slot` of `experiment`.
pub fn series_path(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    run_slot: usize,
    base_dir: &Path,
) -> Result<PathBuf> {
    let run = cfg.catalog.get(experiment)?.run_index(run_slot)?;
    Ok(base_dir
        .join("subjects")
        .join(subject.to_string())
        .join("timeseries")
        .join(cfg.bold_file_name(run)))
}

/// Load one subject's signal for one run of an experiment.
///
/// With `remove_mean` set, every region is centred on its own temporal mean
/// over the run.  The region axis is validated against `cfg.n_regions`.
///
/// # Errors
///
/// * [`ContrastError::DataNotFound`] when the file is absent.
/// * [`ContrastError::ShapeMismatch`] when the region count is wrong.
/// * [`ContrastError::MalformedNpy`] when the file is not a 2-D numeric array.
pub fn load_series(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    run_slot: usize,
    base_dir: &Path,
    remove_mean: bool,
) -> Result<Array2<f64>> {
    let path = series_path(cfg, subject, experiment, run_slot, base_dir)?;
    let mut ts = npy::read_f64_2d(&path)?;
    if ts.nrows() != cfg.n_regions {
        return Err(ContrastError::ShapeMismatch {
            what: format!("regions in {}", path.display()),
            expected: cfg.n_regions,
            got: ts.nrows(),
        }
        .into());
    }
    debug!(subject, experiment, run_slot, n_t = ts.ncols(), "loaded time series");
    if remove_mean {
        remove_region_mean_inplace(&mut ts);
    }
    Ok(ts)
}
