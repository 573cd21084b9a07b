//! Analysis configuration.
//!
//! [`AnalysisConfig`] holds every constant of the analysis: cohort size,
//! parcellation size, sampling interval, file naming and the experiment
//! catalog.  It is built once at start-up and passed by reference to every
//! loader and to the aggregator; nothing in the crate reads global state.

use crate::catalog::Catalog;
use crate::regions::Hemisphere;

/// Configuration for a group-contrast analysis.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use hcp_contrast::AnalysisConfig;
///
/// let cfg = AnalysisConfig {
///     n_subjects: 10,   // quick look at the first ten subjects
///     ..AnalysisConfig::default()
/// };
/// assert_eq!(cfg.n_regions, 360);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Number of subjects in the cohort.  Subject ids are `0..n_subjects`.
    ///
    /// Default: `339` (the HCP subset distributed for course projects).
    pub n_subjects: usize,

    /// Number of cortical regions (rows of every signal array).
    ///
    /// Loaded arrays and the region label table are validated against this
    /// value; a mismatch is reported as
    /// [`ContrastError::ShapeMismatch`](crate::ContrastError::ShapeMismatch).
    ///
    /// Default: `360` (Glasser HCP-MMP1.0 cortical parcellation).
    pub n_regions: usize,

    /// Repetition time (sampling interval) in seconds, shared by every run.
    ///
    /// Default: `0.72` s.
    pub tr: f64,

    /// File-name suffix of the parcellated time series,
    /// `bold<run>_<atlas_suffix>.npy`.
    ///
    /// Default: `"Atlas_MSMAll_Glasser360Cortical"`.
    pub atlas_suffix: String,

    /// Hemisphere of each half of the region axis, in order.
    ///
    /// The parcels are matched across hemispheres with the same order, the
    /// first half belonging to `hemispheres[0]`.
    ///
    /// Default: `[Right, Left]`.
    pub hemispheres: [Hemisphere; 2],

    /// Experiment catalog.
    pub catalog: Catalog,
}

impl Default for AnalysisConfig {
    /// Returns the HCP task-fMRI settings:
    /// 339 subjects · 360 regions · TR 0.72 s · 7 experiments.
    fn default() -> Self {
        Self {
            n_subjects: 339,
            n_regions: 360,
            tr: 0.72,
            atlas_suffix: "Atlas_MSMAll_Glasser360Cortical".to_string(),
            hemispheres: [Hemisphere::Right, Hemisphere::Left],
            catalog: Catalog::hcp(),
        }
    }
}

impl AnalysisConfig {
    /// File name of the parcellated time series for an absolute run index.
    ///
    /// # Examples
    ///
    /// ```
    /// use hcp_contrast::AnalysisConfig;
    /// let cfg = AnalysisConfig::default();
    /// assert_eq!(cfg.bold_file_name(7), "bold7_Atlas_MSMAll_Glasser360Cortical.npy");
    /// ```
    pub fn bold_file_name(&self, run: usize) -> String {
        format!("bold{run}_{}.npy", self.atlas_suffix)
    }

    /// Number of regions in each hemisphere.
    pub fn regions_per_hemisphere(&self) -> usize {
        self.n_regions / 2
    }
}
