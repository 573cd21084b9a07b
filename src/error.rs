//! Typed failure taxonomy.
//!
//! Fallible functions in this crate return [`anyhow::Result`]; the root cause
//! is one of the [`ContrastError`] variants below whenever the failure is a
//! domain condition (as opposed to a raw I/O or parse error).  Callers that
//! need to react differently per failure kind downcast:
//!
//! ```
//! use hcp_contrast::ContrastError;
//!
//! let err: anyhow::Error = ContrastError::NoSubjects.into();
//! assert!(matches!(
//!     err.downcast_ref::<ContrastError>(),
//!     Some(ContrastError::NoSubjects)
//! ));
//! ```
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ContrastError {
    /// An expected input file is absent.  Aborts the current computation.
    #[error("data not found: {}", path.display())]
    DataNotFound { path: PathBuf },

    /// The user picked the same condition twice.
    #[error("invalid selection: conditions must differ (got '{0}' twice)")]
    InvalidSelection(String),

    /// Writing an export failed; the data being exported is retained.
    #[error("export to {} failed: {reason}", path.display())]
    ExportError { path: PathBuf, reason: String },

    #[error("unknown experiment '{0}'")]
    UnknownExperiment(String),

    #[error("unknown condition '{condition}' for experiment {experiment}")]
    UnknownCondition { experiment: String, condition: String },

    #[error("run slot {0} out of range (each experiment has runs 0 and 1)")]
    InvalidRunSlot(usize),

    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("malformed event file {} (line {line}): {reason}", path.display())]
    MalformedEvents {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("malformed npy file {}: {reason}", path.display())]
    MalformedNpy { path: PathBuf, reason: String },

    #[error("frame {frame} out of range for a signal with {n_timepoints} timepoints (condition '{condition}', trial {trial})")]
    FrameOutOfRange {
        condition: String,
        trial: usize,
        frame: usize,
        n_timepoints: usize,
    },

    #[error("trial {trial} of condition '{condition}' has no frames")]
    EmptyTrial { condition: String, trial: usize },

    #[error("condition '{0}' has no trials")]
    NoTrials(String),

    #[error("subject count must be at least 1")]
    NoSubjects,

    #[error("a computation is already running")]
    Busy,

    #[error("no result available yet")]
    NoResult,

    #[error("surface mapping has no {0} hemisphere")]
    MissingHemisphere(String),

    #[error("surface vertex {vertex} maps to region {region}, but only {n_regions} regions exist")]
    SurfaceIndexOutOfRange {
        vertex: usize,
        region: i64,
        n_regions: usize,
    },
}
