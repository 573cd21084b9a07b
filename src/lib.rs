//! # hcp-contrast — task-fMRI group contrasts in Rust
//!
//! `hcp-contrast` loads parcellated task-fMRI time series of the Human
//! Connectome Project (360 Glasser regions per subject and run), averages the
//! signal within each experimental condition using the event timing files,
//! contrasts two conditions, and aggregates the contrast over subjects and
//! over (network, hemisphere) groups of regions.
//!
//! ## Pipeline overview
//!
//! ```text
//! <base>/subjects/<id>/timeseries/bold<run>_<suffix>.npy      <base>/subjects/<id>/EVs/<task>/<cond>.txt
//!   │                                                            │
//!   ├─ timeseries::load_series()   [R, T], region mean removed   ├─ events::load_events()  frames per trial
//!   └──────────────────────────────┬─────────────────────────────┘
//!                                  ├─ average::average_frames()        mean within trial, then across trials
//!                                  ├─ contrast::subject_contrast()     run-mean(cond_a) − run-mean(cond_b)
//!                                  ├─ contrast::compute_group_contrast()   mean over subjects → [R]
//!                                  └─ summary::SummaryTable            mean per (network, hemisphere)
//!                                        │
//!                                        ├─→ network,hemi,contrast CSV
//!                                        ├─→ grouped bar chart (SVG)
//!                                        └─→ per-vertex surface values
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use hcp_contrast::{compute_group_contrast, AnalysisConfig, RegionTable};
//! use std::path::Path;
//!
//! let cfg  = AnalysisConfig::default();
//! let base = Path::new("./hcp/hcp_task");
//!
//! let group = compute_group_contrast(&cfg, "WM", "2bk_body", "0bk_body", base, 20,
//!     |done, total| eprintln!("{done}/{total}")).unwrap();
//!
//! let regions = RegionTable::load(&cfg, base).unwrap();
//! let summary = group.summarize(&regions).unwrap();
//! summary.save_csv(Path::new("wm_contrast.csv")).unwrap();
//! ```
//!
//! ## Running in the background
//!
//! ```no_run
//! use hcp_contrast::{AnalysisConfig, ContrastRequest, ContrastTask};
//! use std::sync::Arc;
//!
//! let cfg = Arc::new(AnalysisConfig::default());
//! let request = ContrastRequest {
//!     experiment: "GAMBLING".into(),
//!     cond_a: "win".into(),
//!     cond_b: "loss".into(),
//!     base_dir: "./hcp/hcp_task".into(),
//!     subject_count: cfg.n_subjects,
//! };
//! let handle = ContrastTask::spawn(cfg, request).unwrap();
//! let group = handle.wait_with(|done, total| eprintln!("{done}/{total}")).unwrap();
//! ```

pub mod average;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod contrast;
pub mod error;
pub mod events;
pub mod io;
pub mod normalize;
pub mod npy;
pub mod regions;
pub mod shell;
pub mod summary;
pub mod surface;
pub mod task;
pub mod timeseries;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `hcp_contrast::Foo` without having to know the internal module layout.

// config + catalog
pub use config::AnalysisConfig;
pub use catalog::{Catalog, Experiment};

// errors
pub use error::ContrastError;

// loaders
pub use timeseries::load_series;
pub use events::{load_events, frame_range, EventSet, Frames, Trial};
pub use normalize::remove_region_mean_inplace;
pub use regions::{Hemisphere, RegionLabel, RegionTable};

// analysis
pub use average::{average_frames, average_trials};
pub use contrast::{
    compute_group_contrast, condition_vector, subject_condition_vectors, subject_contrast,
    ContrastRequest, GroupContrast,
};
pub use summary::{SummaryRow, SummaryTable};

// background work + presentation
pub use task::{ContrastTask, TaskEvent, TaskHandle};
pub use shell::{condition_choices, AnalysisResult, Selection, Shell};
pub use chart::render_summary_chart;
pub use surface::{write_surface_values, SurfaceMap};

// file formats
pub use io::{StWriter, TensorArchive};
