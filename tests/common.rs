//! Shared helpers: a synthetic dataset laid out like the HCP task release,
//! written into a fresh temp directory and removed on drop.
use hcp_contrast::{npy, AnalysisConfig};
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const EXPERIMENT: &str = "GAMBLING";

pub struct Dataset {
    pub root: PathBuf,
    pub cfg: AnalysisConfig,
}

impl Dataset {
    #[allow(unused)]
    pub fn empty(tag: &str, cfg: AnalysisConfig) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir()
            .join(format!("hcp_contrast_{tag}_{}_{n}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        Self { root, cfg }
    }

    #[allow(unused)]
    pub fn bold_path(&self, subject: usize, run: usize) -> PathBuf {
        self.root
            .join("subjects")
            .join(subject.to_string())
            .join("timeseries")
            .join(self.cfg.bold_file_name(run))
    }

    #[allow(unused)]
    pub fn write_series(&self, subject: usize, run: usize, data: &Array2<f64>) {
        let path = self.bold_path(subject, run);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        npy::write_f64(&path, data.view().into_dyn()).unwrap();
    }

    #[allow(unused)]
    pub fn ev_path(&self, subject: usize, task_key: &str, cond: &str) -> PathBuf {
        self.root
            .join("subjects")
            .join(subject.to_string())
            .join("EVs")
            .join(task_key)
            .join(format!("{cond}.txt"))
    }

    #[allow(unused)]
    pub fn write_ev(&self, subject: usize, task_key: &str, cond: &str, rows: &[(f64, f64, f64)]) {
        let path = self.ev_path(subject, task_key, cond);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let text: String = rows
            .iter()
            .map(|(o, d, a)| format!("{o}\t{d}\t{a}\n"))
            .collect();
        std::fs::write(path, text).unwrap();
    }

    #[allow(unused)]
    pub fn write_regions(&self, names: &[&str], networks: &[&str]) {
        let table = Array2::from_shape_fn((names.len(), 3), |(r, f)| match f {
            0 => names[r].to_string(),
            1 => networks[r].to_string(),
            _ => "0.5".to_string(),
        });
        npy::write_text(&self.root.join("regions.npy"), table.view().into_dyn()).unwrap();
    }

    #[allow(unused)]
    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Config for the 4-region synthetic cohort: 2 subjects, 2 regions per
/// hemisphere.
#[allow(unused)]
pub fn small_cfg() -> AnalysisConfig {
    AnalysisConfig { n_subjects: 2, n_regions: 4, ..AnalysisConfig::default() }
}

/// Per-region signal levels during the `loss` and `win` trials of one run.
#[allow(unused)]
pub struct RunLevels {
    pub loss: [f64; 4],
    pub win: [f64; 4],
}

/// Hand-picked levels, `LEVELS[subject][run_slot]`.
///
/// Per-run contrasts (loss − win):
///   s0: [2, 0, 2, −2] and [4, −2, 2, 0]  → subject [3, −1, 2, −1]
///   s1: [−1; 4]       and [1; 4]         → subject [0; 4]
///   group: [1.5, −0.5, 1.0, −0.5]
#[allow(unused)]
pub const LEVELS: [[RunLevels; 2]; 2] = [
    [
        RunLevels { loss: [3.0, 1.0, 2.0, 0.0], win: [1.0, 1.0, 0.0, 2.0] },
        RunLevels { loss: [5.0, 1.0, 2.0, 0.0], win: [1.0, 3.0, 0.0, 0.0] },
    ],
    [
        RunLevels { loss: [0.0; 4], win: [1.0; 4] },
        RunLevels { loss: [2.0; 4], win: [1.0; 4] },
    ],
];

/// Six timepoints: loss at frames {0, 1}, win at frames {3, 4}, zero at 2
/// and 5, plus a region offset of `10 · r` that mean removal takes out.
#[allow(unused)]
pub fn run_signal(levels: &RunLevels) -> Array2<f64> {
    Array2::from_shape_fn((4, 6), |(r, t)| {
        let v = match t {
            0 | 1 => levels.loss[r],
            3 | 4 => levels.win[r],
            _ => 0.0,
        };
        v + 10.0 * r as f64
    })
}

/// The 2-subject, 4-region GAMBLING cohort with one trial per condition per run.
///
/// With TR = 0.72 s: loss at 0.00 s for 1.44 s → frames {0, 1};
/// win at 2.16 s for 1.44 s → frames {3, 4}.
#[allow(unused)]
pub fn synthetic_cohort(tag: &str) -> Dataset {
    let ds = Dataset::empty(tag, small_cfg());
    let exp = ds.cfg.catalog.get(EXPERIMENT).unwrap().clone();
    for (subject, runs) in LEVELS.iter().enumerate() {
        for (slot, levels) in runs.iter().enumerate() {
            ds.write_series(subject, exp.runs[slot], &run_signal(levels));
            let key = exp.task_key(slot).unwrap();
            ds.write_ev(subject, &key, "loss", &[(0.0, 1.44, 1.0)]);
            ds.write_ev(subject, &key, "win", &[(2.16, 1.44, 1.0)]);
        }
    }
    ds.write_regions(&["R_a", "R_b", "L_a", "L_b"], &["Visual", "Visual", "Auditory", "Auditory"]);
    ds
}

#[allow(unused)]
pub fn assert_vec_close(got: &Array1<f64>, expected: &[f64]) {
    assert_eq!(got.len(), expected.len(), "length");
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!((g - e).abs() < 1e-12, "element {i}: got {g} expected {e}");
    }
}
