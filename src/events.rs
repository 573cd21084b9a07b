//! Event timing (EV) files → per-trial frame sets.
//!
//! Layout: `<base>/subjects/<subject>/EVs/<task_key>/<condition>.txt`, one
//! whitespace-delimited table per condition with columns
//! `onset  duration  amplitude` (seconds, seconds, unitless), one row per
//! trial.
//!
//! A trial covers the frames
//! `floor(onset / TR) .. floor(onset / TR) + ceil(duration / TR)`.
use anyhow::{Context, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::ContrastError;

/// Frames of one trial, `start..start + length`.
pub type Frames = Range<usize>;

/// Per condition (catalog order) → per trial (file order) → frames.
pub type EventSet = Vec<Vec<Frames>>;

/// Quotients this close to an integer are treated as that integer, so that
/// e.g. `2.16 / 0.72` (which is `3.0000000000000004` in binary floating
/// point) spans 3 frames rather than 4.
const SNAP_EPS: f64 = 1e-9;

/// One row of an EV file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub onset: f64,
    pub duration: f64,
    pub amplitude: f64,
}

impl Trial {
    pub fn frames(&self, tr: f64) -> Range<usize> {
        frame_range(self.onset, self.duration, tr)
    }
}

fn snap(x: f64) -> f64 {
    let r = x.round();
    if (x - r).abs() < SNAP_EPS {
        r
    } else {
        x
    }
}

/// Frame range covered by a trial starting at `onset` lasting `duration`
/// seconds, sampled every `tr` seconds.
///
/// Bounds that do not fit a `usize` saturate at `usize::MAX`; such a range
/// can never lie inside a run and is rejected when averaged.
///
/// # Examples
///
/// ```
/// use hcp_contrast::events::frame_range;
/// assert_eq!(frame_range(1.44, 2.16, 0.72), 2..5);
/// ```
pub fn frame_range(onset: f64, duration: f64, tr: f64) -> Range<usize> {
    let start = snap(onset / tr).floor().max(0.0) as usize;
    let len = snap(duration / tr).ceil().max(0.0) as usize;
    start..start.saturating_add(len)
}

/// Parse an EV table.  `#` starts a comment; blank lines are skipped.
/// Columns beyond the third are ignored.
pub fn parse_ev_table(text: &str, path: &Path) -> Result<Vec<Trial>> {
    let malformed = |line: usize, reason: String| ContrastError::MalformedEvents {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut trials = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields = line
            .split_whitespace()
            .map(|f| f.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| malformed(i + 1, e.to_string()))?;
        if fields.len() < 3 {
            return Err(malformed(i + 1, format!("expected 3 columns, found {}", fields.len())).into());
        }
        let trial = Trial { onset: fields[0], duration: fields[1], amplitude: fields[2] };
        if !trial.onset.is_finite() || !trial.duration.is_finite() {
            return Err(malformed(i + 1, "non-finite onset or duration".into()).into());
        }
        if trial.onset < 0.0 || trial.duration < 0.0 {
            return Err(malformed(i + 1, "negative onset or duration".into()).into());
        }
        trials.push(trial);
    }
    Ok(trials)
}

/// Read one EV file.
pub fn read_ev_table(path: &Path) -> Result<Vec<Trial>> {
    if !path.is_file() {
        return Err(ContrastError::DataNotFound { path: path.to_path_buf() }.into());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_ev_table(&text, path)
}

/// Directory holding the EV files of one run.
pub fn ev_dir(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    run_slot: usize,
    base_dir: &Path,
) -> Result<PathBuf> {
    let task_key = cfg.catalog.get(experiment)?.task_key(run_slot)?;
    Ok(base_dir
        .join("subjects")
        .join(subject.to_string())
        .join("EVs")
        .join(task_key))
}

/// Load the frame sets of every condition of `experiment` for one run.
///
/// The outer `Vec` follows the catalog's condition order, the inner one the
/// trial order of each file.
pub fn load_events(
    cfg: &AnalysisConfig,
    subject: usize,
    experiment: &str,
    run_slot: usize,
    base_dir: &Path,
) -> Result<EventSet> {
    let exp = cfg.catalog.get(experiment)?;
    let dir = ev_dir(cfg, subject, experiment, run_slot, base_dir)?;

    exp.conditions
        .iter()
        .map(|cond| -> Result<Vec<Frames>> {
            let trials = read_ev_table(&dir.join(format!("{cond}.txt")))?;
            debug!(subject, experiment, run_slot, condition = %cond, n_trials = trials.len(), "loaded events");
            Ok(trials.iter().map(|t| t.frames(cfg.tr)).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_conversion_uses_floor_and_ceil() {
        assert_eq!(frame_range(1.44, 2.16, 0.72), 2..5);
        // onset mid-frame rounds down, partial duration rounds up.
        assert_eq!(frame_range(1.0, 1.0, 0.72), 1..3);
        assert_eq!(frame_range(0.0, 0.0, 0.72), 0..0);
    }

    #[test]
    fn oversized_timings_saturate() {
        assert_eq!(frame_range(0.0, 1e300, 0.72), 0..usize::MAX);
        assert_eq!(frame_range(1e300, 1.44, 0.72), usize::MAX..usize::MAX);
    }

    #[test]
    fn parses_rows_and_skips_comments() {
        let text = "# onset duration amplitude\n\n8.0 27.5 1.0\n 71.1  27.5 1 # block 2\n";
        let trials = parse_ev_table(text, Path::new("x.txt")).unwrap();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[1], Trial { onset: 71.1, duration: 27.5, amplitude: 1.0 });
    }

    #[test]
    fn empty_table_has_no_trials() {
        assert!(parse_ev_table("", Path::new("x.txt")).unwrap().is_empty());
    }

    #[test]
    fn short_row_reports_line_number() {
        let err = parse_ev_table("1 2 3\n4 5\n", Path::new("x.txt")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContrastError>(),
            Some(ContrastError::MalformedEvents { line: 2, .. })
        ));
    }

    #[test]
    fn negative_onset_is_rejected() {
        assert!(parse_ev_table("-1 2 1\n", Path::new("x.txt")).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_ev_table("onset duration amplitude\n", Path::new("x.txt")).is_err());
    }
}
