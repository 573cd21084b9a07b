//! Condition averaging.
//!
//! For one condition: per trial, the mean of the signal over the trial's
//! frames (per region); then the mean of those per-trial vectors.
//!
//! A trial reaching past the end of the signal fails the computation; frames
//! are never clamped.
use anyhow::Result;
use ndarray::{s, Array1, Array2, Axis};

use crate::catalog::Experiment;
use crate::error::ContrastError;
use crate::events::{EventSet, Frames};

/// Average `signal` ([R, T]) over the trials of one condition.
///
/// `label` names the condition in error messages.
pub fn average_trials(signal: &Array2<f64>, trials: &[Frames], label: &str) -> Result<Array1<f64>> {
    if trials.is_empty() {
        return Err(ContrastError::NoTrials(label.to_string()).into());
    }
    let n_t = signal.ncols();
    let mut acc = Array1::<f64>::zeros(signal.nrows());

    for (i, frames) in trials.iter().enumerate() {
        if frames.end > n_t {
            return Err(ContrastError::FrameOutOfRange {
                condition: label.to_string(),
                trial: i,
                frame: frames.start.max(n_t),
                n_timepoints: n_t,
            }
            .into());
        }
        if frames.is_empty() {
            return Err(ContrastError::EmptyTrial { condition: label.to_string(), trial: i }.into());
        }
        let trial_mean = signal
            .slice(s![.., frames.clone()])
            .mean_axis(Axis(1))
            .ok_or_else(|| ContrastError::EmptyTrial { condition: label.to_string(), trial: i })?;
        acc += &trial_mean;
    }

    acc /= trials.len() as f64;
    Ok(acc)
}

/// Per-region average of `condition` for one run.
///
/// `events` must hold one entry per condition of `experiment`, in catalog
/// order (as returned by [`crate::events::load_events`]).
pub fn average_frames(
    signal: &Array2<f64>,
    events: &EventSet,
    experiment: &Experiment,
    condition: &str,
) -> Result<Array1<f64>> {
    let idx = experiment.condition_index(condition)?;
    if events.len() != experiment.conditions.len() {
        return Err(ContrastError::ShapeMismatch {
            what: format!("event conditions for {}", experiment.name),
            expected: experiment.conditions.len(),
            got: events.len(),
        }
        .into());
    }
    average_trials(signal, &events[idx], condition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn two_cond_experiment() -> Experiment {
        Experiment::new("TEST", [1, 2], &["a", "b"])
    }

    #[test]
    fn averages_within_then_across_trials() {
        // Region 0 ramps 0..6, region 1 is constant 10.
        let signal = arr2(&[[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], [10.0; 6]]);
        // Trial means for region 0: mean(0,1)=0.5 and mean(3,4,5)=4.0 → 2.25.
        // (Frame-weighted pooling would give 2.6.)
        let events: EventSet = vec![vec![0..2, 3..6], vec![2..3]];
        let v = average_frames(&signal, &events, &two_cond_experiment(), "a").unwrap();
        assert_abs_diff_eq!(v[0], 2.25, epsilon = 1e-12);
        assert_abs_diff_eq!(v[1], 10.0, epsilon = 1e-12);

        let v = average_frames(&signal, &events, &two_cond_experiment(), "b").unwrap();
        assert_abs_diff_eq!(v[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn trial_order_does_not_matter() {
        let signal = Array2::from_shape_fn((5, 40), |(r, t)| ((r * 13 + t * 7) as f64).sin());
        let trials: Vec<Frames> = vec![1..4, 10..12, 20..24, 35..36];
        let mut reversed = trials.clone();
        reversed.reverse();
        let a = average_trials(&signal, &trials, "x").unwrap();
        let b = average_trials(&signal, &reversed, "x").unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn out_of_range_frame_fails() {
        let signal = Array2::<f64>::zeros((2, 4));
        let err = average_trials(&signal, &[2..5], "x").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ContrastError>(),
            Some(ContrastError::FrameOutOfRange { frame: 4, n_timepoints: 4, .. })
        ));
    }

    #[test]
    fn saturated_ranges_are_out_of_range() {
        let signal = Array2::<f64>::zeros((2, 4));
        for trial in [0..usize::MAX, usize::MAX..usize::MAX, 6..6] {
            let err = average_trials(&signal, &[trial], "x").unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ContrastError>(),
                Some(ContrastError::FrameOutOfRange { n_timepoints: 4, .. })
            ));
        }
    }

    #[test]
    fn empty_trial_and_no_trials_fail() {
        let signal = Array2::<f64>::zeros((2, 4));
        assert!(matches!(
            average_trials(&signal, &[1..1], "x").unwrap_err().downcast_ref::<ContrastError>(),
            Some(ContrastError::EmptyTrial { trial: 0, .. })
        ));
        assert!(matches!(
            average_trials(&signal, &[], "x").unwrap_err().downcast_ref::<ContrastError>(),
            Some(ContrastError::NoTrials(_))
        ));
    }

    #[test]
    fn unknown_condition_fails() {
        let signal = Array2::<f64>::zeros((2, 4));
        let events: EventSet = vec![vec![0..1], vec![1..2]];
        assert!(average_frames(&signal, &events, &two_cond_experiment(), "c").is_err());
    }
}
