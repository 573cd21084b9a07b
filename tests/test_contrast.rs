mod common;
use common::{assert_vec_close, synthetic_cohort, EXPERIMENT};
use hcp_contrast::{
    compute_group_contrast, condition_vector, subject_contrast, ContrastError, Hemisphere,
    RegionTable,
};

fn no_progress(_: usize, _: usize) {}

#[test]
fn subject_contrasts_match_hand_computation() {
    let ds = synthetic_cohort("subject_contrast");
    let s0 = subject_contrast(&ds.cfg, 0, EXPERIMENT, "loss", "win", ds.path()).unwrap();
    assert_vec_close(&s0, &[3.0, -1.0, 2.0, -1.0]);
    let s1 = subject_contrast(&ds.cfg, 1, EXPERIMENT, "loss", "win", ds.path()).unwrap();
    assert_vec_close(&s1, &[0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn condition_vector_is_mean_removed_and_run_averaged() {
    // Region 0 of subject 0: run 0 centred loss = 3 − (3+1)/3 = 5/3,
    // run 1 = 5 − (5+1)/3 = 3 → mean 7/3.
    let ds = synthetic_cohort("condition_vector");
    let v = condition_vector(&ds.cfg, 0, EXPERIMENT, "loss", ds.path()).unwrap();
    approx::assert_abs_diff_eq!(v[0], 7.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn group_contrast_and_summary_end_to_end() {
    let ds = synthetic_cohort("end_to_end");
    let mut seen = Vec::new();
    let group = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "win", ds.path(), 2, |d, t| {
        seen.push((d, t))
    })
    .unwrap();

    assert_eq!(seen, vec![(1, 2), (2, 2)]);
    assert_eq!(group.n_subjects, 2);
    assert_vec_close(&group.vector, &[1.5, -0.5, 1.0, -0.5]);

    let regions = RegionTable::load(&ds.cfg, ds.path()).unwrap();
    let summary = group.summarize(&regions).unwrap();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary.rows[0].network, "Auditory");
    assert_eq!(summary.rows[0].hemi, Hemisphere::Left);
    approx::assert_abs_diff_eq!(summary.rows[0].contrast, 0.25, epsilon = 1e-12);
    assert_eq!(summary.rows[1].network, "Visual");
    assert_eq!(summary.rows[1].hemi, Hemisphere::Right);
    approx::assert_abs_diff_eq!(summary.rows[1].contrast, 0.5, epsilon = 1e-12);
}

#[test]
fn contrast_is_antisymmetric() {
    let ds = synthetic_cohort("antisymmetry");
    let ab = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "win", ds.path(), 2, no_progress).unwrap();
    let ba = compute_group_contrast(&ds.cfg, EXPERIMENT, "win", "loss", ds.path(), 2, no_progress).unwrap();
    for (x, y) in ab.vector.iter().zip(ba.vector.iter()) {
        assert_eq!(*x, -*y);
    }
}

#[test]
fn identical_conditions_give_zero_contrast() {
    let ds = synthetic_cohort("identical");
    let g = compute_group_contrast(&ds.cfg, EXPERIMENT, "win", "win", ds.path(), 2, no_progress).unwrap();
    assert!(g.vector.iter().all(|&v| v == 0.0));
}

#[test]
fn missing_run_aborts_the_whole_computation() {
    let ds = synthetic_cohort("missing_run");
    std::fs::remove_file(ds.bold_path(1, 12)).unwrap();

    let mut progress = Vec::new();
    let err = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "win", ds.path(), 2, |d, _| {
        progress.push(d)
    })
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ContrastError>(),
        Some(ContrastError::DataNotFound { path }) if path.ends_with("bold12_Atlas_MSMAll_Glasser360Cortical.npy")
    ));
    // Subject 0 finished, subject 1 did not.
    assert_eq!(progress, vec![1]);
}

#[test]
fn frames_beyond_the_run_fail() {
    let ds = synthetic_cohort("frame_range");
    // 4.32 s / 0.72 s = frame 6, one past the last of 6 timepoints.
    ds.write_ev(0, "tfMRI_GAMBLING_LR", "win", &[(4.32, 0.72, 1.0)]);
    let err = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "win", ds.path(), 1, no_progress)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ContrastError>(),
        Some(ContrastError::FrameOutOfRange { frame: 6, n_timepoints: 6, .. })
    ));
}

#[test]
fn oversized_ev_timings_fail_without_allocating() {
    // 1e300 s does not fit a frame index; 1e9 s would span ~1.4e9 frames.
    for row in [(0.0, 1e300, 1.0), (1e300, 1.44, 1.0), (0.0, 1e9, 1.0)] {
        let ds = synthetic_cohort("oversized_ev");
        ds.write_ev(0, "tfMRI_GAMBLING_RL", "win", &[row]);
        let err = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "win", ds.path(), 1, no_progress)
            .unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ContrastError>(),
                Some(ContrastError::FrameOutOfRange { n_timepoints: 6, .. })
            ),
            "row {row:?}: {err:#}"
        );
    }
}

#[test]
fn zero_subjects_is_rejected() {
    let ds = synthetic_cohort("zero_subjects");
    let err = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "win", ds.path(), 0, no_progress)
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<ContrastError>(), Some(ContrastError::NoSubjects)));
}

#[test]
fn unknown_condition_is_rejected_before_loading() {
    let ds = synthetic_cohort("unknown_condition");
    let err = compute_group_contrast(&ds.cfg, EXPERIMENT, "loss", "draw", ds.path(), 2, no_progress)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ContrastError>(),
        Some(ContrastError::UnknownCondition { .. })
    ));
}
