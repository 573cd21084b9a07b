/// subject_steps: load one subject, run each analysis step, write every
/// intermediate array to a safetensors file for comparison against the
/// NumPy reference notebook.
///
/// Output keys (R = regions, T = timepoints of the run):
///   raw_run{k}            [R, T]  f64  time series as stored
///   centred_run{k}        [R, T]  f64  after per-region mean removal
///   region_mean_run{k}    [R]     f64  the removed means
///   cond_a_run{k}         [R]     f64  average_frames for cond_a
///   cond_b_run{k}         [R]     f64  average_frames for cond_b
///   cond_a / cond_b       [R]     f64  mean over both runs
///   contrast              [R]     f64  cond_a − cond_b
///   n_trials_a / n_trials_b  [2]  i64  trials per run
use anyhow::Result;
use clap::Parser;
use ndarray::Array1;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hcp_contrast::{
    average::average_frames,
    events::load_events,
    io::StWriter,
    normalize::remove_region_mean_inplace,
    timeseries::load_series,
    AnalysisConfig,
};

#[derive(Parser, Debug)]
#[command(name = "subject_steps")]
struct Args {
    /// Dataset root holding `subjects/`.
    #[arg(long, default_value = "./hcp/hcp_task")]
    base_dir: PathBuf,

    /// 0-based subject id.
    #[arg(long, default_value_t = 0)]
    subject: usize,

    /// Experiment name.
    #[arg(long, default_value = "WM")]
    experiment: String,

    /// First condition.
    #[arg(long)]
    cond_a: String,

    /// Second condition.
    #[arg(long)]
    cond_b: String,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = AnalysisConfig::default();
    let exp = cfg.catalog.get(&args.experiment)?;
    let mut w = StWriter::new();

    let mut sum_a = Array1::<f64>::zeros(cfg.n_regions);
    let mut sum_b = Array1::<f64>::zeros(cfg.n_regions);
    let mut n_trials_a = Vec::new();
    let mut n_trials_b = Vec::new();

    for run_slot in 0..exp.runs.len() {
        // ── 1. Load ────────────────────────────────────────────────────────
        let t_load = now();
        let raw = load_series(&cfg, args.subject, &args.experiment, run_slot, &args.base_dir, false)?;
        let events = load_events(&cfg, args.subject, &args.experiment, run_slot, &args.base_dir)?;
        let ms_load = t_load.elapsed().as_secs_f64() * 1000.0;

        // ── 2. Mean removal ────────────────────────────────────────────────
        let t_mean = now();
        let mut centred = raw.clone();
        let means = remove_region_mean_inplace(&mut centred);
        let ms_mean = t_mean.elapsed().as_secs_f64() * 1000.0;

        // ── 3. Condition averages ──────────────────────────────────────────
        let t_avg = now();
        let a = average_frames(&centred, &events, exp, &args.cond_a)?;
        let b = average_frames(&centred, &events, exp, &args.cond_b)?;
        let ms_avg = t_avg.elapsed().as_secs_f64() * 1000.0;

        eprintln!(
            "TIMING run={run_slot} load={ms_load:.4}ms mean={ms_mean:.4}ms average={ms_avg:.4}ms  ({} × {})",
            raw.nrows(),
            raw.ncols(),
        );

        n_trials_a.push(events[exp.condition_index(&args.cond_a)?].len() as i64);
        n_trials_b.push(events[exp.condition_index(&args.cond_b)?].len() as i64);
        w.add_f64_arr2(&format!("raw_run{run_slot}"), &raw);
        w.add_f64_arr2(&format!("centred_run{run_slot}"), &centred);
        w.add_f64_arr1(&format!("region_mean_run{run_slot}"), &means);
        w.add_f64_arr1(&format!("cond_a_run{run_slot}"), &a);
        w.add_f64_arr1(&format!("cond_b_run{run_slot}"), &b);
        sum_a += &a;
        sum_b += &b;
    }

    // ── 4. Run means + contrast ────────────────────────────────────────────
    let n_runs = exp.runs.len() as f64;
    let cond_a = sum_a / n_runs;
    let cond_b = sum_b / n_runs;
    let contrast = &cond_a - &cond_b;

    eprintln!("Writing → {}", args.output.display());
    w.add_f64_arr1("cond_a", &cond_a);
    w.add_f64_arr1("cond_b", &cond_b);
    w.add_f64_arr1("contrast", &contrast);
    w.add_i64("n_trials_a", &n_trials_a, &[n_trials_a.len()]);
    w.add_i64("n_trials_b", &n_trials_b, &[n_trials_b.len()]);
    w.write(&args.output)?;

    eprintln!("Done.");
    Ok(())
}

/// Return `std::time::Instant::now()` (used for internal timing).
#[inline(always)]
fn now() -> std::time::Instant { std::time::Instant::now() }
