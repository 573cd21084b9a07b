use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hcp_contrast::{npy, AnalysisConfig, Hemisphere, RegionTable, Shell, SurfaceMap, write_surface_values};

#[derive(Parser, Debug)]
#[command(name = "contrast", about = "Group contrast between two task-fMRI conditions")]
struct Args {
    /// Dataset root holding `subjects/` and `regions.npy`.
    #[arg(long, default_value = "./hcp/hcp_task")]
    base_dir: PathBuf,

    /// Experiment name (see --list).
    #[arg(long, default_value = "WM")]
    experiment: String,

    /// First (control) condition. Defaults to the experiment's first condition.
    #[arg(long)]
    cond_a: Option<String>,

    /// Second (experimental) condition.
    #[arg(long)]
    cond_b: Option<String>,

    /// Hemisphere used for the surface projection.
    #[arg(long, default_value = "left")]
    hemi: Hemisphere,

    /// Number of subjects to include (default: whole cohort).
    #[arg(long)]
    subjects: Option<usize>,

    /// Write the network × hemisphere summary as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the grouped bar chart as SVG.
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Safetensors archive with per-hemisphere vertex → region indices.
    #[arg(long, requires = "surface_out")]
    surface_map: Option<PathBuf>,

    /// Output safetensors for the projected per-vertex contrast.
    #[arg(long, requires = "surface_map")]
    surface_out: Option<PathBuf>,

    /// Write the per-region group contrast as a float64 .npy.
    #[arg(long)]
    save_vector: Option<PathBuf>,

    /// Print the experiment catalog and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = Arc::new(AnalysisConfig::default());

    if args.list {
        for exp in cfg.catalog.iter() {
            println!("{:<11} runs {:?}  {}", exp.name, exp.runs, exp.conditions.join(", "));
        }
        return Ok(());
    }

    let regions = RegionTable::load(&cfg, &args.base_dir)?;
    let n_subjects = args.subjects.unwrap_or(cfg.n_subjects);
    let mut shell = Shell::new(cfg.clone(), &args.experiment, &args.base_dir, regions)?
        .with_subject_count(n_subjects);

    if let Some(a) = &args.cond_a {
        shell.select_cond_a(a)?;
    }
    if let Some(b) = &args.cond_b {
        shell.select_cond_b(b)?;
    }
    shell.select_hemisphere(args.hemi);

    let sel = shell.selection().clone();
    info!(experiment = %args.experiment, cond_a = %sel.cond_a, cond_b = %sel.cond_b, subjects = n_subjects, "submitting");
    shell.submit()?;
    if let Err(e) = shell.wait() {
        error!("{}", shell.status());
        return Err(e);
    }

    let Some(result) = shell.result() else {
        anyhow::bail!("computation finished without a result");
    };
    println!("{}", result.contrast.title());
    println!("{:<24} {:<6} {:>12}", "network", "hemi", "contrast");
    for row in &result.summary.rows {
        println!("{:<24} {:<6} {:>12.6}", row.network, row.hemi, row.contrast);
    }

    if let Some(path) = &args.csv {
        shell.export_csv(path)?;
        println!("Written → {}", path.display());
    }
    if let Some(path) = &args.chart {
        shell.render_chart(path)?;
        println!("Written → {}", path.display());
    }
    if let Some(path) = &args.save_vector {
        npy::write_f64(path, result.contrast.vector.view().into_dyn())?;
        println!("Written → {}", path.display());
    }
    if let (Some(map_path), Some(out)) = (&args.surface_map, &args.surface_out) {
        let map = SurfaceMap::load(map_path)?;
        let values = shell.project_surface(&map)?;
        write_surface_values(out, &values, sel.hemisphere)?;
        println!("Written → {} ({} vertices)", out.display(), values.len());
    }

    Ok(())
}
