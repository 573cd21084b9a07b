//! Grouped bar chart of a [`SummaryTable`].
//!
//! One group per network (summary row order), one bar per hemisphere:
//! `Left` at −0.2 and `Right` at +0.2 around the group centre, 0.4 wide,
//! with a "Hemisphere" legend.
use anyhow::{anyhow, bail, Result};
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::path::Path;

use crate::regions::Hemisphere;
use crate::summary::SummaryTable;

const BAR_WIDTH: f64 = 0.4;
const SIZE: (u32, u32) = (900, 600);

// Legend box, in pixels of the plotting area.
const LEGEND_WIDTH: i32 = 110;
const LEGEND_MARGIN: i32 = 10;
const LEGEND_TITLE_HEIGHT: i32 = 18;

// Matplotlib's first two cycle colours.
const LEFT_COLOR: RGBColor = RGBColor(31, 119, 180);
const RIGHT_COLOR: RGBColor = RGBColor(255, 127, 14);

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("chart rendering failed: {e}")
}

/// Value range for the y axis: always includes 0, padded by 10 %.
fn y_range(summary: &SummaryTable) -> (f64, f64) {
    let lo = summary.rows.iter().map(|r| r.contrast).fold(0.0_f64, f64::min);
    let hi = summary.rows.iter().map(|r| r.contrast).fold(0.0_f64, f64::max);
    let span = hi - lo;
    if span <= 0.0 || !span.is_finite() {
        return (-1.0, 1.0);
    }
    (lo - 0.1 * span, hi + 0.1 * span)
}

/// Top-left corners of the legend title and of the series-label box below
/// it, for a plotting area `plot_width` pixels wide.
fn legend_layout(plot_width: u32) -> ((i32, i32), (i32, i32)) {
    let x = (plot_width as i32 - LEGEND_WIDTH - LEGEND_MARGIN).max(0);
    ((x + 4, LEGEND_MARGIN), (x, LEGEND_MARGIN + LEGEND_TITLE_HEIGHT))
}

/// Write the chart as SVG to `path`.
pub fn render_summary_chart(summary: &SummaryTable, title: &str, path: &Path) -> Result<()> {
    if summary.is_empty() {
        bail!("nothing to plot: summary table is empty");
    }
    let networks: Vec<String> = summary.networks().into_iter().map(String::from).collect();
    let n = networks.len();
    let (y_lo, y_hi) = y_range(summary);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(90)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5_f64..(n as f64 - 0.5), y_lo..y_hi)
        .map_err(draw_err)?;

    let label_of = |x: &f64| -> String {
        let i = x.round();
        if (x - i).abs() < 1e-6 && i >= 0.0 && (i as usize) < n {
            networks[i as usize].clone()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&label_of)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .y_desc("Mean contrast")
        .draw()
        .map_err(draw_err)?;

    for (offset, hemi, color) in [
        (-0.2, Hemisphere::Left, LEFT_COLOR),
        (0.2, Hemisphere::Right, RIGHT_COLOR),
    ] {
        let bars: Vec<(f64, f64)> = networks
            .iter()
            .enumerate()
            .filter_map(|(i, net)| summary.value(net, hemi).map(|v| (i as f64 + offset, v)))
            .collect();
        chart
            .draw_series(bars.into_iter().map(|(x, v)| {
                Rectangle::new(
                    [(x - BAR_WIDTH / 2.0, 0.0), (x + BAR_WIDTH / 2.0, v)],
                    color.filled(),
                )
            }))
            .map_err(draw_err)?
            .label(hemi.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    let plot = chart.plotting_area().strip_coord_spec();
    let (title_at, labels_at) = legend_layout(plot.dim_in_pixel().0);
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::Coordinate(labels_at.0, labels_at.1))
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(draw_err)?;
    plot.draw(&Text::new("Hemisphere", title_at, ("sans-serif", 14).into_font()))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    tracing::info!(path = %path.display(), networks = n, "chart written");
    Ok(())
}
