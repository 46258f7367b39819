//! Horizontal bar chart of the per-group totals, written as SVG.

use std::path::Path;

use obslog_core::error::{ObslogError, Result};
use obslog_data::aggregator::SummaryRow;
use plotters::prelude::*;
use tracing::debug;

pub const CHART_TITLE: &str = "Sum of \"ON\" science source/line scan duration";
pub const X_LABEL: &str = "Duration [min]";

const WIDTH: u32 = 1024;
const ROW_HEIGHT: u32 = 28;
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

fn render_error<E: std::fmt::Display>(err: E) -> ObslogError {
    ObslogError::Render(err.to_string())
}

/// Draw one bar per summary row, top to bottom in row order.
///
/// The image grows with the number of groups. An empty summary is a
/// [`ObslogError::Render`] error since there is nothing to draw.
pub fn plot_summary(rows: &[SummaryRow], path: &Path) -> Result<()> {
    if rows.is_empty() {
        return Err(ObslogError::Render(
            "nothing to plot: the summary is empty".to_string(),
        ));
    }

    let labels: Vec<String> = rows.iter().map(SummaryRow::label).collect();
    let minutes: Vec<f64> = rows.iter().map(SummaryRow::minutes).collect();
    let x_max = minutes.iter().copied().fold(1.0, f64::max) * 1.1;
    let n = rows.len();

    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32 * 8 + 20;
    let height = 140 + ROW_HEIGHT * n as u32;

    let root = SVGBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(CHART_TITLE, ("sans-serif", 22))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, label_width.min(WIDTH / 2))
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(0.0..x_max, (0..n).into_segmented())
        .map_err(render_error)?;

    // First row at the top: segment i holds row n - 1 - i.
    let label_for = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) if *i < n => labels[n - 1 - *i].clone(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n + 1)
        .y_label_formatter(&label_for)
        .x_desc(X_LABEL)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .draw()
        .map_err(render_error)?;

    chart
        .draw_series(minutes.iter().enumerate().map(|(idx, value)| {
            let slot = n - 1 - idx;
            let mut bar = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(slot)),
                    (*value, SegmentValue::Exact(slot + 1)),
                ],
                BAR_COLOR.filled(),
            );
            bar.set_margin(4, 4, 0, 0);
            bar
        }))
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    debug!("Plotted {} groups to {}", n, path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
