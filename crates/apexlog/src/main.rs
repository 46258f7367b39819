mod bootstrap;

use anyhow::{Context, Result};
use clap::Parser;
use obslog_core::settings::{OutputFormat, Settings};
use obslog_data::aggregator::totals;
use obslog_data::analysis::run;
use obslog_report::{export_by_date, plot_summary, render_csv, render_json, render_table};

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("apexlog v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.resolve()?;
    if config.account_defaults {
        tracing::info!("{}", bootstrap::defaults_notice(&config));
    }

    let output = run(&config)?;
    tracing::info!(
        "Read {} scans from {} obslogs in {:.2}s, {} selected",
        output.metadata.rows_read,
        output.metadata.files_read,
        output.metadata.load_time_seconds,
        output.metadata.rows_selected
    );
    if output.metadata.cancelled_scans > 0 {
        tracing::info!(
            "{} cancelled scans counted with zero duration",
            output.metadata.cancelled_scans
        );
    }

    let rendered = match config.format {
        OutputFormat::Table => {
            render_table(&output.summary, config.group_by, &totals(&output.summary)?)
        }
        OutputFormat::Json => render_json(&output.summary)?,
        OutputFormat::Csv => render_csv(&output.summary)?,
    };
    print!("{}", rendered);

    if let Some(path) = &config.plot {
        if output.summary.is_empty() {
            tracing::warn!("Nothing to plot; {} not written", path.display());
        } else {
            bootstrap::ensure_parent_dir(path)?;
            plot_summary(&output.summary, path)
                .with_context(|| format!("failed to plot {}", path.display()))?;
            tracing::info!("Created plot: {}", path.display());
        }
    }

    if let Some(dir) = &config.export_dir {
        let written = export_by_date(&output.selected, dir)?;
        for path in &written {
            tracing::info!("Created export: {}", path.display());
        }
    }

    Ok(())
}
