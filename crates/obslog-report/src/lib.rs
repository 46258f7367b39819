//! Presentation layer for apexlog.
//!
//! Turns aggregated summaries into text tables, JSON or CSV for stdout,
//! horizontal bar charts (SVG) and per-night scan listings.

pub mod chart;
pub mod export;
pub mod table;

pub use chart::plot_summary;
pub use export::export_by_date;
pub use table::{render_csv, render_json, render_table};
