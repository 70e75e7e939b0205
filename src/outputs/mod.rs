//! Chart rendering from the trend and news tables.
//!
//! Charts are plain SVG files written to the charts directory:
//!
//! ```text
//! data/charts/
//! ├── trend_heatmap.svg      # bill × keyword slot scores
//! ├── trend_mean_bar.svg     # mean trend score per bill
//! ├── trend_keyword_box.svg  # score distribution per keyword
//! └── news_timeline.svg      # daily news counts per bill keyword
//! ```
//!
//! # Submodules
//!
//! - [`trend_charts`]: data preparation and drawing for the trend table
//! - [`news_chart`]: data preparation and drawing for the news table

pub mod news_chart;
pub mod trend_charts;

use crate::cli::PlotCommand;
use crate::config::Config;
use crate::error::ChartError;
use crate::models::columns;
use crate::tsv::Table;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::SegmentValue;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const TREND_HEATMAP: &str = "trend_heatmap.svg";
pub const TREND_MEAN_BAR: &str = "trend_mean_bar.svg";
pub const TREND_KEYWORD_BOX: &str = "trend_keyword_box.svg";
pub const NEWS_TIMELINE: &str = "news_timeline.svg";

const FONT: &str = "sans-serif";

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(e.to_string())
    }
}

/// Axis label of a category axis: the name at a segment's index.
fn segment_label(value: &SegmentValue<usize>, names: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => names.get(*i).cloned().unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

/// Upper end of a value axis, with headroom. Never zero.
fn axis_max(max: f64) -> f64 {
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

/// Parse a numeric cell. Blank or malformed cells are `None`.
fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn bill_column(table: &Table) -> Result<usize, ChartError> {
    Ok(table.require_column(columns::BILL_NO)?)
}

fn chart_path(dir: &Path, name: &str) -> Result<PathBuf, ChartError> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.join(name))
}

/// Render the trend charts.
///
/// # Returns
///
/// Paths of the heatmap, mean bar chart and keyword box plot, in that
/// order.
///
/// # Errors
///
/// [`ChartError::Empty`] when the trend table has no bill rows; otherwise
/// table, I/O or drawing failures.
#[instrument(level = "info", skip_all)]
pub fn plot_trends(config: &Config) -> Result<Vec<PathBuf>, ChartError> {
    let input = config.paths.trends();
    let table = Table::read(&input)?;
    let rows = trend_charts::trend_rows(&table, config.trends.slots)?;
    if rows.is_empty() {
        return Err(ChartError::Empty("trend table has no rows"));
    }
    info!(path = %input.display(), rows = rows.len(), "Loaded trend table");

    let dir = config.paths.charts();
    let heatmap = chart_path(&dir, TREND_HEATMAP)?;
    trend_charts::draw_heatmap(&trend_charts::heatmap_data(&rows), &heatmap)?;
    let bars = chart_path(&dir, TREND_MEAN_BAR)?;
    trend_charts::draw_mean_bars(&trend_charts::mean_by_bill(&rows), &bars)?;
    let boxes = chart_path(&dir, TREND_KEYWORD_BOX)?;
    trend_charts::draw_keyword_boxes(&trend_charts::scores_by_keyword(&rows), &boxes)?;

    let written = vec![heatmap, bars, boxes];
    for path in &written {
        info!(path = %path.display(), "Wrote chart");
    }
    Ok(written)
}

/// Render the news timeline. Returns the written path.
#[instrument(level = "info", skip_all)]
pub fn plot_news(config: &Config) -> Result<Vec<PathBuf>, ChartError> {
    let input = config.paths.news();
    let table = Table::read(&input)?;
    let series = news_chart::news_series(&table)?;
    info!(path = %input.display(), series = series.len(), "Loaded news table");

    let path = chart_path(&config.paths.charts(), NEWS_TIMELINE)?;
    news_chart::draw_timeline(&series, &path)?;
    info!(path = %path.display(), "Wrote chart");
    Ok(vec![path])
}

pub fn run(config: &Config, chart: PlotCommand) -> Result<Vec<PathBuf>, ChartError> {
    match chart {
        PlotCommand::Trends => plot_trends(config),
        PlotCommand::News => plot_news(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_label() {
        let names = vec!["주택".to_string(), "교육".to_string()];
        assert_eq!(segment_label(&SegmentValue::CenterOf(1), &names), "교육");
        assert_eq!(segment_label(&SegmentValue::Exact(5), &names), "");
        assert_eq!(segment_label(&SegmentValue::Last, &names), "");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(Some(" 42.5 ")), Some(42.5));
        assert_eq!(parse_number(Some("")), None);
        assert_eq!(parse_number(Some("n/a")), None);
        assert_eq!(parse_number(Some("NaN")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn test_axis_max() {
        assert_eq!(axis_max(0.0), 1.0);
        assert!((axis_max(10.0) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_plot_trends_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        assert!(matches!(plot_trends(&config), Err(ChartError::Table(_))));
    }

    #[test]
    fn test_plot_trends_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        Table::new(["의안번호", "주요단어 1", "네이버트렌드1"])
            .write(&config.paths.trends())
            .unwrap();
        assert!(matches!(plot_trends(&config), Err(ChartError::Empty(_))));
    }
}
