//! News count timeline.

use super::{FONT, axis_max, bill_column, parse_number};
use crate::error::ChartError;
use crate::models::columns;
use crate::tsv::Table;
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::path::Path;
use tracing::warn;

/// Daily counts of one bill keyword, sorted by date.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsSeries {
    /// `"{bill} - {keyword}"`.
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Group the news table into one series per bill keyword, in order of
/// first appearance. Rows with an unreadable date or count are skipped.
pub fn news_series(table: &Table) -> Result<Vec<NewsSeries>, ChartError> {
    let bill_col = bill_column(table)?;
    let keyword_col = table.require_column(columns::KEYWORD)?;
    let date_col = table.require_column(columns::DATE)?;
    let count_col = table.require_column(columns::NEWS_COUNT)?;

    let mut series: Vec<NewsSeries> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let cell = |c: usize| row.get(c).map(|s| s.trim()).unwrap_or_default();
        let date = NaiveDate::parse_from_str(cell(date_col), "%Y-%m-%d");
        let count = parse_number(Some(cell(count_col)));
        let (Ok(date), Some(count)) = (date, count) else {
            warn!(row = i + 1, "Unreadable news row; skipping");
            continue;
        };

        let name = format!("{} - {}", cell(bill_col), cell(keyword_col));
        match series.iter_mut().find(|s| s.name == name) {
            Some(s) => s.points.push((date, count)),
            None => series.push(NewsSeries {
                name,
                points: vec![(date, count)],
            }),
        }
    }
    for s in &mut series {
        s.points.sort_by_key(|&(date, _)| date);
    }
    Ok(series)
}

/// First and last date over all series.
pub fn date_span(series: &[NewsSeries]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = series.iter().flat_map(|s| s.points.iter().map(|&(d, _)| d));
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

pub fn draw_timeline(series: &[NewsSeries], path: &Path) -> Result<(), ChartError> {
    let Some((first, last)) = date_span(series) else {
        return Err(ChartError::Empty("news table has no readable rows"));
    };
    let span = (last - first).num_days().max(1);
    let max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|&(_, c)| c))
        .fold(0.0f64, f64::max);
    let offset = |d: NaiveDate| (d - first).num_days();

    let root = SVGBackend::new(path, (1400, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("의안별 주요 키워드 뉴스 건수 변화", (FONT, 22))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(0i64..span, 0.0..axis_max(max))?;

    chart
        .configure_mesh()
        .x_desc("날짜")
        .y_desc("뉴스 기사 수")
        .x_labels(span.min(12) as usize + 1)
        .x_label_formatter(&|d| (first + Duration::days(*d)).format("%m-%d").to_string())
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let points: Vec<(i64, f64)> = s.points.iter().map(|&(d, c)| (offset(d), c)).collect();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
