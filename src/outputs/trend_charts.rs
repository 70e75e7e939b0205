//! Trend table charts: heatmap, mean bars and per-keyword box plot.

use super::{FONT, axis_max, bill_column, parse_number, segment_label};
use crate::error::ChartError;
use crate::models::columns;
use crate::tsv::Table;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const BAR_COLOR: RGBColor = RGBColor(49, 130, 189);

/// One trend table row as the charts see it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub bill_no: String,
    /// `(keyword, score)` per slot; either side may be missing.
    pub slots: Vec<(Option<String>, Option<f64>)>,
    pub mean: Option<f64>,
}

/// Bill × keyword score matrix. `values[bill][keyword]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Heatmap {
    pub bills: Vec<String>,
    pub keywords: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

pub fn trend_rows(table: &Table, slots: usize) -> Result<Vec<TrendRow>, ChartError> {
    let bill_col = bill_column(table)?;
    let rows = (0..table.rows.len())
        .map(|i| {
            let bill_no = table.rows[i]
                .get(bill_col)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            let slots = (1..=slots)
                .map(|slot| {
                    let keyword = table
                        .cell(i, &columns::keyword(slot))
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_string);
                    let score = parse_number(table.cell(i, &columns::trend(slot)));
                    (keyword, score)
                })
                .collect();
            let mean = parse_number(table.cell(i, columns::TREND_MEAN));
            TrendRow {
                bill_no,
                slots,
                mean,
            }
        })
        .filter(|row| !row.bill_no.is_empty())
        .collect();
    Ok(rows)
}

fn index_of(names: &mut Vec<String>, name: &str) -> usize {
    match names.iter().position(|n| n == name) {
        Some(i) => i,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}

/// Bills and keywords in order of first appearance. Pairs never scored
/// are 0; a pair scored twice keeps the later score.
pub fn heatmap_data(rows: &[TrendRow]) -> Heatmap {
    let mut heatmap = Heatmap::default();
    let mut cells = Vec::new();
    for row in rows {
        let b = index_of(&mut heatmap.bills, &row.bill_no);
        for (keyword, score) in &row.slots {
            let Some(keyword) = keyword else { continue };
            let k = index_of(&mut heatmap.keywords, keyword);
            cells.push((b, k, score.unwrap_or(0.0)));
        }
    }
    heatmap.values = vec![vec![0.0; heatmap.keywords.len()]; heatmap.bills.len()];
    for (b, k, v) in cells {
        heatmap.values[b][k] = v;
    }
    heatmap
}

/// Mean trend score per bill, averaging repeated bill rows. Rows without
/// a mean are left out.
pub fn mean_by_bill(rows: &[TrendRow]) -> Vec<(String, f64)> {
    let mut bills: Vec<String> = Vec::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    for row in rows {
        let Some(mean) = row.mean else { continue };
        let i = index_of(&mut bills, &row.bill_no);
        if i == sums.len() {
            sums.push((0.0, 0));
        }
        sums[i].0 += mean;
        sums[i].1 += 1;
    }
    bills
        .into_iter()
        .zip(sums)
        .map(|(bill, (sum, n))| (bill, sum / n as f64))
        .collect()
}

/// Scores grouped by keyword, keywords in order of first appearance.
/// Only slots with both a keyword and a score count.
pub fn scores_by_keyword(rows: &[TrendRow]) -> Vec<(String, Vec<f64>)> {
    let mut keywords: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<f64>> = Vec::new();
    for row in rows {
        for (keyword, score) in &row.slots {
            let (Some(keyword), Some(score)) = (keyword, score) else {
                continue;
            };
            let i = index_of(&mut keywords, keyword);
            if i == groups.len() {
                groups.push(Vec::new());
            }
            groups[i].push(*score);
        }
    }
    keywords.into_iter().zip(groups).collect()
}

/// White to dark blue by `t` in `0.0..=1.0`.
fn heat_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |from: f64, to: f64| (from + (to - from) * t).round() as u8;
    RGBColor(lerp(255.0, 8.0), lerp(255.0, 48.0), lerp(217.0, 107.0))
}

pub fn draw_heatmap(data: &Heatmap, path: &Path) -> Result<(), ChartError> {
    if data.bills.is_empty() || data.keywords.is_empty() {
        return Err(ChartError::Empty("no scored keywords for the heatmap"));
    }
    let (cols, rows) = (data.keywords.len(), data.bills.len());
    let max = data.values.iter().flatten().copied().fold(0.0f64, f64::max);
    let width = (200 + 90 * cols) as u32;
    let height = (160 + 40 * rows) as u32;

    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("의안번호별 주요 키워드 네이버 트렌드 관심도", (FONT, 22))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d((0..cols).into_segmented(), (0..rows).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("키워드")
        .y_desc("의안번호")
        .x_labels(cols)
        .y_labels(rows)
        .x_label_formatter(&|v| segment_label(v, &data.keywords))
        .y_label_formatter(&|v| {
            // Row 0 is drawn at the top.
            match v {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) if *i < rows => {
                    data.bills[rows - 1 - i].clone()
                }
                _ => String::new(),
            }
        })
        .draw()?;

    let cell_style = TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    for (b, values) in data.values.iter().enumerate() {
        let y = rows - 1 - b;
        chart.draw_series(values.iter().enumerate().map(|(k, &v)| {
            let t = if max > 0.0 { v / max } else { 0.0 };
            Rectangle::new(
                [
                    (SegmentValue::Exact(k), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(k + 1), SegmentValue::Exact(y + 1)),
                ],
                heat_color(t).filled(),
            )
        }))?;
        chart.draw_series(values.iter().enumerate().map(|(k, &v)| {
            Text::new(
                format!("{v:.2}"),
                (SegmentValue::CenterOf(k), SegmentValue::CenterOf(y)),
                cell_style.clone(),
            )
        }))?;
    }

    root.present()?;
    Ok(())
}

pub fn draw_mean_bars(means: &[(String, f64)], path: &Path) -> Result<(), ChartError> {
    if means.is_empty() {
        return Err(ChartError::Empty("no bill has a mean trend score"));
    }
    let bills: Vec<String> = means.iter().map(|(b, _)| b.clone()).collect();
    let max = means.iter().map(|(_, m)| *m).fold(0.0f64, f64::max);
    let width = (240 + 60 * bills.len()).max(640) as u32;

    let root = SVGBackend::new(path, (width, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("의안번호별 네이버 트렌드 평균 관심도", (FONT, 22))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(60)
        .build_cartesian_2d((0..bills.len()).into_segmented(), 0.0..axis_max(max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("의안번호")
        .y_desc("평균 관심도")
        .x_labels(bills.len())
        .x_label_formatter(&|v| segment_label(v, &bills))
        .draw()?;

    chart.draw_series(means.iter().enumerate().map(|(i, (_, mean))| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *mean)],
            BAR_COLOR.filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))?;

    root.present()?;
    Ok(())
}

pub fn draw_keyword_boxes(groups: &[(String, Vec<f64>)], path: &Path) -> Result<(), ChartError> {
    if groups.is_empty() {
        return Err(ChartError::Empty("no keyword has a trend score"));
    }
    let keywords: Vec<String> = groups.iter().map(|(k, _)| k.clone()).collect();
    let max = groups
        .iter()
        .flat_map(|(_, scores)| scores.iter().copied())
        .fold(0.0f64, f64::max);
    let width = (240 + 70 * keywords.len()).max(640) as u32;

    let root = SVGBackend::new(path, (width, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("키워드별 네이버 트렌드 관심도 분포", (FONT, 22))
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(60)
        .build_cartesian_2d((0..keywords.len()).into_segmented(), 0.0f32..axis_max(max) as f32)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("키워드")
        .y_desc("관심도 점수")
        .x_labels(keywords.len())
        .x_label_formatter(&|v| segment_label(v, &keywords))
        .draw()?;

    chart.draw_series(groups.iter().enumerate().map(|(i, (_, scores))| {
        let quartiles = Quartiles::new(scores);
        Boxplot::new_vertical(SegmentValue::CenterOf(i), &quartiles)
            .width(24)
            .whisker_width(0.5)
            .style(&BAR_COLOR)
    }))?;

    root.present()?;
    Ok(())
}
