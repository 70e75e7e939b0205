//! Search-trend scores for every bill keyword.
//!
//! Each non-empty keyword slot is looked up over a fixed window ending
//! today and its daily ratios are averaged into one score. The bill mean
//! averages the slots that were looked up successfully.

use crate::api::{NaverDataLabClient, TrendApi, TrendRequest, TrendResponse};
use crate::config::Config;
use crate::error::TrendError;
use crate::models::{KeywordRecord, TrendRecord, columns, duplicate_bills, keyword_records};
use crate::policy::FailurePolicy;
use crate::tsv::Table;
use crate::utils::{format_score, round2};
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, instrument, warn};

/// Date range and granularity of a trend lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub time_unit: String,
}

impl TrendWindow {
    /// `days` days back from `today`, through `today`.
    pub fn ending(today: NaiveDate, days: i64, time_unit: &str) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
            time_unit: time_unit.to_string(),
        }
    }
}

/// Mean ratio of the first result's data points.
///
/// # Errors
///
/// [`TrendError::NoResults`] when the response has no result group and
/// [`TrendError::NoDataPoints`] when the first group has no points.
pub fn average_ratio(response: &TrendResponse) -> Result<f64, TrendError> {
    let result = response.results.first().ok_or(TrendError::NoResults)?;
    if result.data.is_empty() {
        return Err(TrendError::NoDataPoints);
    }
    let total: f64 = result.data.iter().map(|p| p.ratio).sum();
    Ok(total / result.data.len() as f64)
}

/// Unrounded trend score of one keyword.
///
/// # Arguments
///
/// * `api` - the search-trend service
/// * `keyword` - keyword to look up; surrounding whitespace is ignored
/// * `window` - date range and granularity of the lookup
///
/// # Errors
///
/// [`TrendError::BlankKeyword`] before any request when `keyword` is
/// blank; otherwise whatever the request or [`average_ratio`] returns.
#[instrument(level = "debug", skip(api, window))]
pub async fn trend_score<A: TrendApi>(
    api: &A,
    keyword: &str,
    window: &TrendWindow,
) -> Result<f64, TrendError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(TrendError::BlankKeyword);
    }
    let request = TrendRequest::for_keyword(keyword, window.start, window.end, &window.time_unit);
    let response = api.search(&request).await?;
    let score = average_ratio(&response)?;
    debug!(score, "Trend score");
    Ok(score)
}

/// Score the first `slots` keywords of every record, in order.
///
/// Empty slots score 0.0. A failed lookup is resolved by `policy`; it
/// never counts toward the bill mean.
///
/// # Returns
///
/// One [`TrendRecord`] per input record, slot scores and mean rounded to
/// two decimals. The mean is 0.0 when no lookup succeeded.
pub async fn aggregate<A: TrendApi>(
    api: &A,
    records: &[KeywordRecord],
    window: &TrendWindow,
    slots: usize,
    policy: FailurePolicy,
) -> Vec<TrendRecord> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let mut slot_scores = Vec::with_capacity(slots);
        let mut successes = Vec::new();

        for slot in 0..slots {
            let keyword = record.keywords.get(slot).map(|k| k.trim()).unwrap_or_default();
            if keyword.is_empty() {
                slot_scores.push(Some(0.0));
                continue;
            }
            match trend_score(api, keyword, window).await {
                Ok(score) => {
                    successes.push(score);
                    slot_scores.push(Some(round2(score)));
                }
                Err(e) => {
                    let item = format!("{} / {keyword}", record.bill_no);
                    slot_scores.push(policy.resolve::<f64, _>(&item, Err(e)));
                }
            }
        }

        let mean = if successes.is_empty() {
            0.0
        } else {
            round2(successes.iter().sum::<f64>() / successes.len() as f64)
        };
        info!(bill_no = %record.bill_no, ok = successes.len(), mean, "Scored bill");
        out.push(TrendRecord {
            bill_no: record.bill_no.clone(),
            slot_scores,
            mean,
        });
    }
    out
}

/// Add (or replace) the per-slot and mean trend columns of `table`.
/// `records` must be in the table's row order.
pub fn apply_trends(table: &mut Table, records: &[TrendRecord], slots: usize) -> Result<(), TrendError> {
    for slot in 0..slots {
        let values = records
            .iter()
            .map(|r| {
                r.slot_scores
                    .get(slot)
                    .copied()
                    .flatten()
                    .map(format_score)
                    .unwrap_or_default()
            })
            .collect();
        table.set_column(&columns::trend(slot + 1), values)?;
    }
    let means = records.iter().map(|r| format_score(r.mean)).collect();
    table.set_column(columns::TREND_MEAN, means)?;
    Ok(())
}

/// Run the trend stage against any [`TrendApi`].
///
/// Reads the keyword table, scores every row and writes the trend table:
/// the keyword table's columns plus one score column per slot and the
/// mean.
///
/// # Errors
///
/// Returns [`TrendError`] if the keyword table is missing or malformed, or
/// the trend table cannot be written. Individual lookup failures are not
/// errors.
pub async fn run_with<A: TrendApi>(api: &A, config: &Config, today: NaiveDate) -> Result<(), TrendError> {
    let settings = &config.trends;
    let input = config.paths.keywords();
    let mut table = Table::read(&input)?;
    let records = keyword_records(&table, settings.slots)?;
    for bill in duplicate_bills(&records) {
        warn!(bill_no = %bill, "Bill number appears more than once");
    }
    info!(path = %input.display(), rows = records.len(), "Loaded keyword table");

    let window = TrendWindow::ending(today, settings.window_days, &settings.time_unit);
    let scored = aggregate(api, &records, &window, settings.slots, settings.on_failure).await;
    apply_trends(&mut table, &scored, settings.slots)?;

    let out = config.paths.trends();
    table.write(&out)?;
    info!(path = %out.display(), rows = scored.len(), "Wrote trend table");
    Ok(())
}

/// Run the trend stage against the configured DataLab endpoint.
#[instrument(level = "info", skip_all, fields(%today))]
pub async fn run(config: &Config, today: NaiveDate) -> Result<(), TrendError> {
    let api = NaverDataLabClient::from_config(&config.trends)?;
    run_with(&api, config, today).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TrendPoint, TrendResult};
    use crate::models::BillNo;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeTrends {
        ratios: HashMap<String, Vec<f64>>,
        requests: RefCell<Vec<TrendRequest>>,
    }

    impl FakeTrends {
        fn with(entries: &[(&str, &[f64])]) -> Self {
            Self {
                ratios: entries
                    .iter()
                    .map(|(k, r)| (k.to_string(), r.to_vec()))
                    .collect(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl TrendApi for FakeTrends {
        async fn search(&self, request: &TrendRequest) -> Result<TrendResponse, TrendError> {
            self.requests.borrow_mut().push(request.clone());
            let keyword = &request.keyword_groups[0].keywords[0];
            let Some(ratios) = self.ratios.get(keyword) else {
                return Ok(TrendResponse::default());
            };
            Ok(TrendResponse {
                results: vec![TrendResult {
                    data: ratios.iter().map(|&ratio| TrendPoint { ratio }).collect(),
                }],
            })
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> TrendWindow {
        TrendWindow::ending(day(2025, 6, 30), 60, "date")
    }

    fn record(bill: &str, keywords: &[&str]) -> KeywordRecord {
        KeywordRecord {
            bill_no: BillNo::parse(bill).unwrap(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_window_spans_sixty_days() {
        let w = window();
        assert_eq!(w.start, day(2025, 5, 1));
        assert_eq!(w.end, day(2025, 6, 30));
    }

    #[test]
    fn test_average_ratio() {
        let response: TrendResponse =
            serde_json::from_str(r#"{"results":[{"title":"a","keywords":["a"],"data":[{"ratio":10},{"ratio":20}]}]}"#)
                .unwrap();
        assert_eq!(average_ratio(&response).unwrap(), 15.0);
    }

    #[test]
    fn test_average_ratio_counts_missing_ratio_as_zero() {
        let response: TrendResponse =
            serde_json::from_str(r#"{"results":[{"data":[{"ratio":10},{"period":"2025-04-02"}]}]}"#)
                .unwrap();
        assert_eq!(average_ratio(&response).unwrap(), 5.0);
    }

    #[test]
    fn test_average_ratio_empty_cases() {
        assert!(matches!(
            average_ratio(&TrendResponse::default()),
            Err(TrendError::NoResults)
        ));
        let response = TrendResponse {
            results: vec![TrendResult::default()],
        };
        assert!(matches!(average_ratio(&response), Err(TrendError::NoDataPoints)));
    }

    #[tokio::test]
    async fn test_blank_keyword_fails_before_request() {
        let api = FakeTrends::default();
        for keyword in ["", "   "] {
            assert!(matches!(
                trend_score(&api, keyword, &window()).await,
                Err(TrendError::BlankKeyword)
            ));
        }
        assert!(api.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_trend_score_sends_window() {
        let api = FakeTrends::with(&[("apple", &[42.0, 42.0])]);
        assert_eq!(trend_score(&api, " apple ", &window()).await.unwrap(), 42.0);
        let requests = api.requests.borrow();
        assert_eq!(requests[0].start_date, "2025-05-01");
        assert_eq!(requests[0].end_date, "2025-06-30");
        assert_eq!(requests[0].keyword_groups[0].group_name, "apple");
    }

    #[tokio::test]
    async fn test_aggregate_single_keyword_bill() {
        let api = FakeTrends::with(&[("apple", &[42.0, 42.0])]);
        let records = [record("B001", &["apple", "", "", "", ""])];
        let scored = aggregate(&api, &records, &window(), 5, FailurePolicy::ZeroFill).await;
        assert_eq!(
            scored[0].slot_scores,
            vec![Some(42.0), Some(0.0), Some(0.0), Some(0.0), Some(0.0)]
        );
        assert_eq!(scored[0].mean, 42.0);
        assert_eq!(api.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_failed_lookup_zero_filled_and_excluded_from_mean() {
        let api = FakeTrends::with(&[("apple", &[10.0, 20.0]), ("pear", &[30.0])]);
        let records = [record("B001", &["apple", "unknown", "pear"])];
        let scored = aggregate(&api, &records, &window(), 5, FailurePolicy::ZeroFill).await;
        assert_eq!(
            scored[0].slot_scores,
            vec![Some(15.0), Some(0.0), Some(30.0), Some(0.0), Some(0.0)]
        );
        assert_eq!(scored[0].mean, 22.5);
    }

    #[tokio::test]
    async fn test_aggregate_omit_leaves_blank_slot() {
        let api = FakeTrends::default();
        let records = [record("B001", &["unknown"])];
        let scored = aggregate(&api, &records, &window(), 2, FailurePolicy::Omit).await;
        assert_eq!(scored[0].slot_scores, vec![None, Some(0.0)]);
        assert_eq!(scored[0].mean, 0.0);
    }

    #[tokio::test]
    async fn test_aggregate_rounds_scores_and_mean() {
        let api = FakeTrends::with(&[("a", &[1.0, 2.0, 2.0]), ("b", &[1.0])]);
        let records = [record("B001", &["a", "b"])];
        let scored = aggregate(&api, &records, &window(), 2, FailurePolicy::ZeroFill).await;
        assert_eq!(scored[0].slot_scores, vec![Some(1.67), Some(1.0)]);
        // (5/3 + 1) / 2 = 1.3333…
        assert_eq!(scored[0].mean, 1.33);
    }

    #[tokio::test]
    async fn test_run_with_writes_trend_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        Table::parse("의안번호\t주요단어 1\t주요단어 2\t주요단어 3\nB001\tapple\t\t\n")
            .unwrap()
            .write(&config.paths.keywords())
            .unwrap();

        let api = FakeTrends::with(&[("apple", &[42.0, 42.0])]);
        run_with(&api, &config, day(2025, 6, 30)).await.unwrap();

        let table = Table::read(&config.paths.trends()).unwrap();
        assert_eq!(table.cell(0, "의안번호"), Some("B001"));
        assert_eq!(table.cell(0, "주요단어 1"), Some("apple"));
        assert_eq!(table.cell(0, "네이버트렌드1"), Some("42.0"));
        for slot in 2..=5 {
            assert_eq!(table.cell(0, &columns::trend(slot)), Some("0.0"));
        }
        assert_eq!(table.cell(0, "네이버트렌드평균"), Some("42.0"));
    }

    #[test]
    fn test_apply_trends_replaces_existing_columns() {
        let mut table = Table::parse("의안번호\t주요단어 1\t네이버트렌드1\nB001\tapple\t99.0\n").unwrap();
        let scored = [TrendRecord {
            bill_no: BillNo::parse("B001").unwrap(),
            slot_scores: vec![Some(42.0)],
            mean: 42.0,
        }];
        apply_trends(&mut table, &scored, 1).unwrap();
        assert_eq!(table.headers, vec!["의안번호", "주요단어 1", "네이버트렌드1", "네이버트렌드평균"]);
        assert_eq!(table.cell(0, "네이버트렌드1"), Some("42.0"));
    }

    #[tokio::test]
    async fn test_run_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        assert!(matches!(
            run(&config, day(2025, 6, 30)).await,
            Err(TrendError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_run_with_missing_keyword_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        let api = FakeTrends::default();
        assert!(matches!(
            run_with(&api, &config, day(2025, 6, 30)).await,
            Err(TrendError::Table(_))
        ));
    }
}
