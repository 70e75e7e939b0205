//! Daily news counts for each bill's top keyword.

use crate::api::{NewsApi, NewsApiClient};
use crate::config::Config;
use crate::error::NewsError;
use crate::models::{KeywordRecord, NewsRecord, keyword_records, news_to_table};
use crate::policy::FailurePolicy;
use crate::tsv::Table;
use crate::utils::days_inclusive;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

/// Bills to query: the first row of each bill number whose top keyword
/// is not blank, paired with that keyword.
pub fn news_targets(records: &[KeywordRecord]) -> Vec<(&KeywordRecord, &str)> {
    records
        .iter()
        .unique_by(|r| r.bill_no.clone())
        .filter_map(|r| match r.first_keyword() {
            Some(keyword) => Some((r, keyword)),
            None => {
                debug!(bill_no = %r.bill_no, "No top keyword; skipping");
                None
            }
        })
        .collect()
}

/// Query every day in `start..=today` for each target bill, one request at
/// a time with `delay` after each. Failed days are resolved by `policy`.
///
/// # Arguments
///
/// * `api` - the news search service
/// * `records` - keyword table rows; see [`news_targets`]
/// * `start`, `today` - first and last day queried, both inclusive
/// * `delay` - pause after every request, failed ones included
/// * `policy` - what a failed day turns into
///
/// # Returns
///
/// Counts grouped by bill, days in ascending order.
pub async fn count_news<A: NewsApi>(
    api: &A,
    records: &[KeywordRecord],
    start: NaiveDate,
    today: NaiveDate,
    delay: Duration,
    policy: FailurePolicy,
) -> Vec<NewsRecord> {
    let targets = news_targets(records);
    let days: Vec<NaiveDate> = days_inclusive(start, today).collect();
    info!(bills = targets.len(), days = days.len(), "Counting news");

    let queries = targets
        .into_iter()
        .flat_map(|(record, keyword)| days.iter().map(move |&day| (record, keyword, day)));

    let counted: Vec<Option<NewsRecord>> = stream::iter(queries)
        .then(|(record, keyword, day)| async move {
            let result = api.count(keyword, day).await;
            sleep(delay).await;
            let item = format!("{} / {keyword} / {day}", record.bill_no);
            policy.resolve(&item, result).map(|count| {
                debug!(bill_no = %record.bill_no, keyword, %day, count, "News count");
                NewsRecord {
                    bill_no: record.bill_no.clone(),
                    keyword: keyword.to_string(),
                    date: day,
                    count,
                }
            })
        })
        .collect()
        .await;
    counted.into_iter().flatten().collect()
}

/// Run the news stage against any [`NewsApi`].
///
/// # Errors
///
/// Returns [`NewsError`] if the keyword table is missing or malformed, or
/// the news table cannot be written.
pub async fn run_with<A: NewsApi>(api: &A, config: &Config, today: NaiveDate) -> Result<(), NewsError> {
    let settings = &config.news;
    let input = config.paths.keywords();
    let table = Table::read(&input)?;
    let records = keyword_records(&table, 1)?;
    info!(path = %input.display(), rows = records.len(), "Loaded keyword table");

    let counts = count_news(
        api,
        &records,
        settings.start_date,
        today,
        settings.request_delay(),
        settings.on_failure,
    )
    .await;

    let out = config.paths.news();
    news_to_table(&counts).write(&out)?;
    info!(path = %out.display(), rows = counts.len(), "Wrote news table");
    Ok(())
}

/// Run the news stage against the configured news endpoint.
#[instrument(level = "info", skip_all, fields(%today))]
pub async fn run(config: &Config, today: NaiveDate) -> Result<(), NewsError> {
    let api = NewsApiClient::from_config(&config.news)?;
    run_with(&api, config, today).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BillNo;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Returns the day of month as the count, failing on listed days.
    #[derive(Default)]
    struct FakeNews {
        failing: HashSet<NaiveDate>,
        calls: RefCell<Vec<(String, NaiveDate)>>,
    }

    impl NewsApi for FakeNews {
        async fn count(&self, keyword: &str, day: NaiveDate) -> Result<u64, NewsError> {
            self.calls.borrow_mut().push((keyword.to_string(), day));
            if self.failing.contains(&day) {
                return Err(NewsError::Api("rateLimited".into()));
            }
            Ok(u64::from(chrono::Datelike::day(&day)))
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(bill: &str, keywords: &[&str]) -> KeywordRecord {
        KeywordRecord {
            bill_no: BillNo::parse(bill).unwrap(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_news_targets_first_occurrence_and_first_keyword() {
        let records = [
            record("B001", &["주택", "임대"]),
            record("B002", &[""]),
            record("B001", &["교육"]),
            record("B003", &["예산"]),
        ];
        let targets: Vec<(&str, &str)> = news_targets(&records)
            .into_iter()
            .map(|(r, k)| (r.bill_no.as_str(), k))
            .collect();
        assert_eq!(targets, vec![("B001", "주택"), ("B003", "예산")]);
    }

    #[tokio::test]
    async fn test_count_news_every_day_inclusive() {
        let api = FakeNews::default();
        let records = [record("B001", &["주택"])];
        let counts = count_news(
            &api,
            &records,
            day(2025, 5, 25),
            day(2025, 5, 27),
            Duration::ZERO,
            FailurePolicy::Omit,
        )
        .await;
        let got: Vec<(NaiveDate, u64)> = counts.iter().map(|r| (r.date, r.count)).collect();
        assert_eq!(
            got,
            vec![(day(2025, 5, 25), 25), (day(2025, 5, 26), 26), (day(2025, 5, 27), 27)]
        );
        assert!(counts.iter().all(|r| r.keyword == "주택"));
    }

    #[tokio::test]
    async fn test_count_news_omits_failed_days() {
        let api = FakeNews {
            failing: HashSet::from([day(2025, 5, 26)]),
            ..FakeNews::default()
        };
        let records = [record("B001", &["주택"])];
        let counts = count_news(
            &api,
            &records,
            day(2025, 5, 25),
            day(2025, 5, 27),
            Duration::ZERO,
            FailurePolicy::Omit,
        )
        .await;
        let dates: Vec<NaiveDate> = counts.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2025, 5, 25), day(2025, 5, 27)]);
        assert_eq!(api.calls.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_count_news_zero_fill_keeps_failed_days() {
        let api = FakeNews {
            failing: HashSet::from([day(2025, 5, 26)]),
            ..FakeNews::default()
        };
        let records = [record("B001", &["주택"])];
        let counts = count_news(
            &api,
            &records,
            day(2025, 5, 26),
            day(2025, 5, 26),
            Duration::ZERO,
            FailurePolicy::ZeroFill,
        )
        .await;
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 0);
    }

    #[tokio::test]
    async fn test_count_news_start_after_today_queries_nothing() {
        let api = FakeNews::default();
        let records = [record("B001", &["주택"])];
        let counts = count_news(
            &api,
            &records,
            day(2025, 6, 1),
            day(2025, 5, 31),
            Duration::ZERO,
            FailurePolicy::Omit,
        )
        .await;
        assert!(counts.is_empty());
        assert!(api.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_run_with_writes_news_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        config.news.start_date = day(2025, 5, 30);
        config.news.request_delay_ms = 0;
        Table::parse("의안번호\t주요단어 1\t주요단어 2\nB001\t주택\t임대\nB001\t교육\t\n")
            .unwrap()
            .write(&config.paths.keywords())
            .unwrap();

        let api = FakeNews::default();
        run_with(&api, &config, day(2025, 5, 31)).await.unwrap();

        let table = Table::read(&config.paths.news()).unwrap();
        assert_eq!(table.headers, vec!["의안번호", "키워드", "날짜", "뉴스건수"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["B001", "주택", "2025-05-31", "31"]);
    }

    #[tokio::test]
    async fn test_run_requires_endpoint() {
        let config = Config::default();
        assert!(matches!(
            run(&config, day(2025, 5, 31)).await,
            Err(NewsError::MissingEndpoint)
        ));
    }
}
