//! Records exchanged between pipeline stages and their TSV column layout.
//!
//! - [`BillNo`]: the join key shared by every table
//! - [`BillRecord`]: one crawled bill, written by the crawler
//! - [`KeywordRecord`]: a bill and its ranked keyword slots
//! - [`TrendRecord`]: per-slot trend scores plus the bill mean
//! - [`NewsRecord`]: one (bill, keyword, day) news count
//!
//! Column headers are Korean and must match exactly across stages.

use crate::error::TableError;
use crate::tsv::Table;
use chrono::NaiveDate;
use std::fmt;

/// Column names of the inter-stage tables.
pub mod columns {
    pub const BILL_NO: &str = "의안번호";
    pub const BILL_NAME: &str = "의안명";
    pub const PROPOSAL_DATE: &str = "제안일자";
    pub const RESOLUTION_DATE: &str = "의결일자";
    pub const DETAIL_URL: &str = "상세페이지 URL";
    pub const PDF_PATH: &str = "PDF 파일 경로";

    pub const KEYWORD: &str = "키워드";
    pub const DATE: &str = "날짜";
    pub const NEWS_COUNT: &str = "뉴스건수";

    pub const TREND_MEAN: &str = "네이버트렌드평균";

    /// `주요단어 {slot}`, 1-based.
    pub fn keyword(slot: usize) -> String {
        format!("주요단어 {slot}")
    }

    /// `네이버트렌드{slot}`, 1-based.
    pub fn trend(slot: usize) -> String {
        format!("네이버트렌드{slot}")
    }
}

/// Number of characters of a PDF file name that form the bill number.
pub const BILL_NO_LEN: usize = 7;

/// A bill number: trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BillNo(String);

impl BillNo {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    /// Bill number encoded as the first seven characters of a downloaded
    /// PDF's file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let prefix: String = name.chars().take(BILL_NO_LEN).collect();
        Self::parse(&prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BillNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the bill listing, plus what the detail page yielded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BillRecord {
    pub bill_no: String,
    pub name: String,
    pub proposal_date: String,
    pub resolution_date: String,
    /// Empty when no detail link was found.
    pub detail_url: String,
    /// Empty when no PDF was downloaded.
    pub pdf_path: String,
}

impl BillRecord {
    pub const HEADERS: [&'static str; 6] = [
        columns::BILL_NO,
        columns::BILL_NAME,
        columns::PROPOSAL_DATE,
        columns::RESOLUTION_DATE,
        columns::DETAIL_URL,
        columns::PDF_PATH,
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.bill_no.clone(),
            self.name.clone(),
            self.proposal_date.clone(),
            self.resolution_date.clone(),
            self.detail_url.clone(),
            self.pdf_path.clone(),
        ]
    }
}

pub fn bills_to_table(bills: &[BillRecord]) -> Table {
    let mut table = Table::new(BillRecord::HEADERS);
    for bill in bills {
        table.push_row(bill.to_row());
    }
    table
}

/// A bill and its keyword slots in rank order. Slots may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRecord {
    pub bill_no: BillNo,
    pub keywords: Vec<String>,
}

impl KeywordRecord {
    /// The top-ranked keyword, if it is not blank.
    pub fn first_keyword(&self) -> Option<&str> {
        self.keywords
            .first()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }
}

/// Header row of a keyword table with `slots` keyword columns.
pub fn keyword_headers(slots: usize) -> Vec<String> {
    std::iter::once(columns::BILL_NO.to_string())
        .chain((1..=slots).map(columns::keyword))
        .collect()
}

pub fn keywords_to_table(records: &[KeywordRecord], slots: usize) -> Table {
    let mut table = Table::new(keyword_headers(slots));
    for record in records {
        let mut row = Vec::with_capacity(slots + 1);
        row.push(record.bill_no.to_string());
        for slot in 0..slots {
            row.push(record.keywords.get(slot).cloned().unwrap_or_default());
        }
        table.push_row(row);
    }
    table
}

/// Read up to `slots` keyword columns for every row, in row order.
///
/// The bill number column must exist and every row must carry a bill
/// number. Missing keyword columns or cells read as empty strings.
pub fn keyword_records(table: &Table, slots: usize) -> Result<Vec<KeywordRecord>, TableError> {
    let bill_col = table.require_column(columns::BILL_NO)?;
    let keyword_cols: Vec<Option<usize>> = (1..=slots)
        .map(|slot| table.column(&columns::keyword(slot)))
        .collect();

    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let raw = row.get(bill_col).map(String::as_str).unwrap_or_default();
            let bill_no = BillNo::parse(raw).ok_or_else(|| TableError::InvalidValue {
                row: i + 1,
                column: columns::BILL_NO.to_string(),
                value: raw.to_string(),
            })?;
            let keywords = keyword_cols
                .iter()
                .map(|col| {
                    col.and_then(|c| row.get(c))
                        .map(|k| k.trim().to_string())
                        .unwrap_or_default()
                })
                .collect();
            Ok(KeywordRecord { bill_no, keywords })
        })
        .collect()
}

/// Bill numbers that appear more than once, each reported once.
pub fn duplicate_bills(records: &[KeywordRecord]) -> Vec<BillNo> {
    use itertools::Itertools;
    records
        .iter()
        .map(|r| &r.bill_no)
        .duplicates()
        .cloned()
        .collect()
}

/// Trend scores of one keyword row: one per slot, plus the bill mean.
/// A `None` slot is written as an empty cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRecord {
    pub bill_no: BillNo,
    pub slot_scores: Vec<Option<f64>>,
    pub mean: f64,
}

/// Reported article count for one bill keyword on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsRecord {
    pub bill_no: BillNo,
    pub keyword: String,
    pub date: NaiveDate,
    pub count: u64,
}

impl NewsRecord {
    pub const HEADERS: [&'static str; 4] = [
        columns::BILL_NO,
        columns::KEYWORD,
        columns::DATE,
        columns::NEWS_COUNT,
    ];
}

pub fn news_to_table(records: &[NewsRecord]) -> Table {
    let mut table = Table::new(NewsRecord::HEADERS);
    for record in records {
        table.push_row(vec![
            record.bill_no.to_string(),
            record.keyword.clone(),
            record.date.format("%Y-%m-%d").to_string(),
            record.count.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_no_parse_trims_and_rejects_blank() {
        assert_eq!(BillNo::parse(" 2210001 ").unwrap().as_str(), "2210001");
        assert!(BillNo::parse("   ").is_none());
    }

    #[test]
    fn test_bill_no_from_file_name_takes_seven_chars() {
        let bill = BillNo::from_file_name("2210001_의안원문.pdf").unwrap();
        assert_eq!(bill.as_str(), "2210001");

        let short = BillNo::from_file_name("a.pdf").unwrap();
        assert_eq!(short.as_str(), "a.pdf");
    }

    #[test]
    fn test_bill_no_from_file_name_counts_characters() {
        let bill = BillNo::from_file_name("주택임대차보호법.pdf").unwrap();
        assert_eq!(bill.as_str(), "주택임대차보호");
    }

    #[test]
    fn test_bills_to_table_layout() {
        let table = bills_to_table(&[BillRecord {
            bill_no: "2210001".into(),
            name: "주택임대차보호법 일부개정법률안".into(),
            proposal_date: "2025-04-01".into(),
            resolution_date: "2025-05-20".into(),
            detail_url: String::new(),
            pdf_path: String::new(),
        }]);
        assert_eq!(table.headers[0], "의안번호");
        assert_eq!(table.headers[5], "PDF 파일 경로");
        assert_eq!(table.cell(0, columns::RESOLUTION_DATE), Some("2025-05-20"));
    }

    #[test]
    fn test_keyword_records_fill_missing_slots() {
        let table = Table::parse("의안번호\t주요단어 1\t주요단어 2\nB001\tapple\t\n").unwrap();
        let records = keyword_records(&table, 5).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].keywords, vec!["apple", "", "", "", ""]);
        assert_eq!(records[0].first_keyword(), Some("apple"));
    }

    #[test]
    fn test_keyword_records_require_bill_column() {
        let table = Table::parse("주요단어 1\napple\n").unwrap();
        assert!(matches!(
            keyword_records(&table, 3),
            Err(TableError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_keyword_records_reject_blank_bill() {
        let table = Table::parse("의안번호\t주요단어 1\n\tapple\n").unwrap();
        assert!(matches!(
            keyword_records(&table, 3),
            Err(TableError::InvalidValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_first_keyword_blank_is_none() {
        let record = KeywordRecord {
            bill_no: BillNo::parse("B001").unwrap(),
            keywords: vec!["  ".into(), "apple".into()],
        };
        assert_eq!(record.first_keyword(), None);
    }

    #[test]
    fn test_duplicate_bills_reported_once() {
        let rec = |b: &str| KeywordRecord {
            bill_no: BillNo::parse(b).unwrap(),
            keywords: vec![],
        };
        let dups = duplicate_bills(&[rec("A"), rec("B"), rec("A"), rec("A")]);
        assert_eq!(dups, vec![BillNo::parse("A").unwrap()]);
    }

    #[test]
    fn test_keywords_to_table_pads_slots() {
        let table = keywords_to_table(
            &[KeywordRecord {
                bill_no: BillNo::parse("2210001").unwrap(),
                keywords: vec!["주택".into()],
            }],
            3,
        );
        assert_eq!(table.headers, keyword_headers(3));
        assert_eq!(table.rows[0], vec!["2210001", "주택", "", ""]);
    }

    #[test]
    fn test_news_to_table_formats_date() {
        let table = news_to_table(&[NewsRecord {
            bill_no: BillNo::parse("2210001").unwrap(),
            keyword: "주택".into(),
            date: NaiveDate::from_ymd_opt(2025, 5, 25).unwrap(),
            count: 12,
        }]);
        assert_eq!(table.rows[0], vec!["2210001", "주택", "2025-05-25", "12"]);
    }
}
