//! Tab-separated tables, the only contract between pipeline stages.
//!
//! Every stage reads and writes whole files: a header row followed by data
//! rows. Fields containing a tab, quote or line break are quoted with
//! doubled inner quotes; the parser accepts the same quoting plus CRLF line
//! endings.

use crate::error::TableError;
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;
use tracing::{debug, instrument};

const SEP: char = '\t';

/// A header row plus data rows, all cells kept as strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Parse TSV text. The first non-empty line is the header; data rows
    /// shorter than the header are padded with empty cells.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut rows = parse_rows(text.trim_start_matches('\u{FEFF}'));
        if rows.is_empty() {
            return Err(TableError::MissingHeader);
        }
        let headers = rows.remove(0);
        let width = headers.len();
        for row in &mut rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        Ok(Self { headers, rows })
    }

    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self, TableError> {
        let text = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text)?;
        debug!(rows = table.rows.len(), columns = table.headers.len(), "Read table");
        Ok(table)
    }

    /// Write the table, creating the parent directory and replacing any
    /// existing file.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn write(&self, path: &Path) -> Result<(), TableError> {
        let io_err = |source| TableError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_tsv_string()).map_err(io_err)?;
        debug!(rows = self.rows.len(), "Wrote table");
        Ok(())
    }

    pub fn to_tsv_string(&self) -> String {
        let mut buf: Vec<u8> = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = write_row(&mut buf, &self.headers);
        for row in &self.rows {
            let _ = write_row(&mut buf, row);
        }
        match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Cell text at `row` under the header `name`, if both exist.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Replace the column `name`, or append it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                name: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let col = match self.column(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = value;
        }
        Ok(())
    }
}

/// Quote-aware TSV row parser. Blank lines are skipped; a line holding
/// only `""` is a row with one empty cell.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            c if c == SEP && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.len() == 1 && row[0].is_empty() && !quoted {
                    row.clear();
                } else {
                    rows.push(take(&mut row));
                }
                quoted = false;
            }
            _ => field.push(ch),
        }
    }

    // Trailing row without a final newline.
    if !field.is_empty() || !row.is_empty() || quoted {
        row.push(field);
        rows.push(row);
    }

    rows
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    // A lone empty cell would otherwise read back as a blank line.
    if row.len() == 1 && row[0].is_empty() {
        return writeln!(w, "\"\"");
    }
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEP}")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let table = Table::parse("의안번호\t주요단어 1\t주요단어 2\n2210001\t주택\n").unwrap();
        assert_eq!(table.headers, strings(&["의안번호", "주요단어 1", "주요단어 2"]));
        assert_eq!(table.rows, vec![strings(&["2210001", "주택", ""])]);
    }

    #[test]
    fn test_parse_crlf_and_missing_final_newline() {
        let table = Table::parse("a\tb\r\n1\t2\r\n3\t4").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(1, "b"), Some("4"));
    }

    #[test]
    fn test_parse_skips_bom_and_blank_lines() {
        let table = Table::parse("\u{FEFF}a\tb\n\n1\t2\n").unwrap();
        assert_eq!(table.headers, strings(&["a", "b"]));
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_empty_text_has_no_header() {
        assert!(matches!(Table::parse(""), Err(TableError::MissingHeader)));
    }

    #[test]
    fn test_write_then_read_reproduces_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.tsv");

        let mut table = Table::new(["의안번호", "의안명", "점수"]);
        table.push_row(strings(&["2210001", "주택임대차보호법\t일부개정", "42.0"]));
        table.push_row(strings(&["2210002", "say \"hi\"\nnext line", ""]));
        table.write(&path).unwrap();

        let back = Table::read(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_single_column_keeps_empty_cells() {
        let mut table = Table::new(["키워드"]);
        table.push_row(strings(&["주택"]));
        table.push_row(strings(&[""]));
        let text = table.to_tsv_string();
        assert_eq!(text, "키워드\n주택\n\"\"\n");

        let back = Table::parse(&text).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_set_column_appends_then_replaces() {
        let mut table = Table::new(["id"]);
        table.push_row(strings(&["a"]));
        table.push_row(strings(&["b"]));

        table.set_column("score", strings(&["1.0", "2.0"])).unwrap();
        assert_eq!(table.headers, strings(&["id", "score"]));

        table.set_column("score", strings(&["3.0", "4.0"])).unwrap();
        assert_eq!(table.headers.len(), 2);
        assert_eq!(table.cell(1, "score"), Some("4.0"));
    }

    #[test]
    fn test_set_column_rejects_wrong_length() {
        let mut table = Table::new(["id"]);
        table.push_row(strings(&["a"]));
        let err = table.set_column("score", vec![]).unwrap_err();
        assert!(matches!(err, TableError::ColumnLength { expected: 1, found: 0, .. }));
    }

    #[test]
    fn test_require_column() {
        let table = Table::new(["의안번호"]);
        assert_eq!(table.require_column("의안번호").unwrap(), 0);
        assert!(matches!(
            table.require_column("키워드"),
            Err(TableError::MissingColumn(name)) if name == "키워드"
        ));
    }
}
