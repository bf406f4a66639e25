//! Spreadsheet layout helpers shared by the ideas and trade logs.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::domain::error::TradeDeskError;
use crate::ports::sheet_port::SheetPort;

/// Logs are written from column B; column A is left to the sheet's own use.
pub const LOG_COLUMN: usize = 2;

/// One cell written to a worksheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SheetCell {
    Text(String),
    Number(f64),
    /// Leaves the existing cell content untouched.
    Blank,
}

impl SheetCell {
    pub fn text(value: impl Into<String>) -> Self {
        SheetCell::Text(value.into())
    }
}

impl From<f64> for SheetCell {
    fn from(value: f64) -> Self {
        SheetCell::Number(value)
    }
}

impl From<u64> for SheetCell {
    fn from(value: u64) -> Self {
        SheetCell::Number(value as f64)
    }
}

impl From<&str> for SheetCell {
    fn from(value: &str) -> Self {
        SheetCell::Text(value.to_string())
    }
}

impl From<String> for SheetCell {
    fn from(value: String) -> Self {
        SheetCell::Text(value)
    }
}

fn is_empty_cell(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "-"
}

/// Row number (1-based) where new rows should be appended, judged from one
/// column: the row before the first pair of consecutive empty cells, or the
/// row after the last value when no such gap exists.
pub fn first_empty_row(column: &[String]) -> usize {
    let mut consecutive = 0;
    for (idx, value) in column.iter().enumerate() {
        let row = idx + 1;
        if is_empty_cell(value) {
            consecutive += 1;
        } else {
            consecutive = 0;
        }
        if consecutive == 2 {
            return row - 1;
        }
    }
    column.len() + 1
}

/// Rows below the (1-based) `header_row`, keyed by the header's cells.
/// Short rows are padded with blanks.
pub fn records(values: &[Vec<String>], header_row: usize) -> Vec<HashMap<String, String>> {
    let idx = header_row.saturating_sub(1);
    let Some(keys) = values.get(idx) else {
        return Vec::new();
    };
    values[idx + 1..]
        .iter()
        .map(|row| {
            keys.iter()
                .enumerate()
                .map(|(i, key)| (key.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// A1 column letters for a 1-based column index.
pub fn column_letter(index: usize) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 reference of a cell.
pub fn cell_ref(column: usize, row: usize) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Append `rows` at the first free row of the log column. Returns the row
/// number written to.
pub fn append_rows(
    sheet: &dyn SheetPort,
    worksheet: &str,
    rows: &[Vec<SheetCell>],
) -> Result<usize, TradeDeskError> {
    let column = sheet.column_values(worksheet, LOG_COLUMN)?;
    let row = first_empty_row(&column);
    sheet.update(worksheet, &cell_ref(LOG_COLUMN, row), rows)?;
    info!(worksheet, row, count = rows.len(), "rows appended");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn col(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn first_empty_row_without_gaps() {
        assert_eq!(first_empty_row(&col(&["Date", "a", "b"])), 4);
        assert_eq!(first_empty_row(&[]), 1);
    }

    #[test]
    fn first_empty_row_stops_at_double_gap() {
        // rows 1..=6: value, value, empty, value, empty, empty
        let column = col(&["Date", "a", "", "b", "", "", "c"]);
        assert_eq!(first_empty_row(&column), 5);
    }

    #[test]
    fn single_gaps_and_dashes() {
        let column = col(&["Date", "", "a", "-", "b"]);
        assert_eq!(first_empty_row(&column), 6);
        let column = col(&["Date", "-", " "]);
        assert_eq!(first_empty_row(&column), 2);
    }

    #[test]
    fn records_use_header_row() {
        let values = vec![
            col(&["Trade ideas"]),
            col(&[]),
            col(&[]),
            col(&["Date", "Symbol", "Type", "Entry"]),
            col(&["2024-01-02", "INFY", "Long", "1500"]),
            col(&["2024-01-02", "SBIN"]),
        ];
        let recs = records(&values, 4);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0]["Symbol"], "INFY");
        assert_eq!(recs[0]["Entry"], "1500");
        assert_eq!(recs[1]["Type"], "");
    }

    #[test]
    fn records_missing_header() {
        assert!(records(&[col(&["a"])], 4).is_empty());
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(2), "B");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(703), "AAA");
        assert_eq!(cell_ref(2, 17), "B17");
    }

    #[test]
    fn cells_serialize_untagged() {
        let row = vec![SheetCell::text("INFY"), SheetCell::from(10u64), SheetCell::Blank];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"["INFY",10.0,null]"#);
    }

    struct FakeSheet {
        column: Vec<String>,
        writes: RefCell<Vec<(String, String, usize)>>,
    }

    impl SheetPort for FakeSheet {
        fn column_values(&self, _: &str, column: usize) -> Result<Vec<String>, TradeDeskError> {
            assert_eq!(column, LOG_COLUMN);
            Ok(self.column.clone())
        }

        fn all_values(&self, _: &str) -> Result<Vec<Vec<String>>, TradeDeskError> {
            Ok(Vec::new())
        }

        fn update(
            &self,
            worksheet: &str,
            start: &str,
            rows: &[Vec<SheetCell>],
        ) -> Result<(), TradeDeskError> {
            self.writes
                .borrow_mut()
                .push((worksheet.to_string(), start.to_string(), rows.len()));
            Ok(())
        }
    }

    #[test]
    fn append_rows_targets_first_free_row() {
        let sheet = FakeSheet {
            column: col(&["", "Date", "2024-01-02", "2024-01-03"]),
            writes: RefCell::new(Vec::new()),
        };
        let rows = vec![vec![SheetCell::text("x")], vec![SheetCell::text("y")]];
        assert_eq!(append_rows(&sheet, "DT Trades", &rows).unwrap(), 5);
        assert_eq!(
            *sheet.writes.borrow(),
            vec![("DT Trades".to_string(), "B5".to_string(), 2)]
        );
    }
}
