//! Screener export rows to a chart-watchlist symbol list.

use crate::domain::rule_text::EXCHANGE;

/// `M&M` -> `NSE:M_M`, `BAJAJ-AUTO` -> `NSE:BAJAJ_AUTO`
pub fn chart_symbol(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| if c == '&' || c == '-' { '_' } else { c })
        .collect();
    format!("{EXCHANGE}:{cleaned}")
}

/// Symbols from data rows (header already removed). Rows with fewer than
/// two columns are ignored.
pub fn chart_symbols<I, R>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    rows.into_iter()
        .filter_map(|row| {
            let row = row.as_ref();
            if row.len() > 1 {
                Some(chart_symbol(&row[0]))
            } else {
                None
            }
        })
        .collect()
}

pub fn join_symbols(symbols: &[String]) -> String {
    symbols.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn names_are_cleaned() {
        assert_eq!(chart_symbol("M&M"), "NSE:M_M");
        assert_eq!(chart_symbol("BAJAJ-AUTO"), "NSE:BAJAJ_AUTO");
        assert_eq!(chart_symbol("TATA STEEL"), "NSE:TATASTEEL");
    }

    #[test]
    fn short_rows_are_skipped() {
        let rows = vec![row(&["INFY", "1500"]), row(&["orphan"]), row(&[]), row(&["M&M", "1"])];
        let symbols = chart_symbols(rows);
        assert_eq!(join_symbols(&symbols), "NSE:INFY,NSE:M_M");
    }
}
