//! Spreadsheet port trait.

use crate::domain::error::TradeDeskError;
use crate::domain::sheet::SheetCell;

pub trait SheetPort {
    /// Values of one column (1-based), top to bottom.
    fn column_values(&self, worksheet: &str, column: usize) -> Result<Vec<String>, TradeDeskError>;

    /// Every row of the worksheet, unformatted.
    fn all_values(&self, worksheet: &str) -> Result<Vec<Vec<String>>, TradeDeskError>;

    /// Write `rows` starting at the A1 cell `start`.
    fn update(
        &self,
        worksheet: &str,
        start: &str,
        rows: &[Vec<SheetCell>],
    ) -> Result<(), TradeDeskError>;
}
