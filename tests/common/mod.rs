#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use tradedesk::domain::alert::{AdvancedTrigger, BasicTrigger};
use tradedesk::domain::error::TradeDeskError;
use tradedesk::domain::sheet::SheetCell;
use tradedesk::ports::alert_port::{AlertPort, CreatedTrigger, TriggerSummary};
use tradedesk::ports::sheet_port::SheetPort;
use tradedesk::ports::watchlist_port::{Watchlist, WatchlistItem, WatchlistPort};

pub struct MockWatchlistPort {
    pub lists: Vec<Watchlist>,
    pub removed: RefCell<Vec<(u64, u64)>>,
    pub added: RefCell<Vec<(u64, String)>>,
    pub fail_add: bool,
}

impl MockWatchlistPort {
    pub fn new() -> Self {
        Self {
            lists: Vec::new(),
            removed: RefCell::new(Vec::new()),
            added: RefCell::new(Vec::new()),
            fail_add: false,
        }
    }

    pub fn with_list(mut self, id: u64, name: &str, symbols: &[&str]) -> Self {
        let items = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| WatchlistItem {
                id: id * 100 + i as u64,
                tradingsymbol: s.to_string(),
            })
            .collect();
        self.lists.push(Watchlist {
            id,
            name: name.to_string(),
            items,
        });
        self
    }

    pub fn failing_add(mut self) -> Self {
        self.fail_add = true;
        self
    }
}

impl WatchlistPort for MockWatchlistPort {
    fn watchlists(&self) -> Result<Vec<Watchlist>, TradeDeskError> {
        Ok(self.lists.clone())
    }

    fn remove_item(&self, watchlist_id: u64, item_id: u64) -> Result<(), TradeDeskError> {
        self.removed.borrow_mut().push((watchlist_id, item_id));
        Ok(())
    }

    fn add_item(&self, watchlist_id: u64, symbol: &str) -> Result<(), TradeDeskError> {
        if self.fail_add {
            return Err(TradeDeskError::Api {
                service: "kite".into(),
                status: 400,
                body: "watchlist full".into(),
            });
        }
        self.added
            .borrow_mut()
            .push((watchlist_id, symbol.to_string()));
        Ok(())
    }
}

pub struct MockAlertPort {
    pub existing: Vec<TriggerSummary>,
    pub basic: RefCell<Vec<BasicTrigger>>,
    pub advanced: RefCell<Vec<AdvancedTrigger>>,
    pub deleted: RefCell<Vec<u64>>,
    /// Rule names the service refuses.
    pub rejected: Vec<String>,
}

impl MockAlertPort {
    pub fn new() -> Self {
        Self {
            existing: Vec::new(),
            basic: RefCell::new(Vec::new()),
            advanced: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            rejected: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, id: u64, name: &str, status: &str) -> Self {
        self.existing.push(TriggerSummary {
            id,
            rule_name: name.to_string(),
            status: status.to_string(),
        });
        self
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejected.push(name.to_string());
        self
    }

    fn check(&self, name: &str) -> Result<(), TradeDeskError> {
        if self.rejected.iter().any(|r| r == name) {
            return Err(TradeDeskError::Api {
                service: "sentinel".into(),
                status: 400,
                body: format!("rule {name} rejected"),
            });
        }
        Ok(())
    }
}

impl AlertPort for MockAlertPort {
    fn triggers(&self) -> Result<Vec<TriggerSummary>, TradeDeskError> {
        Ok(self.existing.clone())
    }

    fn create_basic(&self, trigger: &BasicTrigger) -> Result<CreatedTrigger, TradeDeskError> {
        self.check(&trigger.rule_name())?;
        self.basic.borrow_mut().push(trigger.clone());
        Ok(CreatedTrigger {
            rule_name: trigger.rule_name(),
            id: Some(self.basic.borrow().len() as u64),
        })
    }

    fn create_advanced(&self, trigger: &AdvancedTrigger) -> Result<CreatedTrigger, TradeDeskError> {
        self.check(&trigger.name)?;
        self.advanced.borrow_mut().push(trigger.clone());
        Ok(CreatedTrigger {
            rule_name: trigger.name.clone(),
            id: None,
        })
    }

    fn delete_trigger(&self, id: u64) -> Result<(), TradeDeskError> {
        self.deleted.borrow_mut().push(id);
        Ok(())
    }
}

/// In-memory worksheets; `update` writes into the grid so later reads see it.
pub struct MockSheetPort {
    pub sheets: RefCell<HashMap<String, Vec<Vec<String>>>>,
    pub updates: RefCell<Vec<(String, String, Vec<Vec<SheetCell>>)>>,
}

impl MockSheetPort {
    pub fn new() -> Self {
        Self {
            sheets: RefCell::new(HashMap::new()),
            updates: RefCell::new(Vec::new()),
        }
    }

    pub fn with_rows(self, worksheet: &str, rows: &[&[&str]]) -> Self {
        let grid = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.sheets.borrow_mut().insert(worksheet.to_string(), grid);
        self
    }
}

fn split_ref(start: &str) -> (usize, usize) {
    let letters: String = start.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let row: usize = start[letters.len()..].parse().unwrap();
    let col = letters
        .chars()
        .fold(0, |acc, c| acc * 26 + (c as usize - 'A' as usize + 1));
    (col, row)
}

impl SheetPort for MockSheetPort {
    fn column_values(&self, worksheet: &str, column: usize) -> Result<Vec<String>, TradeDeskError> {
        let sheets = self.sheets.borrow();
        let Some(grid) = sheets.get(worksheet) else {
            return Err(TradeDeskError::NotFound {
                what: format!("worksheet '{worksheet}'"),
            });
        };
        let mut values: Vec<String> = grid
            .iter()
            .map(|row| row.get(column - 1).cloned().unwrap_or_default())
            .collect();
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    fn all_values(&self, worksheet: &str) -> Result<Vec<Vec<String>>, TradeDeskError> {
        self.sheets
            .borrow()
            .get(worksheet)
            .cloned()
            .ok_or_else(|| TradeDeskError::NotFound {
                what: format!("worksheet '{worksheet}'"),
            })
    }

    fn update(
        &self,
        worksheet: &str,
        start: &str,
        rows: &[Vec<SheetCell>],
    ) -> Result<(), TradeDeskError> {
        let (col, row) = split_ref(start);
        let mut sheets = self.sheets.borrow_mut();
        let grid = sheets.entry(worksheet.to_string()).or_default();
        for (r, cells) in rows.iter().enumerate() {
            let idx = row - 1 + r;
            if grid.len() <= idx {
                grid.resize(idx + 1, Vec::new());
            }
            for (c, cell) in cells.iter().enumerate() {
                let cidx = col - 1 + c;
                let line = &mut grid[idx];
                if line.len() <= cidx {
                    line.resize(cidx + 1, String::new());
                }
                match cell {
                    SheetCell::Text(t) => line[cidx] = t.clone(),
                    SheetCell::Number(n) => line[cidx] = n.to_string(),
                    SheetCell::Blank => {}
                }
            }
        }
        self.updates
            .borrow_mut()
            .push((worksheet.to_string(), start.to_string(), rows.to_vec()));
        Ok(())
    }
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
