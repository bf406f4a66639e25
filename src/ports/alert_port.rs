//! Alert service port trait.

use serde::Deserialize;

use crate::domain::alert::{AdvancedTrigger, BasicTrigger};
use crate::domain::error::TradeDeskError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerSummary {
    pub id: u64,
    #[serde(default)]
    pub rule_name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedTrigger {
    pub rule_name: String,
    #[serde(default)]
    pub id: Option<u64>,
}

pub trait AlertPort {
    fn triggers(&self) -> Result<Vec<TriggerSummary>, TradeDeskError>;

    fn create_basic(&self, trigger: &BasicTrigger) -> Result<CreatedTrigger, TradeDeskError>;

    fn create_advanced(&self, trigger: &AdvancedTrigger) -> Result<CreatedTrigger, TradeDeskError>;

    fn delete_trigger(&self, id: u64) -> Result<(), TradeDeskError>;
}
