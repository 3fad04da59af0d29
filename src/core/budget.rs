use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Budget data is stored and round-tripped but not edited by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(default)]
    pub settings: BudgetSettings,
    #[serde(default)]
    pub categories: Vec<Value>,
    #[serde(default)]
    pub transactions: Vec<Value>,
    #[serde(default)]
    pub periods: Periods,
    #[serde(default)]
    pub goals: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSettings {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Day of month a monthly period starts on.
    #[serde(default = "first_day")]
    pub period_start_day: u8,
    #[serde(default)]
    pub alerts_enabled: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn first_day() -> u8 {
    1
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            period_start_day: first_day(),
            alerts_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub spent: f64,
    #[serde(default)]
    pub remaining: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Periods {
    #[serde(default)]
    pub daily: PeriodTotals,
    #[serde(default)]
    pub weekly: PeriodTotals,
    #[serde(default)]
    pub monthly: PeriodTotals,
    #[serde(default)]
    pub yearly: PeriodTotals,
}
