// 8.0: reference data. which securities exist and how they are categorised.
// loaded once by the caller and handed to the Broker, never held in global state.
//
// JSON layout:
//   { "day_trading":     { "stock": [..], "etf": [..], "foreign_etf": [..] },
//     "non_day_trading": { "stock": [..], "etf": [..], "foreign_etf": [..] } }

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("cannot read stock categories: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stock categories: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLists {
    #[serde(default)]
    pub stock: Vec<String>,
    #[serde(default)]
    pub etf: Vec<String>,
    #[serde(default)]
    pub foreign_etf: Vec<String>,
}

impl CategoryLists {
    fn has_etf(&self, symbol: &str) -> bool {
        contains(&self.etf, symbol) || contains(&self.foreign_etf, symbol)
    }

    fn has_any(&self, symbol: &str) -> bool {
        contains(&self.stock, symbol) || self.has_etf(symbol)
    }

    fn collect<'a>(&'a self, stock: bool, etf: bool, out: &mut Vec<&'a str>) {
        if stock {
            out.extend(self.stock.iter().map(String::as_str));
        }
        if etf {
            out.extend(self.etf.iter().map(String::as_str));
            out.extend(self.foreign_etf.iter().map(String::as_str));
        }
    }
}

fn contains(list: &[String], symbol: &str) -> bool {
    list.iter().any(|s| s == symbol)
}

/// Selects categories for `StockCategory::stocks`. Leaving both flags of a
/// pair unset selects both, the same as setting both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub day_trading: bool,
    pub non_day_trading: bool,
    pub stock: bool,
    pub etf: bool,
}

impl CategoryFilter {
    pub fn all() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCategory {
    #[serde(default)]
    pub day_trading: CategoryLists,
    #[serde(default)]
    pub non_day_trading: CategoryLists,
}

impl StockCategory {
    pub fn from_json_str(json: &str) -> Result<Self, ReferenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.day_trading.has_any(symbol) || self.non_day_trading.has_any(symbol)
    }

    pub fn is_etf(&self, symbol: &str) -> bool {
        self.day_trading.has_etf(symbol) || self.non_day_trading.has_etf(symbol)
    }

    pub fn is_day_trading(&self, symbol: &str) -> bool {
        self.day_trading.has_any(symbol)
    }

    pub fn is_foreign_etf(&self, symbol: &str) -> bool {
        contains(&self.day_trading.foreign_etf, symbol)
            || contains(&self.non_day_trading.foreign_etf, symbol)
    }

    pub fn stocks(&self, filter: CategoryFilter) -> Vec<&str> {
        let either_session = filter.day_trading == filter.non_day_trading;
        let either_kind = filter.stock == filter.etf;
        let stock = either_kind || filter.stock;
        let etf = either_kind || filter.etf;

        let mut out = Vec::new();
        if either_session || filter.day_trading {
            self.day_trading.collect(stock, etf, &mut out);
        }
        if either_session || filter.non_day_trading {
            self.non_day_trading.collect(stock, etf, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "day_trading": { "stock": ["2330", "2317"], "etf": ["0050"], "foreign_etf": ["00712"] },
        "non_day_trading": { "stock": ["9527"], "etf": ["006208"] }
    }"#;

    #[test]
    fn lookups() {
        let categories = StockCategory::from_json_str(SAMPLE).unwrap();

        assert!(categories.contains("9527"));
        assert!(!categories.contains("1234"));
        assert!(categories.is_etf("00712"));
        assert!(categories.is_etf("006208"));
        assert!(!categories.is_etf("2330"));
        assert!(categories.is_day_trading("0050"));
        assert!(!categories.is_day_trading("9527"));
        assert!(categories.is_foreign_etf("00712"));
        assert!(!categories.is_foreign_etf("0050"));
    }

    #[test]
    fn filters() {
        let categories = StockCategory::from_json_str(SAMPLE).unwrap();

        assert_eq!(categories.stocks(CategoryFilter::all()).len(), 6);
        assert_eq!(
            categories.stocks(CategoryFilter { day_trading: true, stock: true, ..Default::default() }),
            vec!["2330", "2317"]
        );
        assert_eq!(
            categories.stocks(CategoryFilter { etf: true, ..Default::default() }),
            vec!["0050", "00712", "006208"]
        );
        assert_eq!(
            categories.stocks(CategoryFilter { non_day_trading: true, ..Default::default() }),
            vec!["9527", "006208"]
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            StockCategory::from_json_str("{ not json"),
            Err(ReferenceError::Decode(_))
        ));
    }
}
