// 3.0: OHLC bars as delivered by the quote feed, plus the text line format
// the historical data is stored in: "2020/07/06 13:06, 335.5, 336.0, 335.5, 335.5, 77"

use crate::types::{Price, Timestamp, Volume};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DAY_FORMAT: &str = "%Y/%m/%d";
const MINUTE_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Bar resolution. Minute bars of a day replay before that day's bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OhlcKind {
    Minute,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BarError {
    #[error("expected 6 comma separated fields, found {0}")]
    FieldCount(usize),

    #[error("unparseable date/time {0:?}")]
    InvalidDateTime(String),

    #[error("unparseable {field} value {value:?}")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("{field} must be positive, got {value}")]
    NonPositivePrice { field: &'static str, value: Decimal },

    #[error("unparseable volume {0:?}")]
    InvalidVolume(String),

    #[error("low {low} is above high {high}")]
    InvertedRange { high: Price, low: Price },
}

/// One open/high/low/close/volume summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub timestamp: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Units tradable during the bar.
    pub volume: Volume,
}

impl OhlcBar {
    pub fn new(
        timestamp: Timestamp,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Volume,
    ) -> Result<Self, BarError> {
        let bar = Self {
            timestamp,
            open: positive("open", open)?,
            high: positive("high", high)?,
            low: positive("low", low)?,
            close: positive("close", close)?,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    pub fn validate(&self) -> Result<(), BarError> {
        if self.low > self.high {
            return Err(BarError::InvertedRange {
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }

    /// Midpoint of the bar's range, the anchor for OHLC settlement.
    pub fn reference_price(&self) -> Decimal {
        Price::midpoint(self.high, self.low)
    }

    /// Parse one stored line. A date without a time is a day bar.
    pub fn parse(line: &str) -> Result<(OhlcKind, OhlcBar), BarError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 6 {
            return Err(BarError::FieldCount(fields.len()));
        }

        let (kind, datetime) = parse_datetime(fields[0])?;

        let bar = OhlcBar::new(
            Timestamp::from_datetime(datetime),
            decimal("open", fields[1])?,
            decimal("high", fields[2])?,
            decimal("low", fields[3])?,
            decimal("close", fields[4])?,
            fields[5]
                .parse::<Volume>()
                .map_err(|_| BarError::InvalidVolume(fields[5].to_string()))?,
        )?;

        Ok((kind, bar))
    }
}

impl fmt::Display for OhlcBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}",
            self.timestamp, self.open, self.high, self.low, self.close, self.volume
        )
    }
}

fn parse_datetime(raw: &str) -> Result<(OhlcKind, NaiveDateTime), BarError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, MINUTE_FORMAT) {
        return Ok((OhlcKind::Minute, dt));
    }
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| (OhlcKind::Day, dt))
        .ok_or_else(|| BarError::InvalidDateTime(raw.to_string()))
}

fn decimal(field: &'static str, raw: &str) -> Result<Decimal, BarError> {
    Decimal::from_str(raw).map_err(|_| BarError::InvalidDecimal {
        field,
        value: raw.to_string(),
    })
}

fn positive(field: &'static str, value: Decimal) -> Result<Price, BarError> {
    Price::new(value).ok_or(BarError::NonPositivePrice { field, value })
}
