// 7.0 quote_feed.rs: historical bar replay.
// collects bars for any number of symbols and plays them back in time order,
// one trading day at a time, into a QuoteListener (normally the Broker).

use crate::ohlc::{BarError, OhlcBar, OhlcKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Receives replayed market data.
pub trait QuoteListener {
    type Error: fmt::Display;

    fn on_day_start(&mut self, _date: NaiveDate) {}

    fn on_ohlc(&mut self, symbol: &str, kind: OhlcKind, bar: &OhlcBar) -> Result<(), Self::Error>;

    fn on_day_end(&mut self, _date: NaiveDate) {}
}

/** 7.1: replay settings */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Abort the replay on the first bar the listener rejects.
    pub stop_on_error: bool,
    /// Bar kinds delivered to the listener. Others are dropped at push time.
    pub kinds: Vec<OhlcKind>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            stop_on_error: false,
            kinds: vec![OhlcKind::Minute, OhlcKind::Day],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub days: usize,
    pub bars: usize,
    /// Bars the listener returned an error for.
    pub failed: usize,
    pub stopped_early: bool,
}

#[derive(Debug, Clone)]
struct QuoteEntry {
    symbol: String,
    kind: OhlcKind,
    date: NaiveDate,
    bar: OhlcBar,
}

#[derive(Debug, Clone, Default)]
pub struct QuoteFeed {
    config: ReplayConfig,
    entries: Vec<QuoteEntry>,
}

impl QuoteFeed {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Queue a bar. Returns false if its kind is filtered out or its
    /// timestamp falls outside the calendar.
    pub fn push(&mut self, symbol: impl Into<String>, kind: OhlcKind, bar: OhlcBar) -> bool {
        if !self.config.kinds.contains(&kind) {
            return false;
        }
        let symbol = symbol.into();
        let Some(date) = bar.timestamp.date() else {
            tracing::warn!(%symbol, millis = bar.timestamp.as_millis(), "bar timestamp has no calendar date, dropped");
            return false;
        };
        self.entries.push(QuoteEntry {
            symbol,
            kind,
            date,
            bar,
        });
        true
    }

    /// Parse a stored line and queue it; the kind comes from the line itself.
    pub fn push_line(&mut self, symbol: &str, line: &str) -> Result<bool, BarError> {
        let (kind, bar) = OhlcBar::parse(line)?;
        Ok(self.push(symbol, kind, bar))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deliver every queued bar in order: by date, minute bars before the day
    /// bar, then by time. Bars that compare equal keep their push order.
    pub fn replay<L: QuoteListener>(&self, listener: &mut L) -> ReplaySummary {
        let mut ordered: Vec<&QuoteEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| (entry.date, entry.kind, entry.bar.timestamp));

        let mut summary = ReplaySummary::default();
        let mut current_day: Option<NaiveDate> = None;

        for entry in ordered {
            let date = entry.date;
            if current_day != Some(date) {
                if let Some(previous) = current_day {
                    listener.on_day_end(previous);
                }
                listener.on_day_start(date);
                current_day = Some(date);
                summary.days += 1;
            }

            summary.bars += 1;
            if let Err(e) = listener.on_ohlc(&entry.symbol, entry.kind, &entry.bar) {
                summary.failed += 1;
                tracing::error!(
                    symbol = %entry.symbol,
                    time = %entry.bar.timestamp,
                    error = %e,
                    "bar rejected during replay"
                );
                if self.config.stop_on_error {
                    summary.stopped_early = true;
                    break;
                }
            }
        }

        if let Some(last) = current_day {
            listener.on_day_end(last);
        }

        tracing::info!(
            days = summary.days,
            bars = summary.bars,
            failed = summary.failed,
            "replay finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Journal {
        lines: Vec<String>,
        reject: Option<&'static str>,
    }

    impl QuoteListener for Journal {
        type Error = String;

        fn on_day_start(&mut self, date: NaiveDate) {
            self.lines.push(format!("start {date}"));
        }

        fn on_ohlc(&mut self, symbol: &str, kind: OhlcKind, bar: &OhlcBar) -> Result<(), String> {
            self.lines.push(format!("{symbol} {kind:?} {}", bar.timestamp));
            if self.reject == Some(symbol) {
                return Err(format!("{symbol} rejected"));
            }
            Ok(())
        }

        fn on_day_end(&mut self, date: NaiveDate) {
            self.lines.push(format!("end {date}"));
        }
    }

    fn feed(config: ReplayConfig) -> QuoteFeed {
        let mut feed = QuoteFeed::new(config);
        feed.push_line("2330", "2020/07/07, 10, 11, 9, 10, 100").unwrap();
        feed.push_line("2330", "2020/07/06 13:06, 10, 11, 9, 10, 5").unwrap();
        feed.push_line("2330", "2020/07/06, 10, 11, 9, 10, 100").unwrap();
        feed.push_line("0050", "2020/07/06 09:01, 10, 11, 9, 10, 5").unwrap();
        feed
    }

    #[test]
    fn replays_chronologically_grouped_by_day() {
        let mut journal = Journal::default();
        let summary = feed(ReplayConfig::default()).replay(&mut journal);

        assert_eq!(
            journal.lines,
            vec![
                "start 2020-07-06",
                "0050 Minute 2020-07-06 09:01:00",
                "2330 Minute 2020-07-06 13:06:00",
                "2330 Day 2020-07-06 00:00:00",
                "end 2020-07-06",
                "start 2020-07-07",
                "2330 Day 2020-07-07 00:00:00",
                "end 2020-07-07",
            ]
        );
        assert_eq!(summary.days, 2);
        assert_eq!(summary.bars, 4);
        assert_eq!(summary.failed, 0);
        assert!(!summary.stopped_early);
    }

    #[test]
    fn kind_filter_drops_bars() {
        let feed = feed(ReplayConfig {
            kinds: vec![OhlcKind::Day],
            ..ReplayConfig::default()
        });
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn undated_bar_is_dropped() {
        let mut feed = feed(ReplayConfig::default());
        let far = OhlcBar::new(
            crate::types::Timestamp::from_millis(i64::MAX),
            rust_decimal::Decimal::TEN,
            rust_decimal::Decimal::TEN,
            rust_decimal::Decimal::TEN,
            rust_decimal::Decimal::TEN,
            1,
        )
        .unwrap();

        assert!(!feed.push("2330", OhlcKind::Minute, far));
        assert_eq!(feed.len(), 4);

        let mut journal = Journal::default();
        let summary = feed.replay(&mut journal);
        assert_eq!(summary.days, 2);
        assert!(!journal.lines.iter().any(|l| l.contains("1970")));
    }

    #[test]
    fn listener_errors_counted_and_replay_continues() {
        let mut journal = Journal {
            reject: Some("0050"),
            ..Journal::default()
        };
        let summary = feed(ReplayConfig::default()).replay(&mut journal);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bars, 4);
        assert!(!summary.stopped_early);
    }

    #[test]
    fn stop_on_error_still_closes_the_day() {
        let mut journal = Journal {
            reject: Some("0050"),
            ..Journal::default()
        };
        let summary = feed(ReplayConfig {
            stop_on_error: true,
            ..ReplayConfig::default()
        })
        .replay(&mut journal);

        assert!(summary.stopped_early);
        assert_eq!(summary.bars, 1);
        assert_eq!(journal.lines.last().map(String::as_str), Some("end 2020-07-06"));
    }

    #[test]
    fn bad_line_is_rejected() {
        let mut feed = QuoteFeed::default();
        assert!(feed.push_line("2330", "2020/07/06, 10, 11").is_err());
        assert!(feed.is_empty());
    }
}
