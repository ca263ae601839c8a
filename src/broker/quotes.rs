// 4.3: market data entry. bars settle resting requests of monitored symbols.

use super::core::{Broker, Recording};
use super::results::{BrokerError, SettlementResult};
use crate::ohlc::{OhlcBar, OhlcKind};
use crate::quote_feed::QuoteListener;
use chrono::NaiveDate;

impl Broker {
    /// Settle the book of `symbol` against one bar.
    ///
    /// Bars for symbols without resting requests are skipped without error,
    /// the feed delivers every subscribed symbol whether anyone trades it or not.
    pub fn on_ohlc(&mut self, symbol: &str, bar: &OhlcBar) -> Result<SettlementResult, BrokerError> {
        bar.validate()?;

        if !self.monitored.contains(symbol) {
            return Ok(SettlementResult::skipped(symbol));
        }
        let Some(book) = self.books.get_mut(symbol) else {
            // monitored implies subscribed; recover by dropping the stale entry
            self.monitored.remove(symbol);
            return Ok(SettlementResult::skipped(symbol));
        };

        let mut sink = Recording::new(&mut self.channel);
        let summary = book.check_ohlc_deal(bar, &mut sink);
        let fills = sink.into_fills();
        let pruned = self.prune_if_empty(symbol);

        Ok(SettlementResult {
            symbol: symbol.to_string(),
            summary,
            fills,
            skipped: false,
            pruned,
        })
    }

    /// Parse a stored bar line and settle against it.
    pub fn on_ohlc_line(&mut self, symbol: &str, line: &str) -> Result<SettlementResult, BrokerError> {
        let (_, bar) = OhlcBar::parse(line)?;
        self.on_ohlc(symbol, &bar)
    }
}

impl QuoteListener for Broker {
    type Error = BrokerError;

    fn on_day_start(&mut self, date: NaiveDate) {
        tracing::info!(%date, monitored = self.monitored.len(), "trading day started");
    }

    fn on_ohlc(&mut self, symbol: &str, _kind: OhlcKind, bar: &OhlcBar) -> Result<(), Self::Error> {
        Broker::on_ohlc(self, symbol, bar).map(|_| ())
    }

    fn on_day_end(&mut self, date: NaiveDate) {
        tracing::info!(%date, events = self.channel.event_count(), "trading day ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerConfig;
    use crate::events::{EventPayload, FillSource};
    use crate::ohlc::BarError;
    use crate::types::{Timestamp, UserId};
    use rust_decimal_macros::dec;

    fn bar(high: rust_decimal::Decimal, low: rust_decimal::Decimal, volume: u64) -> OhlcBar {
        OhlcBar::new(Timestamp::from_millis(60_000), low, high, low, high, volume).unwrap()
    }

    #[test]
    fn unmonitored_symbol_is_skipped() {
        let mut broker = Broker::new(BrokerConfig::default());
        broker.subscribe("9527").unwrap();

        let result = broker.on_ohlc("9527", &bar(dec!(12), dec!(10), 100)).unwrap();
        assert!(result.skipped);
        assert!(result.fills.is_empty());

        let result = broker.on_ohlc("0050", &bar(dec!(12), dec!(10), 100)).unwrap();
        assert!(result.skipped);
    }

    #[test]
    fn bar_fills_resting_request_and_prunes() {
        let mut broker = Broker::new(BrokerConfig::default());
        broker.subscribe("9527").unwrap();
        broker
            .buy(UserId(7), "9527", "b1", Timestamp::from_millis(0), dec!(11.50), 3)
            .unwrap();

        let result = broker.on_ohlc("9527", &bar(dec!(12), dec!(11), 10)).unwrap();

        assert!(!result.skipped);
        assert!(result.pruned);
        assert_eq!(result.summary.volume, 3);
        assert_eq!(result.fills.len(), 1);
        match &result.fills[0] {
            EventPayload::Bought(fill) => {
                assert_eq!(fill.price.value(), dec!(11.50));
                assert_eq!(fill.source, FillSource::Bar);
                assert_eq!(fill.timestamp, Timestamp::from_millis(0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!broker.is_monitored("9527"));
    }

    #[test]
    fn bar_fill_carries_request_time() {
        let mut broker = Broker::new(BrokerConfig::default());
        broker.subscribe("9527").unwrap();
        let placed = Timestamp::from_millis(0);
        broker.buy(UserId(7), "9527", "b1", placed, dec!(11.50), 1).unwrap();

        let mut late = bar(dec!(12), dec!(11), 1);
        late.timestamp = Timestamp::from_millis(300_000);
        let result = broker.on_ohlc("9527", &late).unwrap();

        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].fill().timestamp, placed);
        let emitted: Vec<Timestamp> = broker.events().map(|e| e.payload.fill().timestamp).collect();
        assert_eq!(emitted, vec![placed]);
    }

    #[test]
    fn inverted_bar_is_rejected() {
        let mut broker = Broker::new(BrokerConfig::default());
        broker.subscribe("9527").unwrap();
        let mut inverted = bar(dec!(12), dec!(10), 5);
        std::mem::swap(&mut inverted.high, &mut inverted.low);

        let err = broker.on_ohlc("9527", &inverted).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidBar(BarError::InvertedRange { .. })));
    }

    #[test]
    fn line_entry_parses_then_settles() {
        let mut broker = Broker::new(BrokerConfig::default());
        broker.subscribe("2330").unwrap();
        broker
            .sell(UserId(1), "2330", "s1", Timestamp::from_millis(0), dec!(335.5), 2)
            .unwrap();

        let result = broker
            .on_ohlc_line("2330", "2020/07/06 13:06, 335.5, 336.0, 335.5, 335.5, 77")
            .unwrap();
        assert_eq!(result.summary.volume, 2);
        assert!(matches!(&result.fills[0], EventPayload::Sold(f) if f.price.value() == dec!(335.5)));

        let err = broker.on_ohlc_line("2330", "not a bar").unwrap_err();
        assert_eq!(err, BrokerError::InvalidBar(BarError::FieldCount(1)));
    }

    #[test]
    fn pruning_can_be_disabled() {
        let config = BrokerConfig {
            prune_empty_books: false,
            ..BrokerConfig::default()
        };
        let mut broker = Broker::new(config);
        broker.subscribe("9527").unwrap();
        broker
            .buy(UserId(7), "9527", "b1", Timestamp::from_millis(0), dec!(11.50), 1)
            .unwrap();

        let result = broker.on_ohlc("9527", &bar(dec!(12), dec!(11), 10)).unwrap();
        assert!(!result.pruned);
        assert!(broker.is_monitored("9527"));
    }
}
