//! Request entry and internal crossing.

use super::core::{Broker, Recording};
use super::results::{BrokerError, OrderResult};
use crate::book::MatchSummary;
use crate::request::Request;
use crate::types::{CorrelationId, Price, Side, Timestamp, UserId, Volume};
use rust_decimal::Decimal;

impl Broker {
    /// Queue a buy limit request and cross it against resting sells.
    pub fn buy(
        &mut self,
        owner: UserId,
        symbol: &str,
        correlation_id: impl Into<CorrelationId>,
        timestamp: Timestamp,
        price: Decimal,
        volume: Volume,
    ) -> Result<OrderResult, BrokerError> {
        self.place(Side::Buy, owner, symbol, correlation_id.into(), timestamp, price, volume)
    }

    /// Queue a sell limit request and cross it against resting buys.
    pub fn sell(
        &mut self,
        owner: UserId,
        symbol: &str,
        correlation_id: impl Into<CorrelationId>,
        timestamp: Timestamp,
        price: Decimal,
        volume: Volume,
    ) -> Result<OrderResult, BrokerError> {
        self.place(Side::Sell, owner, symbol, correlation_id.into(), timestamp, price, volume)
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &mut self,
        side: Side,
        owner: UserId,
        symbol: &str,
        correlation_id: CorrelationId,
        timestamp: Timestamp,
        price: Decimal,
        volume: Volume,
    ) -> Result<OrderResult, BrokerError> {
        let limit_price = Price::new(price).ok_or(BrokerError::InvalidPrice(price))?;
        if volume == 0 {
            return Err(BrokerError::InvalidVolume(volume));
        }
        if !self.books.contains_key(symbol) {
            return Err(BrokerError::NotSubscribed(symbol.to_string()));
        }

        let request_id = self.next_request_id();
        let request = Request::new(
            request_id,
            owner,
            correlation_id,
            symbol,
            timestamp,
            limit_price,
            volume,
            side,
        );
        tracing::info!("new request: {request}");

        let book = self
            .books
            .get_mut(symbol)
            .ok_or_else(|| BrokerError::NotSubscribed(symbol.to_string()))?;
        book.insert(request);
        self.monitored.insert(symbol.to_string());

        let mut sink = Recording::new(&mut self.channel);
        let summary = if book.requests(side.opposite()).is_empty() {
            MatchSummary::default()
        } else {
            book.check_request_deal(&mut sink)
        };
        let fills = sink.into_fills();

        let remaining_volume = book.get(request_id).map_or(0, |r| r.remaining_volume);
        if summary.fills > 0 {
            self.prune_if_empty(symbol);
        }

        Ok(OrderResult {
            request_id,
            side,
            filled_volume: volume - remaining_volume,
            remaining_volume,
            is_resting: remaining_volume > 0,
            fills,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerConfig;
    use crate::events::EventPayload;
    use rust_decimal_macros::dec;

    fn broker() -> Broker {
        let mut broker = Broker::new(BrokerConfig::default());
        broker.subscribe("9527").unwrap();
        broker
    }

    #[test]
    fn rejects_invalid_input() {
        let mut broker = broker();

        assert_eq!(
            broker.buy(UserId(1), "9527", "g", Timestamp::from_millis(0), dec!(0), 1).unwrap_err(),
            BrokerError::InvalidPrice(dec!(0))
        );
        assert_eq!(
            broker.sell(UserId(1), "9527", "g", Timestamp::from_millis(0), dec!(-1), 1).unwrap_err(),
            BrokerError::InvalidPrice(dec!(-1))
        );
        assert_eq!(
            broker.buy(UserId(1), "9527", "g", Timestamp::from_millis(0), dec!(10), 0).unwrap_err(),
            BrokerError::InvalidVolume(0)
        );
        assert_eq!(
            broker.buy(UserId(1), "2330", "g", Timestamp::from_millis(0), dec!(10), 1).unwrap_err(),
            BrokerError::NotSubscribed("2330".to_string())
        );
        assert!(broker.book("9527").unwrap().is_empty());
        assert!(!broker.is_monitored("9527"));
    }

    #[test]
    fn resting_request_marks_symbol_monitored() {
        let mut broker = broker();

        let result = broker
            .buy(UserId(1), "9527", "g1", Timestamp::from_millis(0), dec!(11.00), 2)
            .unwrap();

        assert!(result.is_resting);
        assert_eq!(result.filled_volume, 0);
        assert!(result.fills.is_empty());
        assert!(broker.is_monitored("9527"));
        assert_eq!(broker.monitored_symbols().collect::<Vec<_>>(), vec!["9527"]);
    }

    #[test]
    fn crossing_reports_fills_for_new_request() {
        let mut broker = broker();
        broker
            .sell(UserId(2), "9527", "s1", Timestamp::from_millis(0), dec!(11.20), 1)
            .unwrap();

        let result = broker
            .buy(UserId(1), "9527", "b1", Timestamp::from_millis(1000), dec!(11.30), 3)
            .unwrap();

        assert_eq!(result.filled_volume, 1);
        assert_eq!(result.remaining_volume, 2);
        assert!(result.is_resting);
        assert_eq!(result.fills.len(), 2);
        assert!(matches!(&result.fills[0], EventPayload::Bought(f) if f.owner == UserId(1)));
        assert!(matches!(&result.fills[1], EventPayload::Sold(f) if f.owner == UserId(2)));
        assert_eq!(broker.events().count(), 2);
    }

    #[test]
    fn fully_crossed_book_is_pruned() {
        let mut broker = broker();
        broker
            .sell(UserId(2), "9527", "s1", Timestamp::from_millis(0), dec!(11.20), 1)
            .unwrap();
        let result = broker
            .buy(UserId(1), "9527", "b1", Timestamp::from_millis(0), dec!(11.20), 1)
            .unwrap();

        assert!(!result.is_resting);
        assert!(broker.book("9527").unwrap().is_empty());
        assert!(!broker.is_monitored("9527"));
    }

    #[test]
    fn request_ids_increase() {
        let mut broker = broker();
        let a = broker
            .buy(UserId(1), "9527", "a", Timestamp::from_millis(0), dec!(10), 1)
            .unwrap();
        let b = broker
            .buy(UserId(1), "9527", "b", Timestamp::from_millis(0), dec!(10), 1)
            .unwrap();
        assert!(b.request_id > a.request_id);
    }
}
