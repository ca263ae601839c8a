//! Property-based tests for the settlement primitives.
//!
//! These tests verify invariants of deal, deal_ohlc and the queue orderings
//! under random inputs.

use ohlc_match_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|x| Decimal::new(x, 2)) // 0.01 to 999.99
}

fn volume_strategy() -> impl Strategy<Value = Volume> {
    1u64..1_000u64
}

fn time_strategy() -> impl Strategy<Value = Timestamp> {
    (0i64..10_000i64).prop_map(|m| Timestamp::from_millis(m * 60_000))
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn request(id: u64, side: Side, price: Decimal, volume: Volume, timestamp: Timestamp) -> Request {
    Request::new(
        RequestId(id),
        UserId(id),
        CorrelationId::new(format!("g-{id}")),
        "9527",
        timestamp,
        Price::new_unchecked(price),
        volume,
        side,
    )
}

fn request_strategy() -> impl Strategy<Value = (Side, Decimal, Volume, Timestamp)> {
    (side_strategy(), price_strategy(), volume_strategy(), time_strategy())
}

proptest! {
    /// Both sides lose exactly the filled volume, which is the smaller remainder.
    #[test]
    fn deal_conserves_volume(
        buy_price in price_strategy(),
        sell_price in price_strategy(),
        buy_volume in volume_strategy(),
        sell_volume in volume_strategy(),
        buy_time in time_strategy(),
        sell_time in time_strategy(),
    ) {
        let mut buy = request(1, Side::Buy, buy_price, buy_volume, buy_time);
        let mut sell = request(2, Side::Sell, sell_price, sell_volume, sell_time);

        match Request::deal(&mut buy, &mut sell) {
            Some(fill) => {
                prop_assert_eq!(fill.volume, buy_volume.min(sell_volume));
                prop_assert_eq!(buy.remaining_volume, buy_volume - fill.volume);
                prop_assert_eq!(sell.remaining_volume, sell_volume - fill.volume);
                prop_assert!(buy.is_filled() || sell.is_filled());
                prop_assert_eq!(fill.timestamp, buy_time.max(sell_time));
            }
            None => {
                prop_assert_eq!(buy.remaining_volume, buy_volume);
                prop_assert_eq!(sell.remaining_volume, sell_volume);
            }
        }
    }

    /// A fill never happens across an open spread and always prices between the limits.
    #[test]
    fn deal_never_fills_negative_spread(
        buy_price in price_strategy(),
        sell_price in price_strategy(),
        volume in volume_strategy(),
    ) {
        let mut buy = request(1, Side::Buy, buy_price, volume, Timestamp::from_millis(0));
        let mut sell = request(2, Side::Sell, sell_price, volume, Timestamp::from_millis(0));

        let fill = Request::deal(&mut buy, &mut sell);
        if sell_price > buy_price {
            prop_assert!(fill.is_none());
        } else {
            let fill = fill.unwrap();
            prop_assert_eq!(fill.price.value(), sell_price);
            prop_assert!(fill.price.value() <= buy_price);
        }
    }

    /// Bar fills stay inside the bar's range and respect the request's limit.
    #[test]
    fn deal_ohlc_respects_bounds(
        side in side_strategy(),
        limit in price_strategy(),
        low in price_strategy(),
        range in 0i64..5_000i64,
        volume in volume_strategy(),
        available in 0u64..2_000u64,
    ) {
        let high = low + Decimal::new(range, 2);
        let mut req = request(1, side, limit, volume, Timestamp::from_millis(0));

        let (left, fill) = req.deal_ohlc(Price::new_unchecked(high), Price::new_unchecked(low), available);

        prop_assert_eq!(left + fill.volume, available);
        prop_assert_eq!(req.remaining_volume + fill.volume, volume);
        if let Some(price) = fill.price {
            let price = price.value();
            prop_assert!(price >= low && price <= high, "{} outside [{}, {}]", price, low, high);
            match side {
                Side::Buy => prop_assert!(price <= limit),
                Side::Sell => prop_assert!(price >= limit),
            }
            prop_assert!(fill.volume > 0);
        } else {
            prop_assert_eq!(fill.volume, 0);
        }
    }

    /// Queues come out in book order and a re-sort changes nothing.
    #[test]
    fn sort_book_orders_queues(
        specs in proptest::collection::vec(request_strategy(), 0..40),
    ) {
        let (mut buys, mut sells): (Vec<Request>, Vec<Request>) = specs
            .iter()
            .enumerate()
            .map(|(i, &(side, price, volume, time))| request(i as u64, side, price, volume, time))
            .partition(|r| r.side == Side::Buy);

        sort_book(Side::Buy, &mut buys);
        sort_book(Side::Sell, &mut sells);
        prop_assert!(BuyBookOrder.is_sorted(&buys));
        prop_assert!(SellBookOrder.is_sorted(&sells));

        for pair in buys.windows(2) {
            prop_assert!(pair[0].limit_price >= pair[1].limit_price);
        }
        for pair in sells.windows(2) {
            prop_assert!(pair[0].limit_price <= pair[1].limit_price);
        }

        let before = buys.clone();
        sort_book(Side::Buy, &mut buys);
        prop_assert_eq!(before, buys);
    }

    /// Merge keeps every request and orders them by distance from the reference.
    #[test]
    fn merge_orders_by_aggressiveness(
        specs in proptest::collection::vec(request_strategy(), 0..40),
        reference in price_strategy(),
    ) {
        let (buys, sells): (Vec<Request>, Vec<Request>) = specs
            .iter()
            .enumerate()
            .map(|(i, &(side, price, volume, time))| request(i as u64, side, price, volume, time))
            .partition(|r| r.side == Side::Buy);
        let total = buys.len() + sells.len();

        let merged = Request::merge(reference, buys, sells);

        prop_assert_eq!(merged.len(), total);
        prop_assert!(MergeOrder::new(reference).is_sorted(&merged));
        for pair in merged.windows(2) {
            prop_assert!(pair[0].distance_from(reference) <= pair[1].distance_from(reference));
        }
    }
}

/// Fixed cases for the primitives
#[cfg(test)]
mod primitive_tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn merge_ties_break_by_time() {
        let early = request(1, Side::Buy, dec!(11.00), 1, Timestamp::from_millis(0));
        let late = request(2, Side::Sell, dec!(12.00), 1, Timestamp::from_millis(60_000));

        // both sit 0.50 from the reference
        let merged = Request::merge(dec!(11.50), vec![early], vec![late]);
        assert_eq!(merged[0].id, RequestId(1));
        assert_eq!(merged[1].id, RequestId(2));
    }

    #[test]
    fn deal_ohlc_zero_volume_bar() {
        let mut req = request(1, Side::Buy, dec!(11.20), 3, Timestamp::from_millis(0));
        let (left, fill) = req.deal_ohlc(Price::new_unchecked(dec!(11.10)), Price::new_unchecked(dec!(11.00)), 0);
        assert_eq!(left, 0);
        assert!(fill.is_empty());
        assert_eq!(req.remaining_volume, 3);
    }

    #[test]
    fn deal_rejects_swapped_sides() {
        let mut a = request(1, Side::Sell, dec!(10), 1, Timestamp::from_millis(0));
        let mut b = request(2, Side::Buy, dec!(12), 1, Timestamp::from_millis(0));
        assert!(Request::deal(&mut a, &mut b).is_none());
        assert_eq!(a.remaining_volume, 1);
    }
}
