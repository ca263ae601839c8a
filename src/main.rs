//! OHLC Matching Simulation.
//!
//! Walks the broker through its lifecycle: requests crossing on arrival,
//! resting requests settling against bars, and a multi-day replay.

use ohlc_match_core::*;
use chrono::NaiveDateTime;
use rust_decimal_macros::dec;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::rc::Rc;

type SimResult = Result<(), Box<dyn Error>>;

fn main() -> SimResult {
    let config = load_config();
    init_logging(&config.logging)?;

    println!("OHLC Matching Core Simulation");
    println!("Limit requests, internal crossing, bar settlement\n");

    scenario_1_two_order_cross(&config)?;
    scenario_2_bar_fill(&config)?;
    scenario_3_no_cross(&config)?;
    scenario_4_partial_fill(&config)?;
    scenario_5_replay(&config)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

/// `OHLC_SIM_CONFIG` names a JSON config file; otherwise the development
/// preset with `LOG_FORMAT`/`LOG_TIMESTAMPS` applied.
fn load_config() -> SimulatorConfig {
    if let Ok(path) = std::env::var("OHLC_SIM_CONFIG") {
        match SimulatorConfig::from_path(&path) {
            Ok(config) => return config,
            Err(e) => eprintln!("ignoring {path}: {e}"),
        }
    }
    let mut config = Environment::Development.config();
    config.logging = LogConfig::from_env().with_default_level("warn");
    config
}

fn at(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y/%m/%d %H:%M").map(Timestamp::from_datetime)
}

fn print_fills(fills: &[EventPayload]) {
    for payload in fills {
        let fill = payload.fill();
        println!(
            "    {:<4} user {} {} x {} @ {} ({})",
            payload.side().to_string(),
            fill.owner,
            fill.symbol,
            fill.volume,
            fill.price,
            fill.timestamp
        );
    }
}

/// Buy 2 @ 11.20 against sell 1 @ 11.20.
fn scenario_1_two_order_cross(config: &SimulatorConfig) -> SimResult {
    println!("Scenario 1: Two Order Cross\n");

    let mut broker = Broker::new(config.broker.clone());
    broker.subscribe("9527")?;

    broker.buy(UserId(1), "9527", "alice-1", at("2020/07/06 09:00")?, dec!(11.20), 2)?;
    println!("  Alice bids 2 @ 11.20");
    let result = broker.sell(UserId(2), "9527", "bob-1", at("2020/07/06 09:01")?, dec!(11.20), 1)?;
    println!("  Bob offers 1 @ 11.20, filled {}", result.filled_volume);
    print_fills(&result.fills);

    if let Some(book) = broker.book("9527") {
        println!("  Resting: {} buy, {} sell\n", book.buy_requests().len(), book.sell_requests().len());
    }
    Ok(())
}

/// A resting bid settles against a bar that trades through it.
fn scenario_2_bar_fill(config: &SimulatorConfig) -> SimResult {
    println!("Scenario 2: Bar Fill\n");

    let mut broker = Broker::new(config.broker.clone());
    broker.subscribe("9527")?;
    broker.buy(UserId(1), "9527", "alice-1", at("2020/07/06 09:00")?, dec!(11.20), 1)?;
    println!("  Alice bids 1 @ 11.20");

    let result = broker.on_ohlc_line("9527", "2020/07/06 09:05, 11.10, 11.10, 11.05, 11.05, 1")?;
    println!("  Bar 11.10/11.05 x 1 settles {} unit(s)", result.summary.volume);
    print_fills(&result.fills);
    println!("  Still monitored: {}\n", broker.is_monitored("9527"));
    Ok(())
}

/// Bid below the ask: nothing trades.
fn scenario_3_no_cross(config: &SimulatorConfig) -> SimResult {
    println!("Scenario 3: No Cross\n");

    let mut broker = Broker::new(config.broker.clone());
    broker.subscribe("9527")?;
    broker.buy(UserId(1), "9527", "alice-1", at("2020/07/06 09:00")?, dec!(11.00), 1)?;
    let result = broker.sell(UserId(2), "9527", "bob-1", at("2020/07/06 09:00")?, dec!(11.10), 1)?;

    println!("  Bid 11.00, ask 11.10, fills: {}", result.fills.len());
    if let Some(spread) = broker.book("9527").and_then(OrderBook::spread) {
        println!("  Spread: {}\n", spread);
    }
    Ok(())
}

/// Buy 3 @ 11.30 takes the only offer and rests the remainder.
fn scenario_4_partial_fill(config: &SimulatorConfig) -> SimResult {
    println!("Scenario 4: Partial Fill\n");

    let mut broker = Broker::new(config.broker.clone());
    broker.subscribe("9527")?;
    broker.sell(UserId(2), "9527", "bob-1", at("2020/07/06 09:00")?, dec!(11.20), 1)?;
    let result = broker.buy(UserId(1), "9527", "alice-1", at("2020/07/06 09:01")?, dec!(11.30), 3)?;

    println!("  Filled {}, resting {}", result.filled_volume, result.remaining_volume);
    print_fills(&result.fills);
    if let Some(bid) = broker.book("9527").and_then(OrderBook::best_bid) {
        println!("  Best bid now {}\n", bid);
    }
    Ok(())
}

/// Two days of minute and day bars replayed into the broker, with a listener
/// keeping net positions per user.
fn scenario_5_replay(config: &SimulatorConfig) -> SimResult {
    println!("Scenario 5: Multi-Day Replay\n");

    let mut broker = Broker::new(config.broker.clone());
    for symbol in ["2330", "0050"] {
        broker.subscribe(symbol)?;
    }

    let positions: Rc<RefCell<BTreeMap<(UserId, String), i64>>> = Rc::default();
    let tally = Rc::clone(&positions);
    broker.add_listener(Box::new(move |event: &Event| -> Result<(), ListenerError> {
        let fill = event.payload.fill();
        let signed = match event.payload.side() {
            Side::Buy => fill.volume as i64,
            Side::Sell => -(fill.volume as i64),
        };
        *tally
            .borrow_mut()
            .entry((fill.owner, fill.symbol.clone()))
            .or_default() += signed;
        Ok(())
    }));

    broker.buy(UserId(1), "2330", "alice-2330", at("2020/07/06 09:00")?, dec!(335.0), 5)?;
    broker.sell(UserId(2), "2330", "bob-2330", at("2020/07/06 09:00")?, dec!(336.5), 3)?;
    broker.buy(UserId(3), "0050", "carol-0050", at("2020/07/06 09:00")?, dec!(84.0), 10)?;

    let mut feed = QuoteFeed::new(config.replay.clone());
    let lines = [
        ("2330", "2020/07/06 13:06, 335.5, 336.0, 335.5, 335.5, 2"),
        ("2330", "2020/07/06 13:07, 335.5, 335.5, 334.5, 335.0, 4"),
        ("0050", "2020/07/06 10:30, 84.5, 84.6, 84.2, 84.3, 50"),
        ("2330", "2020/07/07 09:01, 336.0, 337.0, 336.0, 336.5, 10"),
        ("0050", "2020/07/07, 84.0, 84.1, 83.6, 83.9, 1000"),
    ];
    for (symbol, line) in lines {
        feed.push_line(symbol, line)?;
    }

    let summary = feed.replay(&mut broker);
    println!(
        "  Replayed {} bars over {} days, {} rejected",
        summary.bars, summary.days, summary.failed
    );

    for ((owner, symbol), net) in positions.borrow().iter() {
        println!("  user {} {}: {:+}", owner, symbol, net);
    }
    println!("  Still monitored: {:?}", broker.monitored_symbols().collect::<Vec<_>>());
    println!("  Events generated: {}\n", broker.events().count());
    Ok(())
}
