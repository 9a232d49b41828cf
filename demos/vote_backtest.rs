//! Runs the signal-vote strategy and prints the ledger and the metrics.
//!
//! ```bash
//! RUST_LOG=bts_vote=debug cargo run --example vote
//! cargo run --example vote --features serde -- candles.json config.toml
//! ```

use std::sync::Arc;

use anyhow::Result;
use bts_vote::prelude::*;
use chrono::{DateTime, Duration};

/// Generates deterministic candle data.
fn generate_sample_candles(max: i32, seed: i32, base_price: f64) -> Result<Vec<Candle>> {
    let mut timestamp = DateTime::default();
    let mut open = base_price;

    (0..=max)
        .map(|i| {
            // Base price with trend (+ 0.05*i)
            let base_price = base_price + 0.05 * (i as f64);

            // Price variation using simple trigonometric function with seed
            let variation = 8.0 * ((i as f64 * 0.15 + seed as f64).sin() * 0.5 + 0.5);

            let close = base_price + variation;
            let high = (close + 0.3 * variation).max(open);
            let low = (close - 0.3 * variation).min(open);
            // Volume with seasonal pattern, spiking every 40 candles
            let mut volume = 1000.0 + 500.0 * ((i as f64 * 0.2).sin()).abs();
            if i % 40 == 0 {
                volume *= 4.0;
            }

            let candle = CandleBuilder::builder()
                .timestamp(timestamp)
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .volume(volume)
                .build()?;

            timestamp += Duration::hours(4);
            open = close;
            Ok(candle)
        })
        .collect()
}

fn default_config() -> Config {
    Config {
        required_signals: 1,
        ..Config::default()
    }
}

#[cfg(feature = "serde")]
fn load() -> Result<(Vec<Candle>, Config)> {
    let mut args = std::env::args().skip(1);
    let candles = match args.next() {
        Some(path) => get_data_from_file(path)?,
        None => generate_sample_candles(1000, 42, 100.0)?,
    };
    let config = match args.next() {
        Some(path) => Config::from_toml_file(path)?,
        None => default_config(),
    };
    Ok((candles, config))
}

#[cfg(not(feature = "serde"))]
fn load() -> Result<(Vec<Candle>, Config)> {
    Ok((generate_sample_candles(1000, 42, 100.0)?, default_config()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "bts_vote=info".into()),
        )
        .init();

    let (candles, config) = load()?;
    let mut backtest = Backtest::new(Arc::from_iter(candles), config)?;
    backtest.run()?;

    println!("{:>4} {:>20} {:>10} {:>10} {:>10} {:>12}", "id", "exit", "entry", "price", "profit", "balance");
    for trade in backtest.trades() {
        println!(
            "{:>4} {:>20} {:>10.2} {:>10.2} {:>10.2} {:>12.2}",
            trade.order_id(),
            trade.exit_time().format("%Y-%m-%d %H:%M"),
            trade.entry_price(),
            trade.exit_price(),
            trade.profit(),
            trade.balance(),
        );
    }
    println!();

    let open = backtest.positions().count();
    if open > 0 {
        println!("Open positions: {open} (unrealized {:.2})", backtest.unrealized_pnl());
    }
    let voided = backtest.voided_orders().count();
    if voided > 0 {
        println!("Voided orders: {voided}");
    }

    println!("{}", Metrics::from(&backtest));
    Ok(())
}
