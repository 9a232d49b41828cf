use super::*;
use crate::config::RiskParams;
use crate::signals::SignalKind;

const MINUTE: i64 = 60_000;

fn candle(index: usize, high: f64, low: f64, close: f64) -> Candle {
    CandleBuilder::builder()
        .timestamp_millis(1_700_000_000_000 + index as i64 * MINUTE)
        .open(close)
        .high(high)
        .low(low)
        .close(close)
        .volume(10.0)
        .build()
        .unwrap()
}

fn closes(prices: &[f64]) -> Arc<[Candle]> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| candle(i, close, close, close))
        .collect()
}

// Enters on every step where nothing is open: no signals, threshold 0.
fn always_enter(max_position_size: f64) -> Config {
    Config {
        signals: vec![],
        required_signals: 0,
        initial_balance: 1000.0,
        risk: RiskParams {
            max_position_size,
            ..RiskParams::default()
        },
        ..Config::default()
    }
}

#[test]
fn reject_empty_data() {
    let result = Backtest::new(Arc::from_iter(Vec::<Candle>::new()), Config::default());
    assert!(matches!(result, Err(Error::CandleDataEmpty)));
}

#[test]
fn reject_invalid_config() {
    let config = Config {
        initial_balance: 0.0,
        ..Config::default()
    };
    let result = Backtest::new(closes(&[100.0]), config);
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

#[test]
fn flat_market_places_nothing() {
    let data = closes(&[100.0; 60]);
    let config = Config {
        required_signals: 5,
        ..Config::default()
    };
    let mut bts = Backtest::new(data, config).unwrap();
    bts.run().unwrap();

    assert_eq!(bts.orders().count(), 0);
    assert_eq!(bts.positions().count(), 0);
    assert_eq!(bts.closed_orders().count(), 0);
    assert!(bts.trades().is_empty());
    assert_eq!(bts.balance(), bts.initial_balance());
}

#[test]
fn insufficient_data_fails_before_any_step() {
    let data = closes(&[100.0; 49]);
    let mut bts = Backtest::new(data, Config::default()).unwrap();

    let result = bts.run();
    assert!(matches!(
        result,
        Err(Error::DataInsufficiency {
            required: 50,
            available: 49
        })
    ));
    assert_eq!(bts.orders().count(), 0);
    assert!(bts.trades().is_empty());
}

#[test]
fn exact_lookback_runs_one_step() {
    // every signal active, threshold 0: the first step places an order
    let config = Config {
        required_signals: 0,
        ..Config::default()
    };
    let data = closes(&[100.0; 50]);
    let mut bts = Backtest::new(data, config).unwrap();
    assert_eq!(bts.signals().lookback(), 50);

    bts.run().unwrap();

    // a single step, on the last candle (index 49)
    assert_eq!(bts.orders().count(), 1);
    let order = bts.orders().next().unwrap();
    assert_eq!(order.id(), 1);
    assert_eq!(order.created_at(), bts.candles().nth(49).unwrap().timestamp());
    assert!(bts.trades().is_empty());
}

#[test]
fn order_fills_on_next_candle() {
    let data = Arc::from_iter(vec![
        candle(0, 100.0, 100.0, 100.0),
        // sharp dip through the limit, closes back at the entry
        candle(1, 101.0, 95.0, 100.0),
        candle(2, 101.5, 100.5, 101.0),
    ]);
    let mut bts = Backtest::new(data, always_enter(0.1)).unwrap();
    bts.run().unwrap();

    assert_eq!(bts.orders().count(), 0);
    assert_eq!(bts.closed_orders().count(), 1);
    let order = bts.closed_orders().next().unwrap();
    assert_eq!(order.id(), 1);
    assert_eq!(order.status(), OrderStatus::Filled);
    assert_eq!(order.created_at(), bts.candles().next().unwrap().timestamp());

    assert_eq!(bts.positions().count(), 1);
    let position = bts.positions().next().unwrap();
    assert_eq!(position.entry_price(), 100.0);
    assert_eq!(position.quantity(), 1.0);
    assert_eq!(position.stop_loss(), 98.0);
    assert_eq!(position.take_profit(), 104.0);
    assert_eq!(position.entry_time(), bts.candles().nth(1).unwrap().timestamp());

    assert_eq!(bts.balance(), 900.0);
    assert!(bts.trades().is_empty());
    assert_eq!(bts.unrealized_pnl(), 1.0);
    assert_eq!(bts.equity(), 1001.0);
}

#[test]
fn open_stake_counts_against_cash_return() {
    let data = Arc::from_iter(vec![
        candle(0, 100.0, 100.0, 100.0),
        candle(1, 101.0, 95.0, 100.0),
        candle(2, 101.5, 100.5, 101.0),
    ]);
    let mut bts = Backtest::new(data, always_enter(0.1)).unwrap();
    bts.run().unwrap();

    // 100 committed to the open position is out of the cash balance
    let metrics = crate::metrics::Metrics::from(&bts);
    assert_eq!(metrics.total_return_pct(), -10.0);
    assert_eq!(bts.equity(), 1001.0);
}

#[test]
fn order_waits_above_the_range() {
    let data = Arc::from_iter(vec![
        candle(0, 100.0, 100.0, 100.0),
        candle(1, 103.0, 101.0, 102.0),
        candle(2, 104.0, 102.0, 103.0),
    ]);
    let mut bts = Backtest::new(data, always_enter(0.1)).unwrap();
    bts.run().unwrap();

    // one pending order, never duplicated
    assert_eq!(bts.orders().count(), 1);
    assert_eq!(bts.closed_orders().count(), 0);
    assert_eq!(bts.positions().count(), 0);
    assert_eq!(bts.balance(), 1000.0);
}

#[test]
fn stop_loss_two_candles_after_entry() {
    let data = closes(&[100.0, 100.0, 99.0, 98.0]);
    let mut bts = Backtest::new(data, always_enter(0.1)).unwrap();
    bts.run().unwrap();

    assert_eq!(bts.trades().len(), 1);
    let trade = bts.trades()[0];
    assert_eq!(trade.reason(), ExitReason::StopLoss);
    assert_eq!(trade.exit_price(), trade.stop_loss());
    assert_eq!(trade.profit(), (trade.stop_loss() - trade.entry_price()) * trade.quantity());
    assert_eq!(trade.profit(), -2.0);
    assert_eq!(trade.entry_time(), bts.candles().nth(1).unwrap().timestamp());
    assert_eq!(trade.exit_time(), bts.candles().nth(3).unwrap().timestamp());
    assert_eq!(trade.balance(), 998.0);

    assert_eq!(bts.balance(), 998.0);
    assert_eq!(bts.positions().count(), 0);
}

#[test]
fn take_profit_closes_at_the_close() {
    let data = closes(&[100.0, 100.0, 102.0, 105.0]);
    let mut bts = Backtest::new(data, always_enter(0.1)).unwrap();
    bts.run().unwrap();

    assert_eq!(bts.trades().len(), 1);
    let trade = bts.trades()[0];
    assert_eq!(trade.reason(), ExitReason::TakeProfit);
    assert_eq!(trade.exit_price(), 105.0);
    assert_eq!(trade.profit(), 5.0);
    assert_eq!(bts.balance(), 1005.0);
}

#[test]
fn vanishing_price_skips_the_entry() {
    let data = closes(&[100.0, 100.0, 100.0, 1e-320, 1e-320]);
    let mut bts = Backtest::new(data, always_enter(0.1)).unwrap();
    bts.run().unwrap();

    // the stop closes the first trade, then no finite quantity can be bought
    assert_eq!(bts.trades().len(), 1);
    assert_eq!(bts.trades()[0].reason(), ExitReason::StopLoss);
    assert_eq!(bts.orders().count(), 0);
    assert_eq!(bts.positions().count(), 0);
    assert_eq!(bts.closed_orders().count(), 1);
}

#[test]
fn empty_balance_blocks_entries() {
    let mut prices = vec![100.0, 100.0, 0.0];
    prices.extend([100.0; 5]);
    let mut bts = Backtest::new(closes(&prices), always_enter(1.0)).unwrap();
    bts.run().unwrap();

    assert_eq!(bts.trades().len(), 1);
    assert_eq!(bts.trades()[0].profit(), -1000.0);
    assert_eq!(bts.balance(), 0.0);
    assert_eq!(bts.orders().count(), 0);
    assert_eq!(bts.closed_orders().count(), 1);
}

#[test]
fn fixed_stake_over_balance_is_voided() {
    let mut config = always_enter(1.0);
    config.risk.sizing = Sizing::Fixed;
    let data = closes(&[100.0, 100.0, 98.0, 100.0, 100.0]);
    let mut bts = Backtest::new(data, config).unwrap();
    bts.run().unwrap();

    assert_eq!(bts.trades().len(), 1);
    assert_eq!(bts.balance(), 980.0);

    let voided = bts.voided_orders().collect::<Vec<_>>();
    assert_eq!(voided.len(), 1);
    assert_eq!(voided[0].id(), 2);
    assert_eq!(voided[0].cost(), 1000.0);
    assert_eq!(bts.positions().count(), 0);
    // a fresh order is placed once the voided one is gone
    assert_eq!(bts.orders().count(), 1);
    assert_eq!(bts.orders().next().unwrap().id(), 3);
}

#[test]
fn compounding_stake_follows_balance() {
    let data = closes(&[100.0, 100.0, 98.0, 100.0, 100.0]);
    let mut bts = Backtest::new(data, always_enter(0.5)).unwrap();
    bts.run().unwrap();

    // 50% of 1000, stopped at -2%, then 50% of 990
    assert_eq!(bts.trades()[0].profit(), -10.0);
    let position = bts.positions().next().unwrap();
    assert_eq!(position.cost(), 495.0);
    assert_eq!(bts.balance(), 495.0);
}

#[test]
fn loop_starts_after_warmup() {
    let config = Config {
        signals: vec![SignalKind::Volume],
        required_signals: 0,
        ..Config::default()
    };
    let data = closes(&[100.0, 101.0, 102.0]);
    let mut bts = Backtest::new(data, config).unwrap();
    bts.run().unwrap();

    // the volume rule needs two candles, so the first step is index 1
    let order = bts.closed_orders().chain(bts.orders()).next().unwrap();
    assert_eq!(order.created_at(), bts.candles().nth(1).unwrap().timestamp());
}

#[test]
fn run_is_idempotent() {
    let prices = (0..200)
        .map(|i| 100.0 + 8.0 * (i as f64 * 0.3).sin())
        .collect::<Vec<_>>();
    let mut bts = Backtest::new(closes(&prices), always_enter(0.2)).unwrap();

    bts.run().unwrap();
    let trades = bts.trades().to_vec();
    let balance = bts.balance();
    assert!(!trades.is_empty());

    bts.run().unwrap();
    assert_eq!(bts.trades(), trades.as_slice());
    assert_eq!(bts.balance(), balance);

    bts.reset();
    assert!(bts.trades().is_empty());
    assert_eq!(bts.balance(), bts.initial_balance());
}

#[test]
fn ledger_is_ordered_and_positions_exclusive() {
    let prices = (0..300)
        .map(|i| 100.0 + 10.0 * (i as f64 * 0.17).sin() + (i as f64 * 0.05))
        .collect::<Vec<_>>();
    let mut bts = Backtest::new(closes(&prices), always_enter(0.3)).unwrap();
    bts.run().unwrap();

    for pair in bts.trades().windows(2) {
        assert!(pair[0].exit_time() <= pair[1].entry_time());
        assert!(pair[0].order_id() < pair[1].order_id());
    }
    for trade in bts.trades() {
        assert!(trade.stop_loss() < trade.entry_price());
        assert!(trade.entry_price() < trade.take_profit());
        assert!(trade.entry_time() <= trade.exit_time());
    }
    assert!(bts.positions().count() <= 1);
    assert!(bts.balance() >= 0.0);
}
