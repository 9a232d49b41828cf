use ta::Next;
use ta::indicators::{BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage};

use crate::config::StrategyParams;
use crate::engine::Candle;
use crate::errors::{Error, Result};
use crate::signals::{OscillatorTrigger, SignalKind};

/// Ternary view of a signal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Bullish trigger.
    Long,
    /// Bearish trigger (only the oscillator produces it).
    Short,
    /// No trigger, including "not enough history yet".
    Flat,
}

/// A signal rule with its parameters.
///
/// Every variant reads the candle history up to and including the current
/// step and never looks ahead. Histories shorter than [`Signal::warmup`]
/// read as [`Reading::Flat`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// Close crosses above its simple moving average between the previous and the current step.
    TrendCrossover {
        /// Moving average window.
        window: usize,
    },
    /// RSI is oversold (long) or overbought (short).
    ///
    /// The RSI comes from `ta`, which smooths gains and losses with an EMA of
    /// `2 / (period + 1)` seeded from the first closes. Values differ from Wilder's
    /// smoothing (`1 / period`, seeded with a simple average) on the same closes,
    /// so thresholds are crossed on different candles than in talib-based tools.
    Oscillator {
        /// RSI period.
        period: usize,
        /// Oversold level.
        oversold: f64,
        /// Overbought level.
        overbought: f64,
        /// Edge or level trigger.
        trigger: OscillatorTrigger,
    },
    /// MACD line crosses above its signal line.
    ConvergenceDivergence {
        /// Fast EMA period.
        fast: usize,
        /// Slow EMA period.
        slow: usize,
        /// Signal line period.
        signal: usize,
    },
    /// Close breaks strictly outside the Bollinger bands, on either side.
    BandBreakout {
        /// Bands period.
        period: usize,
        /// Bands width in standard deviations.
        std_dev: f64,
    },
    /// Volume exceeds the mean of all prior volumes times a multiplier.
    VolumeAnomaly {
        /// Spike factor.
        multiplier: f64,
    },
}

fn indicator_error(error: impl std::fmt::Display) -> Error {
    Error::Indicator(error.to_string())
}

// Last two items of an iterator, oldest first.
fn last_two<T>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    let mut previous = None;
    let mut current = None;
    for value in values {
        previous = current.take();
        current = Some(value);
    }
    Some((previous?, current?))
}

impl Signal {
    /// Builds the signal of `kind` from the strategy parameters.
    pub fn from_params(kind: SignalKind, params: &StrategyParams) -> Self {
        match kind {
            SignalKind::Sma => Self::TrendCrossover {
                window: params.sma_window,
            },
            SignalKind::Rsi => Self::Oscillator {
                period: params.rsi_period,
                oversold: params.rsi_oversold,
                overbought: params.rsi_overbought,
                trigger: params.rsi_trigger,
            },
            SignalKind::Macd => Self::ConvergenceDivergence {
                fast: params.macd_fast,
                slow: params.macd_slow,
                signal: params.macd_signal,
            },
            SignalKind::Bollinger => Self::BandBreakout {
                period: params.bollinger_period,
                std_dev: params.bollinger_std_dev,
            },
            SignalKind::Volume => Self::VolumeAnomaly {
                multiplier: params.volume_multiplier,
            },
        }
    }

    /// Name of the signal in vote mappings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrendCrossover { .. } => "sma_crossover",
            Self::Oscillator { .. } => "rsi_oversold",
            Self::ConvergenceDivergence { .. } => "macd_crossover",
            Self::BandBreakout { .. } => "bollinger_breakout",
            Self::VolumeAnomaly { .. } => "volume_spike",
        }
    }

    /// Configured window of the signal, the history a run must at least supply.
    ///
    /// The signal may need a step or two more than this to fire, see [`Signal::warmup`].
    pub fn lookback(&self) -> usize {
        match *self {
            Self::TrendCrossover { window } => window,
            Self::Oscillator { period, .. } => period,
            Self::ConvergenceDivergence { slow, .. } => slow,
            Self::BandBreakout { period, .. } => period,
            // one prior volume
            Self::VolumeAnomaly { .. } => 2,
        }
    }

    /// Minimum history length for the signal to be able to fire.
    pub fn warmup(&self) -> usize {
        match *self {
            // sma defined at the previous step too
            Self::TrendCrossover { window } => window + 1,
            Self::Oscillator { period, trigger, .. } => match trigger {
                OscillatorTrigger::Level => period + 1,
                OscillatorTrigger::Edge => period + 2,
            },
            Self::ConvergenceDivergence { slow, signal, .. } => slow + signal,
            Self::BandBreakout { period, .. } => period,
            Self::VolumeAnomaly { .. } => 2,
        }
    }

    /// Boolean view: `true` on a bullish trigger.
    pub fn evaluate(&self, history: &[Candle]) -> Result<bool> {
        Ok(self.reading(history)? == Reading::Long)
    }

    /// Ternary view of the signal over `history`.
    pub fn reading(&self, history: &[Candle]) -> Result<Reading> {
        if history.len() < self.warmup() {
            return Ok(Reading::Flat);
        }

        let long = |fired: bool| if fired { Reading::Long } else { Reading::Flat };

        match *self {
            Self::TrendCrossover { window } => {
                let mut sma = SimpleMovingAverage::new(window).map_err(indicator_error)?;
                let tail = &history[history.len() - window - 1..];
                let points = tail.iter().map(|c| (c.close(), sma.next(c.close())));
                let fired = last_two(points)
                    .is_some_and(|((close0, sma0), (close1, sma1))| close0 < sma0 && close1 > sma1);
                Ok(long(fired))
            }
            Self::Oscillator {
                period,
                oversold,
                overbought,
                trigger,
            } => {
                let mut rsi = RelativeStrengthIndex::new(period).map_err(indicator_error)?;
                let Some((previous, current)) = last_two(history.iter().map(|c| rsi.next(c.close()))) else {
                    return Ok(Reading::Flat);
                };
                let oversold_now = current < oversold;
                let fired = match trigger {
                    OscillatorTrigger::Level => oversold_now,
                    OscillatorTrigger::Edge => oversold_now && previous >= oversold,
                };
                if fired {
                    Ok(Reading::Long)
                } else if current > overbought {
                    Ok(Reading::Short)
                } else {
                    Ok(Reading::Flat)
                }
            }
            Self::ConvergenceDivergence { fast, slow, signal } => {
                let mut macd = MovingAverageConvergenceDivergence::new(fast, slow, signal).map_err(indicator_error)?;
                let lines = history.iter().map(|c| {
                    let output = macd.next(c.close());
                    (output.macd, output.signal)
                });
                let fired = last_two(lines)
                    .is_some_and(|((macd0, signal0), (macd1, signal1))| macd1 > signal1 && macd0 <= signal0);
                Ok(long(fired))
            }
            Self::BandBreakout { period, std_dev } => {
                let mut bands = BollingerBands::new(period, std_dev).map_err(indicator_error)?;
                let tail = &history[history.len() - period..];
                let Some(output) = tail.iter().map(|c| bands.next(c.close())).last() else {
                    return Ok(Reading::Flat);
                };
                let close = tail.last().map(|c| c.close()).ok_or(Error::CandleNotFound)?;
                Ok(long(close > output.upper || close < output.lower))
            }
            Self::VolumeAnomaly { multiplier } => {
                let Some((latest, prior)) = history.split_last() else {
                    return Ok(Reading::Flat);
                };
                let mean = prior.iter().map(|c| c.volume()).sum::<f64>() / prior.len() as f64;
                Ok(long(latest.volume() > mean * multiplier))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CandleBuilder;

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                CandleBuilder::builder()
                    .timestamp_millis(i as i64 * 60_000)
                    .open(close)
                    .high(close)
                    .low(close)
                    .close(close)
                    .volume(100.0)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn with_volumes(volumes: &[f64]) -> Vec<Candle> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| {
                CandleBuilder::builder()
                    .timestamp_millis(i as i64 * 60_000)
                    .open(10.0)
                    .high(10.0)
                    .low(10.0)
                    .close(10.0)
                    .volume(volume)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn short_history_reads_flat() {
        let history = candles(&[1.0, 2.0]);
        let signals = [
            Signal::TrendCrossover { window: 5 },
            Signal::Oscillator {
                period: 14,
                oversold: 30.0,
                overbought: 70.0,
                trigger: OscillatorTrigger::Edge,
            },
            Signal::ConvergenceDivergence {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            Signal::BandBreakout {
                period: 20,
                std_dev: 2.0,
            },
            Signal::VolumeAnomaly { multiplier: 2.5 },
        ];
        for signal in signals {
            assert_eq!(signal.reading(&history[..1]).unwrap(), Reading::Flat, "{}", signal.name());
        }
    }

    #[test]
    fn warmup_windows() {
        assert_eq!(Signal::TrendCrossover { window: 50 }.warmup(), 51);
        assert_eq!(
            Signal::ConvergenceDivergence {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .warmup(),
            35
        );
        assert_eq!(
            Signal::BandBreakout {
                period: 20,
                std_dev: 2.0
            }
            .warmup(),
            20
        );
        assert_eq!(Signal::VolumeAnomaly { multiplier: 2.5 }.warmup(), 2);
    }

    #[test]
    fn lookback_is_the_configured_window() {
        let params = StrategyParams::default();
        let lookbacks = SignalKind::ALL.map(|kind| Signal::from_params(kind, &params).lookback());
        assert_eq!(lookbacks, [50, 14, 26, 20, 2]);

        for kind in SignalKind::ALL {
            let signal = Signal::from_params(kind, &params);
            assert!(signal.lookback() <= signal.warmup(), "{}", signal.name());
        }
    }

    #[test]
    fn trend_crossover_fires_on_the_cross_only() {
        let signal = Signal::TrendCrossover { window: 3 };

        // sma(3) at t-1 = 10, close 9 below; sma at t = 10.33, close 12 above
        let crossing = candles(&[10.0, 11.0, 10.0, 9.0, 12.0]);
        // sma at t-1 = 10.33, close 11 above already
        let above = candles(&[10.0, 10.0, 10.0, 11.0, 12.0]);
        let flat = candles(&[10.0; 6]);

        assert!(signal.evaluate(&crossing).unwrap());
        assert!(!signal.evaluate(&above).unwrap());
        assert!(!signal.evaluate(&flat).unwrap());
    }

    #[test]
    fn oscillator_edge_and_level() {
        // steady rise, then a crash pushes the RSI through the oversold line
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes.push(60.0);
        let history = candles(&closes);

        let edge = Signal::Oscillator {
            period: 5,
            oversold: 30.0,
            overbought: 70.0,
            trigger: OscillatorTrigger::Edge,
        };
        let level = Signal::Oscillator {
            period: 5,
            oversold: 30.0,
            overbought: 70.0,
            trigger: OscillatorTrigger::Level,
        };

        assert_eq!(edge.reading(&history).unwrap(), Reading::Long);
        assert_eq!(level.reading(&history).unwrap(), Reading::Long);

        // one more lower close: still oversold, no new edge
        closes.push(55.0);
        let history = candles(&closes);
        assert_eq!(edge.reading(&history).unwrap(), Reading::Flat);
        assert_eq!(level.reading(&history).unwrap(), Reading::Long);
    }

    #[test]
    fn oscillator_overbought_reads_short() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let signal = Signal::Oscillator {
            period: 5,
            oversold: 30.0,
            overbought: 70.0,
            trigger: OscillatorTrigger::Edge,
        };
        assert_eq!(signal.reading(&candles(&closes)).unwrap(), Reading::Short);
        assert!(!signal.evaluate(&candles(&closes)).unwrap());
    }

    #[test]
    fn convergence_divergence_cross() {
        let signal = Signal::ConvergenceDivergence {
            fast: 3,
            slow: 6,
            signal: 3,
        };

        // long decline keeps macd under its signal, a sharp rebound crosses it
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert!(!signal.evaluate(&candles(&closes)).unwrap());
        closes.push(100.0);
        assert!(signal.evaluate(&candles(&closes)).unwrap());
        // already above on the next step
        closes.push(110.0);
        assert!(!signal.evaluate(&candles(&closes)).unwrap());
    }

    #[test]
    fn band_breakout_both_sides() {
        let signal = Signal::BandBreakout {
            period: 10,
            std_dev: 2.0,
        };

        let mut spike = vec![10.0; 10];
        spike.push(30.0);
        let mut crash = vec![10.0; 10];
        crash.push(1.0);
        let inside = [10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.5];

        // upper band over the last 10 closes is 24
        assert!(signal.evaluate(&candles(&spike)).unwrap());
        // lower band is 3.7
        assert!(signal.evaluate(&candles(&crash)).unwrap());
        assert!(!signal.evaluate(&candles(&inside)).unwrap());
    }

    #[test]
    fn volume_anomaly() {
        let signal = Signal::VolumeAnomaly { multiplier: 2.5 };

        // mean of prior = 100, 251 > 250
        assert!(signal.evaluate(&with_volumes(&[100.0, 100.0, 100.0, 251.0])).unwrap());
        assert!(!signal.evaluate(&with_volumes(&[100.0, 100.0, 100.0, 250.0])).unwrap());
        assert!(!signal.evaluate(&with_volumes(&[100.0])).unwrap());
    }

    #[test]
    fn invalid_indicator_parameters() {
        let signal = Signal::TrendCrossover { window: 0 };
        let history = candles(&[1.0, 2.0, 3.0]);
        assert!(matches!(signal.reading(&history), Err(Error::Indicator(_))));
    }
}
