use chrono::{DateTime, Utc};

use crate::errors::{Error, Result};

/// OHLCV summary of one fixed interval.
///
/// Candles are built through [`CandleBuilder`], which rejects non-finite or
/// negative fields and a high below the low. No ordering between open/close
/// and the range is assumed beyond that.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    #[cfg_attr(feature = "serde", serde(with = "chrono::serde::ts_milliseconds"))]
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Candle {
    /// Returns the opening time of the interval.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the timestamp as milliseconds since epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Builder for [`Candle`].
///
/// ### Example
/// ```rust
/// use bts_vote::prelude::*;
///
/// let candle = CandleBuilder::builder()
///     .timestamp_millis(1_700_000_000_000)
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(1.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(candle.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct CandleBuilder {
    timestamp: Option<DateTime<Utc>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CandleBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the opening time.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the opening time from milliseconds since epoch.
    ///
    /// Out-of-range values leave the timestamp unset, so `build` fails.
    pub fn timestamp_millis(mut self, millis: i64) -> Self {
        self.timestamp = DateTime::from_timestamp_millis(millis);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validates the fields and builds the candle.
    pub fn build(self) -> Result<Candle> {
        let timestamp = self
            .timestamp
            .ok_or_else(|| Error::InvalidCandle("missing or out-of-range timestamp".into()))?;
        let field = |name: &str, value: Option<f64>| -> Result<f64> {
            let value = value.ok_or_else(|| Error::InvalidCandle(format!("missing {name}")))?;
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidCandle(format!("{name} must be finite and non-negative (got: {value})")));
            }
            Ok(value)
        };

        let open = field("open", self.open)?;
        let high = field("high", self.high)?;
        let low = field("low", self.low)?;
        let close = field("close", self.close)?;
        let volume = field("volume", self.volume)?;

        if high < low {
            return Err(Error::InvalidCandle(format!("high {high} is below low {low}")));
        }

        Ok(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}
