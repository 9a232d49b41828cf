use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use crate::engine::{Candle, CandleBuilder};
use crate::errors::Result;

// Either shape exchanges hand out:
//
// { "timestamp": 1759813200000, "open": 124499.99, "high": 124640.76,
//   "low": 124240.37, "close": 124414.17, "volume": 424.20697 }
//
// [1759813200000, 124499.99, 124640.76, 124240.37, 124414.17, 424.20697]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Data {
    Record {
        #[serde(alias = "open_time")]
        timestamp: i64,
        #[serde(alias = "open_price")]
        open: f64,
        #[serde(alias = "high_price")]
        high: f64,
        #[serde(alias = "low_price")]
        low: f64,
        #[serde(alias = "close_price")]
        close: f64,
        volume: f64,
    },
    Row(i64, f64, f64, f64, f64, f64),
}

impl TryFrom<Data> for Candle {
    type Error = crate::errors::Error;

    fn try_from(value: Data) -> Result<Self> {
        let (timestamp, open, high, low, close, volume) = match value {
            Data::Record {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            } => (timestamp, open, high, low, close, volume),
            Data::Row(timestamp, open, high, low, close, volume) => (timestamp, open, high, low, close, volume),
        };

        CandleBuilder::builder()
            .timestamp_millis(timestamp)
            .open(open)
            .high(high)
            .low(low)
            .close(close)
            .volume(volume)
            .build()
    }
}

/// Parses a JSON array of candles, records or `[ts, o, h, l, c, v]` rows.
pub fn parse_candles(json: &str) -> Result<Vec<Candle>> {
    let data: Vec<Data> = serde_json::from_str(json)?;
    data.into_iter().map(Candle::try_from).collect()
}

/// Reads candles from `filepath`, a JSON array of records or `[ts, o, h, l, c, v]` rows.
pub fn get_data_from_file(filepath: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let data: Vec<Data> = serde_json::from_reader(reader)?;
    data.into_iter().map(Candle::try_from).collect()
}
