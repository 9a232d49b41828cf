/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the backtest engine and its collaborators.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The candle data provided is empty. Backtesting requires at least one candle.
    #[error("Candle data is empty: backtesting requires at least one candle")]
    CandleDataEmpty,

    /// A candle index was out of range.
    #[error("Candle not found")]
    CandleNotFound,

    /// A candle failed validation (non-finite or negative field, high below low).
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    /// Fewer candles than the largest warm-up window among the active signals.
    #[error("Insufficient data: {required} candles required, {available} available")]
    DataInsufficiency {
        /// Largest warm-up window of the active signals.
        required: usize,
        /// Candles supplied.
        available: usize,
    },

    /// Unsupported parameter combination, detected at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The account does not hold enough funds for the debit.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount requested.
        required: f64,
        /// Amount held.
        available: f64,
    },

    /// An amount that must be positive and finite was not.
    #[error("Amount must be positive and finite (got: {0})")]
    InvalidAmount(f64),

    /// Stop-loss and take-profit do not bracket the entry price.
    #[error("Position bounds violated: stop-loss {stop_loss} < entry {entry} < take-profit {take_profit} does not hold")]
    PositionBounds {
        /// Stop-loss price.
        stop_loss: f64,
        /// Entry price.
        entry: f64,
        /// Take-profit price.
        take_profit: f64,
    },

    /// The indicator library rejected its parameters.
    #[error("Indicator error: {0}")]
    Indicator(String),

    /// I/O error occurred.
    // utils.rs, config.rs
    #[cfg(feature = "serde")]
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration could not be parsed.
    #[cfg(feature = "serde")]
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}
