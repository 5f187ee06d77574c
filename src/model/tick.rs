use crate::error::AppError;

/// A single trade print as accepted into the tick buffer.
///
/// Only constructed through [`Tick::new`], so every value in the buffer has a
/// lowercase symbol, a positive finite price and a non-negative finite qty.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub qty: f64,
    pub timestamp_ms: u64,
}

impl Tick {
    pub fn new(symbol: &str, price: f64, qty: f64, timestamp_ms: u64) -> Result<Self, AppError> {
        let symbol = symbol.trim().to_ascii_lowercase();
        if symbol.is_empty() {
            return Err(AppError::MalformedTick("empty symbol".to_string()));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::MalformedTick(format!(
                "{}: price must be positive and finite, got {}",
                symbol, price
            )));
        }
        if !qty.is_finite() || qty < 0.0 {
            return Err(AppError::MalformedTick(format!(
                "{}: qty must be non-negative and finite, got {}",
                symbol, qty
            )));
        }
        Ok(Self {
            symbol,
            price,
            qty,
            timestamp_ms,
        })
    }
}
