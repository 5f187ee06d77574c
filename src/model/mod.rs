pub mod candle;
pub mod tick;
