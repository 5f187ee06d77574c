use serde::Deserialize;

use crate::error::AppError;
use crate::model::tick::Tick;

/// Deserialize Binance numbers that may arrive either string-encoded or as
/// plain JSON numbers.
pub fn string_or_number_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::String(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("invalid number")),
        _ => Err(serde::de::Error::custom("invalid numeric value")),
    }
}

/// Binance futures trade stream event (`<symbol>@trade`).
///
/// Only the fields the tick buffer needs are required; everything else in
/// the payload is ignored.
#[derive(Debug, Deserialize)]
pub struct BinanceTradeEvent {
    #[serde(rename = "e", default)]
    pub event_type: Option<String>,
    #[serde(rename = "T")]
    pub trade_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p", deserialize_with = "string_or_number_to_f64")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "string_or_number_to_f64")]
    pub qty: f64,
}

/// Combined-stream envelope: `{"stream": "btcusdt@trade", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct CombinedStreamEnvelope {
    #[serde(default)]
    pub stream: Option<String>,
    pub data: BinanceTradeEvent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TradeMessage {
    Wrapped(CombinedStreamEnvelope),
    Bare(BinanceTradeEvent),
}

impl TryFrom<BinanceTradeEvent> for Tick {
    type Error = AppError;

    fn try_from(event: BinanceTradeEvent) -> Result<Self, Self::Error> {
        Tick::new(&event.symbol, event.price, event.qty, event.trade_time)
    }
}

/// Parse one raw WebSocket text frame into a validated [`Tick`].
///
/// Accepts a bare trade object or one combined-stream envelope around it.
pub fn parse_trade_message(text: &str) -> Result<Tick, AppError> {
    let event = match serde_json::from_str::<TradeMessage>(text) {
        Ok(TradeMessage::Wrapped(envelope)) => envelope.data,
        Ok(TradeMessage::Bare(event)) => event,
        Err(e) => return Err(AppError::MalformedTick(e.to_string())),
    };
    Tick::try_from(event)
}
