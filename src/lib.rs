pub mod analytics;
pub mod binance;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod resample;
pub mod session;
pub mod store;
