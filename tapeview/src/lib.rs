//! Tapeview - streaming market-data dashboard core.
//!
//! Receives order-book snapshots and trade events over a persistent
//! WebSocket feed and maintains everything a render layer needs:
//! a deduplicated per-instrument trade history, fixed-width OHLC
//! candlestick buckets, the latest depth snapshot per symbol, and the
//! sticky symbol selection.
//!
//! The pipeline is a single-threaded reducer: each decoded message is
//! applied to a [`DashboardSession`] to completion, then the derived
//! [`RenderedView`] is recomputed. The feed transport lives in
//! [`feed`] and is the only async code in the crate.

pub mod book;
pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod ohlc;
pub mod session;
pub mod types;

// Re-export commonly used types for convenience
pub use book::OrderBookStore;
pub use config::SessionConfig;
pub use dedup::TradeHistory;
pub use error::DataError;
pub use feed::{default_feed_url, ConnectionStatus, FeedClient, FeedConfig};
pub use ohlc::{aggregate, OhlcBucket};
pub use session::{ApplyOutcome, DashboardSession, RenderedView};
pub use types::{
    parse_feed_time, BookRecord, FeedMessage, Level, LevelRecord, OrderBookSnapshot, Trade,
    TradeKey, TradeRecord,
};
