//! Core data types for the market-data feed.
//!
//! These types match the JSON message format produced by the simulator
//! server at ws://127.0.0.1:9001. Raw `*Record` types mirror the wire
//! shape with optional fields so a single malformed record can be
//! skipped without failing the whole message; the validated domain
//! types are what the rest of the pipeline operates on.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;

use crate::error::DataError;

/// Timestamp layout used by the feed, e.g. "2024-05-01 10:00:00".
const FEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Top-level feed message envelope.
///
/// Both fields are optional on the wire; absence means "empty list",
/// not an error. Every message carries an authoritative book list and
/// an overlapping window of recent trades.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedMessage {
    #[serde(default)]
    pub order_books: Vec<BookRecord>,
    #[serde(default)]
    pub recent_trades: Vec<TradeRecord>,
}

/// Raw trade record as delivered by the feed, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TradeRecord {
    #[serde(default)]
    pub symbol: Option<SmolStr>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub quantity: Option<Decimal>,
}

/// Raw price level as delivered by the feed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LevelRecord {
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub quantity: Option<Decimal>,
}

/// Raw order book snapshot as delivered by the feed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookRecord {
    #[serde(default)]
    pub symbol: Option<SmolStr>,
    #[serde(default)]
    pub bids: Vec<LevelRecord>,
    #[serde(default)]
    pub asks: Vec<LevelRecord>,
}

/// A single executed trade, validated and immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub symbol: SmolStr,
    pub time: DateTime<Utc>,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Trade {
    /// Dedup identity for this trade.
    pub fn key(&self) -> TradeKey {
        TradeKey {
            symbol: self.symbol.clone(),
            time: self.time,
            price: self.price,
        }
    }
}

/// Dedup identity of a trade: `(symbol, time, price)`.
///
/// Quantity is deliberately excluded to match the upstream feed
/// contract, so two distinct fills at the same symbol/second/price are
/// indistinguishable and the second is dropped. Known correctness gap,
/// kept rather than silently "fixed".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeKey {
    pub symbol: SmolStr,
    pub time: DateTime<Utc>,
    pub price: Decimal,
}

/// Price/quantity level within one side of a book.
///
/// Levels keep the order the feed delivered them in; they are never
/// re-sorted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Level {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Full depth snapshot for one instrument.
///
/// Each message's snapshot is authoritative and wholly replaces any
/// prior snapshot for the same symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBookSnapshot {
    pub symbol: SmolStr,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl TryFrom<TradeRecord> for Trade {
    type Error = DataError;

    fn try_from(record: TradeRecord) -> Result<Self, Self::Error> {
        let symbol = record
            .symbol
            .filter(|s| !s.is_empty())
            .ok_or(DataError::MissingField("symbol"))?;
        let raw_time = record
            .timestamp
            .ok_or(DataError::MissingField("timestamp"))?;
        let time = parse_feed_time(&raw_time)?;
        let price = record.price.ok_or(DataError::MissingField("price"))?;
        // Quantity is not part of the dedup identity and the feed may omit it
        let quantity = record.quantity.unwrap_or(Decimal::ZERO);

        Ok(Self {
            symbol,
            time,
            price,
            quantity,
        })
    }
}

impl LevelRecord {
    /// Validate into a [`Level`], or `None` if either field is unusable.
    pub fn into_level(self) -> Option<Level> {
        Some(Level {
            price: self.price?,
            quantity: self.quantity?,
        })
    }
}

impl TryFrom<BookRecord> for OrderBookSnapshot {
    type Error = DataError;

    fn try_from(record: BookRecord) -> Result<Self, Self::Error> {
        let symbol = record
            .symbol
            .filter(|s| !s.is_empty())
            .ok_or(DataError::MissingField("symbol"))?;

        // Unusable levels are dropped individually; the snapshot itself
        // survives with the remainder, still in feed order
        let bids = record
            .bids
            .into_iter()
            .filter_map(LevelRecord::into_level)
            .collect();
        let asks = record
            .asks
            .into_iter()
            .filter_map(LevelRecord::into_level)
            .collect();

        Ok(Self { symbol, bids, asks })
    }
}

/// Parse a feed timestamp into UTC.
///
/// The simulator emits `"%Y-%m-%d %H:%M:%S"`. An RFC3339-style `T`
/// separator and trailing fractional seconds are tolerated, with the
/// fraction truncated since the feed contract is second precision.
pub fn parse_feed_time(raw: &str) -> Result<DateTime<Utc>, DataError> {
    let trimmed = raw.trim();
    if trimmed.len() < 19 || !trimmed.is_ascii() {
        return Err(DataError::Timestamp(trimmed.to_string()));
    }

    let head = trimmed[..19].replace('T', " ");
    NaiveDateTime::parse_from_str(&head, FEED_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| DataError::Timestamp(trimmed.to_string()))
}

/// Accept prices/quantities as either JSON numbers or numeric strings.
///
/// Anything that fails to coerce becomes `None`, leaving the
/// record-level validation to reject (or default) the field instead of
/// failing the whole message.
fn de_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_decimal))
}

fn coerce_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_feed_time_formats() {
        struct TestCase {
            input: &'static str,
            expected: Option<&'static str>,
        }

        let tests = vec![
            TestCase {
                // TC0: canonical feed format
                input: "2024-05-01 10:00:00",
                expected: Some("2024-05-01 10:00:00"),
            },
            TestCase {
                // TC1: RFC3339-style separator
                input: "2024-05-01T10:00:00",
                expected: Some("2024-05-01 10:00:00"),
            },
            TestCase {
                // TC2: fractional seconds truncated
                input: "2024-05-01 10:00:00.123456",
                expected: Some("2024-05-01 10:00:00"),
            },
            TestCase {
                // TC3: surrounding whitespace tolerated
                input: "  2024-05-01 10:00:00  ",
                expected: Some("2024-05-01 10:00:00"),
            },
            TestCase {
                // TC4: too short
                input: "10:00:00",
                expected: None,
            },
            TestCase {
                // TC5: garbage
                input: "not a timestamp at all",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = parse_feed_time(test.input).ok();
            let expected = test
                .expected
                .map(|s| parse_feed_time(s).expect("expected time parses"));
            assert_eq!(actual, expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_trade_record_validation() {
        let record = TradeRecord {
            symbol: Some(SmolStr::new("AAPL")),
            timestamp: Some("2024-05-01 10:00:00".to_string()),
            price: Some(dec!(100.5)),
            quantity: Some(dec!(3)),
        };
        let trade = Trade::try_from(record).unwrap();
        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.price, dec!(100.5));
        assert_eq!(trade.quantity, dec!(3));
    }

    #[test]
    fn test_trade_record_missing_fields() {
        let missing_price = TradeRecord {
            symbol: Some(SmolStr::new("AAPL")),
            timestamp: Some("2024-05-01 10:00:00".to_string()),
            price: None,
            quantity: Some(dec!(1)),
        };
        assert_eq!(
            Trade::try_from(missing_price),
            Err(DataError::MissingField("price"))
        );

        let missing_symbol = TradeRecord {
            symbol: None,
            timestamp: Some("2024-05-01 10:00:00".to_string()),
            price: Some(dec!(1)),
            quantity: None,
        };
        assert_eq!(
            Trade::try_from(missing_symbol),
            Err(DataError::MissingField("symbol"))
        );

        // Quantity is optional: defaults to zero rather than erroring
        let missing_quantity = TradeRecord {
            symbol: Some(SmolStr::new("AAPL")),
            timestamp: Some("2024-05-01 10:00:00".to_string()),
            price: Some(dec!(1)),
            quantity: None,
        };
        assert_eq!(Trade::try_from(missing_quantity).unwrap().quantity, Decimal::ZERO);
    }

    #[test]
    fn test_decimal_coercion_string_or_number() {
        let msg: FeedMessage = serde_json::from_str(
            r#"{
                "recent_trades": [
                    {"symbol": "AAPL", "timestamp": "2024-05-01 10:00:00", "price": 100.5, "quantity": "2"},
                    {"symbol": "AAPL", "timestamp": "2024-05-01 10:00:01", "price": "99.75", "quantity": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(msg.recent_trades[0].price, Some(dec!(100.5)));
        assert_eq!(msg.recent_trades[0].quantity, Some(dec!(2)));
        assert_eq!(msg.recent_trades[1].price, Some(dec!(99.75)));
        assert_eq!(msg.recent_trades[1].quantity, Some(dec!(1)));
    }

    #[test]
    fn test_feed_message_missing_fields_default_empty() {
        let msg: FeedMessage = serde_json::from_str("{}").unwrap();
        assert!(msg.order_books.is_empty());
        assert!(msg.recent_trades.is_empty());
    }

    #[test]
    fn test_book_record_drops_unusable_levels() {
        let record: BookRecord = serde_json::from_str(
            r#"{
                "symbol": "AAPL",
                "bids": [
                    {"price": 100, "quantity": 5},
                    {"price": null, "quantity": 5},
                    {"price": "99.5", "quantity": "1"}
                ],
                "asks": []
            }"#,
        )
        .unwrap();

        let snapshot = OrderBookSnapshot::try_from(record).unwrap();
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0].price, dec!(100));
        assert_eq!(snapshot.bids[1].price, dec!(99.5));
        assert!(snapshot.asks.is_empty());
    }

    #[test]
    fn test_trade_key_ignores_quantity() {
        let base = Trade {
            symbol: SmolStr::new("AAPL"),
            time: parse_feed_time("2024-05-01 10:00:00").unwrap(),
            price: dec!(100),
            quantity: dec!(1),
        };
        let other = Trade {
            quantity: dec!(7),
            ..base.clone()
        };
        assert_eq!(base.key(), other.key());
    }
}
