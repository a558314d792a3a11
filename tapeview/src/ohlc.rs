//! Fixed-width OHLC bucketing of an ordered trade history.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::types::Trade;

/// One aggregated candlestick bucket.
///
/// `time` is the trade timestamp quantized down to the bucket width.
/// A finished bucket never mutates once a later bucket begins, but the
/// current (last) bucket is recomputed whenever a new trade lands in
/// the same interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OhlcBucket {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Quantize a timestamp down to a `width_secs` boundary.
fn quantize(time: DateTime<Utc>, width_secs: u32) -> DateTime<Utc> {
    let width = i64::from(width_secs.max(1));
    let secs = time.timestamp();
    let bucket = secs - secs.rem_euclid(width);
    DateTime::from_timestamp(bucket, 0).unwrap_or(time)
}

/// Group an ordered trade sequence into fixed-width OHLC buckets.
///
/// Bucket order is first-appearance order of the quantized keys, which
/// matches chronological order as long as the feed delivers trades with
/// non-decreasing timestamps (assumed, not enforced). Per bucket:
/// open = first trade's price by arrival, close = last, high = max,
/// low = min.
///
/// When fewer than `min_buckets` real buckets exist, `None`
/// placeholders are appended after the real data so the chart keeps a
/// stable width; blank space pads the right edge, never the left.
/// Empty input yields all placeholders. Pure and deterministic for a
/// given input ordering.
pub fn aggregate<'a, I>(trades: I, width_secs: u32, min_buckets: usize) -> Vec<Option<OhlcBucket>>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut buckets: IndexMap<DateTime<Utc>, OhlcBucket> = IndexMap::new();

    for trade in trades {
        let key = quantize(trade.time, width_secs);
        buckets
            .entry(key)
            .and_modify(|bucket| {
                bucket.high = bucket.high.max(trade.price);
                bucket.low = bucket.low.min(trade.price);
                bucket.close = trade.price;
            })
            .or_insert(OhlcBucket {
                time: key,
                open: trade.price,
                high: trade.price,
                low: trade.price,
                close: trade.price,
            });
    }

    let mut series: Vec<Option<OhlcBucket>> = buckets.into_values().map(Some).collect();
    while series.len() < min_buckets {
        series.push(None);
    }
    series
}
