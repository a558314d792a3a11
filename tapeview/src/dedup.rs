//! Trade stream deduplication with bounded retention.

use std::collections::{HashSet, VecDeque};

use crate::types::{Trade, TradeKey};

/// Ordered, deduplicated, append-only trade history for one instrument.
///
/// The feed redelivers overlapping `recent_trades` windows on every
/// message, so each incoming record is checked against the set of
/// identity keys already observed. Survivors append after all existing
/// entries, keeping their relative incoming order; existing entries
/// never move and nothing is ever re-sorted.
///
/// Retention is a ring: beyond `max_len` the oldest trades are evicted
/// and their keys released. This assumes the server's redelivery window
/// is far smaller than the cap, so a released key cannot come back as a
/// duplicate in practice. `max_len` of zero means unbounded.
#[derive(Debug, Clone, Default)]
pub struct TradeHistory {
    trades: VecDeque<Trade>,
    seen: HashSet<TradeKey>,
    max_len: usize,
}

impl TradeHistory {
    /// Create a history retaining at most `max_len` trades (0 = unbounded).
    pub fn new(max_len: usize) -> Self {
        Self {
            trades: VecDeque::new(),
            seen: HashSet::new(),
            max_len,
        }
    }

    /// Merge an incoming batch, skipping records already seen.
    ///
    /// Returns how many trades were actually appended. O(incoming) per
    /// call; the key set makes the overall cost linear in
    /// existing + incoming, never quadratic.
    pub fn merge<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = Trade>,
    {
        let mut appended = 0;
        for trade in incoming {
            if self.seen.insert(trade.key()) {
                self.trades.push_back(trade);
                appended += 1;
            }
        }

        if self.max_len > 0 {
            while self.trades.len() > self.max_len {
                if let Some(evicted) = self.trades.pop_front() {
                    self.seen.remove(&evicted.key());
                }
            }
        }

        appended
    }

    /// Number of retained trades. Always equals the key set size.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Iterate retained trades in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    /// Last `n` trades by arrival order (the render window).
    ///
    /// A hard count cap, not a time window: bursty feeds can push older
    /// same-session trades out of the returned slice while they remain
    /// in the backing history.
    pub fn last_n(&self, n: usize) -> Vec<&Trade> {
        let start = self.trades.len().saturating_sub(n);
        self.trades.range(start..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_feed_time;
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn trade(symbol: &str, time: &str, price: &str) -> Trade {
        Trade {
            symbol: SmolStr::new(symbol),
            time: parse_feed_time(time).unwrap(),
            price: price.parse().unwrap(),
            quantity: dec!(1),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![
            trade("AAPL", "2024-05-01 10:00:00", "100"),
            trade("AAPL", "2024-05-01 10:00:01", "101"),
        ];

        let mut history = TradeHistory::new(0);
        assert_eq!(history.merge(batch.clone()), 2);
        assert_eq!(history.merge(batch), 0);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut history = TradeHistory::new(0);
        history.merge(vec![
            trade("AAPL", "2024-05-01 10:00:00", "100"),
            trade("AAPL", "2024-05-01 10:00:01", "101"),
        ]);
        // Overlapping redelivery plus two genuinely new trades
        history.merge(vec![
            trade("AAPL", "2024-05-01 10:00:01", "101"),
            trade("AAPL", "2024-05-01 10:00:02", "99"),
            trade("AAPL", "2024-05-01 10:00:03", "102"),
        ]);

        let prices: Vec<_> = history.iter().map(|t| t.price.to_string()).collect();
        assert_eq!(prices, vec!["100", "101", "99", "102"]);
    }

    #[test]
    fn test_duplicate_triple_leaves_length_unchanged() {
        let mut history = TradeHistory::new(0);
        history.merge(vec![trade("AAPL", "2024-05-01 10:00:00", "100")]);

        // Same (symbol, timestamp, price) but different quantity: dropped
        let mut dup = trade("AAPL", "2024-05-01 10:00:00", "100");
        dup.quantity = dec!(50);
        assert_eq!(history.merge(vec![dup]), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_retention_evicts_from_front_only() {
        let mut history = TradeHistory::new(3);
        for i in 0..5 {
            history.merge(vec![trade(
                "AAPL",
                &format!("2024-05-01 10:00:0{i}"),
                &format!("{}", 100 + i),
            )]);
        }

        assert_eq!(history.len(), 3);
        let prices: Vec<_> = history.iter().map(|t| t.price.to_string()).collect();
        assert_eq!(prices, vec!["102", "103", "104"]);
    }

    #[test]
    fn test_last_n_takes_tail_by_arrival_order() {
        let mut history = TradeHistory::new(0);
        for i in 0..500 {
            let minute = i / 60;
            let second = i % 60;
            history.merge(vec![trade(
                "AAPL",
                &format!("2024-05-01 10:{minute:02}:{second:02}"),
                &format!("{}", 100 + i),
            )]);
        }

        let window = history.last_n(400);
        assert_eq!(window.len(), 400);
        assert_eq!(window[0].price, dec!(200));
        assert_eq!(window[399].price, dec!(599));
        // Backing history still retains everything
        assert_eq!(history.len(), 500);
    }

    #[test]
    fn test_symbols_do_not_collide() {
        let mut history = TradeHistory::new(0);
        history.merge(vec![
            trade("AAPL", "2024-05-01 10:00:00", "100"),
            trade("MSFT", "2024-05-01 10:00:00", "100"),
        ]);
        assert_eq!(history.len(), 2);
    }
}
