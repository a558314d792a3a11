//! Session state reducer: one feed message in, derived view out.

use std::collections::HashMap;

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::book::OrderBookStore;
use crate::config::SessionConfig;
use crate::dedup::TradeHistory;
use crate::ohlc::{aggregate, OhlcBucket};
use crate::types::{FeedMessage, OrderBookSnapshot, Trade};

/// Counters describing how one feed message was absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Trades appended to a history.
    pub trades_merged: usize,
    /// Trades discarded as redeliveries.
    pub trades_deduped: usize,
    /// Malformed records skipped (trades and books).
    pub records_skipped: usize,
    /// Book snapshots in the replaced visible list.
    pub books_replaced: usize,
}

/// Derived view handed to the render layer.
///
/// `buckets` is empty whenever `chart_ready` is false: the caller shows
/// a "waiting for data" placeholder instead of a chart. Placeholder
/// entries inside a ready series are `None`, padding the right edge up
/// to the configured minimum bucket count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub symbols: Vec<SmolStr>,
    pub selected: Option<SmolStr>,
    pub book: Option<OrderBookSnapshot>,
    pub chart_ready: bool,
    pub buckets: Vec<Option<OhlcBucket>>,
}

/// Explicit session state: selection, book store, per-symbol histories.
///
/// One inbound message is processed to completion before the next, so
/// there is no locking anywhere in the core. `apply` is synchronous and
/// transport-independent, which keeps the whole pipeline testable
/// without a socket. A channel drop simply means no further calls to
/// `apply`; all derived state stays at its last-known-good value.
#[derive(Debug, Clone, Default)]
pub struct DashboardSession {
    config: SessionConfig,
    books: OrderBookStore,
    histories: HashMap<SmolStr, TradeHistory>,
    selected: Option<SmolStr>,
}

impl DashboardSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            books: OrderBookStore::new(),
            histories: HashMap::new(),
            selected: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Absorb one feed message: replace the visible book list, merge
    /// new trades into per-symbol histories, and adopt a default
    /// selection the first time any book appears.
    ///
    /// Malformed records are skipped individually; their siblings in
    /// the same message still land.
    pub fn apply(&mut self, message: FeedMessage) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        let mut snapshots = Vec::with_capacity(message.order_books.len());
        for record in message.order_books {
            match OrderBookSnapshot::try_from(record) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => {
                    outcome.records_skipped += 1;
                    warn!("skipping malformed order book record: {}", err);
                }
            }
        }
        outcome.books_replaced = snapshots.len();
        self.books.replace_all(snapshots);

        for record in message.recent_trades {
            match Trade::try_from(record) {
                Ok(trade) => {
                    let history = self
                        .histories
                        .entry(trade.symbol.clone())
                        .or_insert_with(|| TradeHistory::new(self.config.max_history));
                    if history.merge([trade]) == 1 {
                        outcome.trades_merged += 1;
                    } else {
                        outcome.trades_deduped += 1;
                    }
                }
                Err(err) => {
                    outcome.records_skipped += 1;
                    warn!("skipping malformed trade record: {}", err);
                }
            }
        }

        // Default selection: first symbol of the latest book list,
        // adopted exactly once per session
        if self.selected.is_none() {
            if let Some(first) = self.books.symbols().first() {
                debug!("adopting default selection {}", first);
                self.selected = Some(first.clone());
            }
        }

        outcome
    }

    /// Pin the view to `symbol`. Sticky: later messages never override
    /// it, even when the symbol drops out of the visible book list.
    pub fn select(&mut self, symbol: impl Into<SmolStr>) {
        self.selected = Some(symbol.into());
    }

    /// Clear the selection so the next message's first symbol is adopted.
    pub fn reset_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Render window for the selected symbol: the last `trade_window`
    /// trades by arrival order.
    pub fn windowed_trades(&self) -> Vec<&Trade> {
        self.selected
            .as_deref()
            .and_then(|symbol| self.histories.get(symbol))
            .map(|history| history.last_n(self.config.trade_window))
            .unwrap_or_default()
    }

    /// Total retained history length for a symbol, window cap aside.
    pub fn history_len(&self, symbol: &str) -> usize {
        self.histories.get(symbol).map_or(0, TradeHistory::len)
    }

    /// Recompute the derived view for the current selection.
    pub fn view(&self) -> RenderedView {
        let symbols = self.books.symbols().to_vec();
        let selected = self.selected.clone();

        let book = selected
            .as_deref()
            .and_then(|symbol| self.books.get(symbol))
            .cloned();

        let windowed = self.windowed_trades();
        let chart_ready = windowed.len() > self.config.min_chart_trades;
        let buckets = if chart_ready {
            aggregate(
                windowed.iter().copied(),
                self.config.bucket_width_secs,
                self.config.min_buckets,
            )
        } else {
            Vec::new()
        };

        RenderedView {
            symbols,
            selected,
            book,
            chart_ready,
            buckets,
        }
    }
}
