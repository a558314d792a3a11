//! Latest-wins order book storage.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::types::OrderBookSnapshot;

/// Holds the most recent full snapshot per instrument.
///
/// Every feed message carries an authoritative book list, so
/// [`replace_all`](Self::replace_all) swaps the whole visible set:
/// symbols missing from the latest message disappear from
/// [`symbols`](Self::symbols) even though their trade histories live on
/// in the session. There are no partial updates and no merging.
#[derive(Debug, Clone, Default)]
pub struct OrderBookStore {
    books: HashMap<SmolStr, OrderBookSnapshot>,
    order: Vec<SmolStr>,
}

impl OrderBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire visible book list with this message's
    /// snapshots, in message order.
    pub fn replace_all(&mut self, snapshots: Vec<OrderBookSnapshot>) {
        self.books.clear();
        self.order.clear();
        for snapshot in snapshots {
            self.replace(snapshot);
        }
    }

    /// Store one snapshot, last write wins.
    pub fn replace(&mut self, snapshot: OrderBookSnapshot) {
        if !self.books.contains_key(&snapshot.symbol) {
            self.order.push(snapshot.symbol.clone());
        }
        self.books.insert(snapshot.symbol.clone(), snapshot);
    }

    /// `None` means "book not yet received", which callers must keep
    /// distinct from a received-but-empty book.
    pub fn get(&self, symbol: &str) -> Option<&OrderBookSnapshot> {
        self.books.get(symbol)
    }

    /// Visible symbols, in the order the latest message listed them.
    pub fn symbols(&self) -> &[SmolStr] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
