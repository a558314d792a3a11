//! Session tuning knobs.

/// Configuration for a dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// OHLC bucket width in seconds.
    pub bucket_width_secs: u32,
    /// Minimum bucket count; shorter series are right-padded with blanks.
    pub min_buckets: usize,
    /// Hard cap on trades fed to the chart, taken from the history tail.
    pub trade_window: usize,
    /// Strictly more than this many windowed trades before the chart renders.
    pub min_chart_trades: usize,
    /// Per-symbol backing retention; oldest trades evicted beyond it (0 = unbounded).
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bucket_width_secs: 1,
            min_buckets: 20,
            trade_window: 400,
            min_chart_trades: 20,
            max_history: 10_000,
        }
    }
}

impl SessionConfig {
    /// Set OHLC bucket width in seconds.
    pub fn with_bucket_width_secs(mut self, secs: u32) -> Self {
        self.bucket_width_secs = secs;
        self
    }

    /// Set the minimum bucket count for chart padding.
    pub fn with_min_buckets(mut self, count: usize) -> Self {
        self.min_buckets = count;
        self
    }

    /// Set the render window cap.
    pub fn with_trade_window(mut self, count: usize) -> Self {
        self.trade_window = count;
        self
    }

    /// Set the chart-readiness threshold.
    pub fn with_min_chart_trades(mut self, count: usize) -> Self {
        self.min_chart_trades = count;
        self
    }

    /// Set the backing history retention cap.
    pub fn with_max_history(mut self, count: usize) -> Self {
        self.max_history = count;
        self
    }
}
