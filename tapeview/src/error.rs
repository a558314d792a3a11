use thiserror::Error;

/// Record-level errors generated while validating feed data.
///
/// Nothing here is fatal: a failed record is skipped individually and
/// its siblings in the same message are still processed. Transport
/// failures surface as [`ConnectionStatus`](crate::feed::ConnectionStatus)
/// changes and unparseable top-level payloads are dropped at the feed
/// boundary, so the worst outcome anywhere is a stale view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("record missing required field: {0}")]
    MissingField(&'static str),

    #[error("unparseable timestamp: {0}")]
    Timestamp(String),
}
