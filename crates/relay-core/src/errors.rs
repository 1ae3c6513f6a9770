/// Failure to hand a frame to a connection's send queue.
///
/// Both variants are expected races at the dispatch layer: the caller logs
/// them and moves on to the next recipient.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("connection closed")]
    Closed,
    #[error("send queue full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

impl WriteError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::QueueFull { .. } => "queue_full",
        }
    }
}

/// Unknown dispatch mode name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown dispatch mode {0:?} (expected \"broadcast\" or \"echo\")")]
pub struct ParseModeError(pub String);
