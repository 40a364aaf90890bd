//! Error taxonomy and the injectable error sink.

use thiserror::Error;

/// Failure of a caller-supplied clone operation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Error)]
#[error("allocation failed")]
pub struct AllocError;

/// Which logical mutation a failed rebalance followed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    /// An insert, followed by a grow.
    Insert,
    /// A removal, followed by a shrink.
    Remove,
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Operation::Insert => f.write_str("insert"),
            Operation::Remove => f.write_str("remove"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MapError {
    /// The bucket array or a cloned key/value could not be allocated.
    #[error("out of memory")]
    OutOfMemory,
    #[error("key not found")]
    NotFound,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// A bucket count too large to represent.
    #[error("bucket count overflow")]
    Overflow,
    /// The cursor has no further entries. Sticky once reached.
    #[error("end of map")]
    EndOfMap,
    /// A caller callback broke its contract (compare out of range, stringify failed).
    #[error("unknown error: {0}")]
    Unknown(&'static str),
    /// The logical mutation took effect; the follow-up resize did not.
    #[error("{op} applied but rebalance failed: {source}")]
    Rebalance {
        op: Operation,
        #[source]
        source: Box<MapError>,
    },
}

impl MapError {
    /// Taxonomy name used by sinks and log lines.
    pub fn code(&self) -> &'static str {
        match self {
            MapError::OutOfMemory => "OutOfMemory",
            MapError::NotFound => "NotFound",
            MapError::InvalidArgument(_) => "InvalidArgument",
            MapError::Overflow => "Overflow",
            MapError::EndOfMap => "EndOfMap",
            MapError::Unknown(_) => "Unknown",
            MapError::Rebalance { .. } => "Rebalance",
        }
    }

    /// True when the mutation itself succeeded and only capacity rebalancing failed.
    pub fn mutation_applied(&self) -> bool {
        matches!(self, MapError::Rebalance { .. })
    }
}

impl From<AllocError> for MapError {
    fn from(_: AllocError) -> Self {
        MapError::OutOfMemory
    }
}

/// Receives diagnostics for failures the table detects internally.
pub trait ErrorSink {
    fn report(&self, err: &MapError, message: &str);
}

/// Default sink: forwards to the `log` facade.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, err: &MapError, message: &str) {
        log::error!("[chain-map {}] {}: {}", err.code(), message, err);
    }
}
