//! Error types shared across the crate.
//!
//! Queues and buffers never throw for ordinary flow control (a full queue or
//! an empty queue is a `bool`/`Option`, not an error); these types cover the
//! remaining failure modes across buffers, queues, the broadcast buffer, the
//! Snowflake generator, the agent runtime, and the mark file.

use thiserror::Error;

/// Failures from [`crate::buffer::AtomicBuffer`] construction and access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The requested `(offset, length)` view does not fit inside the backing region.
    #[error("index {index} with width {width} is out of range for a buffer of capacity {capacity}")]
    OutOfRange {
        /// Byte index requested.
        index: usize,
        /// Width in bytes of the access.
        width: usize,
        /// Capacity of the underlying region.
        capacity: usize,
    },
    /// An ordered/atomic/CAS access was attempted at an index not aligned to its width,
    /// while strict alignment checking is enabled.
    #[error("index {index} is not aligned to width {width}")]
    Misaligned {
        /// Byte index requested.
        index: usize,
        /// Width in bytes of the access.
        width: usize,
    },
    /// The `(offset, length)` pair passed to `wrap`/`new` violates the buffer invariant
    /// `offset + length <= capacity_of_underlying`.
    #[error("invalid region: offset {offset} + length {length} exceeds underlying capacity {capacity}")]
    InvalidRegion {
        /// Offset into the underlying region.
        offset: usize,
        /// Length of the requested view.
        length: usize,
        /// Capacity of the underlying region.
        capacity: usize,
    },
}

/// Failures from queue operations that are not ordinary full/empty flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `offer`/`add` was called with an invalid element count (e.g. zero-length batch
    /// where one or more elements were required).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// `add` was called (the "must succeed" variant of `offer`) but the queue was full.
    #[error("queue is full")]
    Full,
    /// `remove` was called (the "must succeed" variant of `poll`) but the queue was empty.
    #[error("queue is empty")]
    Empty,
    /// A collection-style operation (iterator, `to_vec`, `remove_all`, `retain_all`) was
    /// invoked; these are deliberately unsupported to avoid hidden allocation.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),
}

/// Failures raised while transmitting or receiving on a [`crate::broadcast`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// `recordSize` is not a multiple of 8, or is too small to hold the record header.
    #[error("record size {0} must be a multiple of 8 and at least 16 bytes")]
    InvalidRecordSize(usize),
    /// The capacity before the trailer is not a power-of-two multiple of `recordSize`.
    #[error("capacity {capacity} is not a power-of-two multiple of record size {record_size}")]
    InvalidCapacity {
        /// Requested capacity in bytes, excluding the trailer.
        capacity: usize,
        /// Configured record size in bytes.
        record_size: usize,
    },
    /// The payload passed to `transmit`/`claim` is larger than `recordSize - 16`.
    #[error("payload length {length} exceeds maximum {max} for record size {record_size}")]
    PayloadTooLarge {
        /// Length of the payload the caller attempted to send.
        length: usize,
        /// Maximum payload length for the configured record size.
        max: usize,
        /// Configured record size in bytes.
        record_size: usize,
    },
    /// `typeId` supplied by the caller was less than 1.
    #[error("type id {0} must be >= 1")]
    InvalidTypeId(i32),
    /// The underlying buffer rejected an access that record/trailer layout
    /// math had already validated; indicates a layout bug in this module.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Failures from [`crate::snowflake::SnowflakeIdGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnowflakeError {
    /// Constructor arguments violate the generator's bit-budget or range invariants.
    #[error("invalid snowflake configuration: {0}")]
    InvalidConfig(&'static str),
    /// The configured clock moved backwards relative to the last observed timestamp.
    #[error("clock went backwards: observed {now}ms, expected >= {last}ms")]
    ClockWentBackwards {
        /// The timestamp the clock returned.
        now: i64,
        /// The last timestamp `nextId` observed.
        last: i64,
    },
}

/// Failures from [`crate::markfile::MarkFile`].
#[derive(Debug, Error)]
pub enum MarkFileError {
    /// `versionOffset + 4 > timestampOffset`, violating the layout invariant.
    #[error("version offset {version_offset} + 4 must be <= timestamp offset {timestamp_offset}")]
    InvalidLayout {
        /// Configured offset of the version field.
        version_offset: usize,
        /// Configured offset of the timestamp field.
        timestamp_offset: usize,
    },
    /// The pre-existence policy was violated (file existed when `must_not_exist` was
    /// requested, or was missing when `must_exist` was requested).
    #[error("mark file existence policy violated: {0}")]
    ExistencePolicy(&'static str),
    /// Underlying file I/O or mapping failure.
    #[error("mark file I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The underlying buffer rejected an access that offset validation had
    /// already checked; indicates a layout bug in this module.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// The result of one `Agent::do_work` invocation.
#[derive(Debug)]
pub enum AgentError {
    /// The agent asked to end its duty cycle cleanly; not forwarded to `ErrorHandler`.
    Terminal,
    /// Any other error from `do_work`/`on_start`/`on_close`; forwarded to `ErrorHandler`
    /// and counted, but does not stop the loop (unless raised from `on_start`).
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Terminal => write!(f, "agent requested termination"),
            AgentError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Terminal => None,
            AgentError::Other(e) => Some(e.as_ref()),
        }
    }
}

impl AgentError {
    /// Wraps an arbitrary error as a non-terminal agent error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AgentError::Other(Box::new(err))
    }

    /// True if this is the termination signal rather than a reportable error.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentError::Terminal)
    }
}
