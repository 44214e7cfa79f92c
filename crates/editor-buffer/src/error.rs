//! Error type for mutating operations.
//!
//! Read paths never fail: out-of-range reads return a default value instead. Only
//! mutations report errors, and a failed mutation leaves every structure unchanged.

use thiserror::Error;

/// Errors returned by mutating buffer, document and index operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
    /// The buffer is read-only.
    #[error("buffer is read-only")]
    ReadOnly,

    /// A modification was requested while another one was still being applied.
    #[error("modification already in progress")]
    Reentrant,

    /// An insertion position lies outside `[0, length]`.
    #[error("position {position} is outside the buffer (length {length})")]
    PositionOutOfRange {
        /// Requested position.
        position: usize,
        /// Buffer length at the time of the call.
        length: usize,
    },

    /// A deletion range extends past the end of the buffer.
    #[error("range {position}+{length} exceeds buffer length {buffer_length}")]
    RangeOutOfBounds {
        /// Start of the range.
        position: usize,
        /// Length of the range.
        length: usize,
        /// Buffer length at the time of the call.
        buffer_length: usize,
    },

    /// A partition index lies outside the partitioning.
    #[error("partition {index} is out of range ({partitions} partitions)")]
    PartitionOutOfRange {
        /// Requested partition.
        index: usize,
        /// Number of partitions at the time of the call.
        partitions: usize,
    },
}
