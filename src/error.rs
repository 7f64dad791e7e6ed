//! Error types for allocation operations
//!
//! Every failure is surfaced immediately to the direct caller as a
//! distinguishable error value; nothing is retried or swallowed
//! internally. Retry, if desired, is caller policy.

use thiserror::Error;

/// Result type for allocation operations
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocation errors
///
/// Each allocator reports only the subset that applies to its strategy:
/// the linear arena never returns [`AllocError::OutOfOrder`], the stack
/// never returns [`AllocError::UnsupportedOperation`], and so on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Zero size, zero or non-power-of-two alignment, or a null address
    /// passed to `free`
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the request
        reason: &'static str,
    },

    /// The request cannot fit in the remaining contiguous capacity
    #[error("out of space: {requested} bytes (align {align}) requested, {available} available")]
    OutOfSpace {
        /// Payload bytes requested
        requested: usize,
        /// Requested alignment
        align: usize,
        /// Bytes still unused in the backing block
        available: usize,
    },

    /// No free block in the list, scanned in full, can satisfy the request
    #[error("out of memory: no free block fits {requested} bytes (align {align})")]
    OutOfMemory {
        /// Payload bytes requested
        requested: usize,
        /// Requested alignment
        align: usize,
    },

    /// Stack `free` called with an address other than the most recent
    /// live allocation
    #[error("out of order: stack allocations must be freed in reverse allocation order")]
    OutOfOrder,

    /// The strategy does not support this operation at all
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation {
        /// The operation that was attempted
        operation: &'static str,
    },

    /// The underlying system allocator could not reserve the backing
    /// block at construction time
    #[error("system allocation failure: could not reserve {capacity} bytes")]
    SystemAllocationFailure {
        /// Capacity that was requested for the backing block
        capacity: usize,
    },
}

impl AllocError {
    /// Creates an invalid-argument error
    pub fn invalid_argument(reason: &'static str) -> Self {
        Self::InvalidArgument { reason }
    }

    /// Creates an out-of-space error
    pub fn out_of_space(requested: usize, align: usize, available: usize) -> Self {
        Self::OutOfSpace {
            requested,
            align,
            available,
        }
    }

    /// Creates an out-of-memory error
    pub fn out_of_memory(requested: usize, align: usize) -> Self {
        Self::OutOfMemory { requested, align }
    }

    /// Creates an unsupported-operation error
    pub fn unsupported(operation: &'static str) -> Self {
        Self::UnsupportedOperation { operation }
    }

    /// Returns true for the two "does not fit" kinds
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::OutOfSpace { .. } | Self::OutOfMemory { .. })
    }

    /// Returns true if the failure was caused by a bad request rather
    /// than allocator state
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_request_details() {
        let err = AllocError::out_of_space(128, 16, 64);
        let msg = err.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("16"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn exhaustion_predicate() {
        assert!(AllocError::out_of_space(1, 1, 0).is_exhausted());
        assert!(AllocError::out_of_memory(1, 1).is_exhausted());
        assert!(!AllocError::OutOfOrder.is_exhausted());
        assert!(!AllocError::unsupported("free").is_exhausted());
    }
}
