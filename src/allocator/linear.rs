//! Linear arena allocator
//!
//! Bump-pointer allocation over a fixed block: each allocation advances
//! a cursor past an aligned region, individual release is unsupported,
//! and `clear` returns the whole block at once. Zero per-allocation
//! bookkeeping makes this the right strategy for "allocate many, release
//! all at once" lifetimes such as one simulation frame.
//!
//! ## Invariants
//!
//! - The cursor stays within `[start_addr, end_addr]` and only moves
//!   backward via `clear`
//! - `used` equals `cursor - start_addr` and never exceeds capacity
//! - A failed allocation leaves the cursor and all counters untouched

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use super::block::BackingBlock;
use super::stats::{AllocatorStats, StatisticsProvider};
use super::traits::{Allocator, MemoryUsage, Resettable};
use crate::error::{AllocError, AllocResult};
use crate::utils::fit_within;

/// Configuration for the linear allocator
#[derive(Debug, Clone)]
pub struct LinearConfig {
    /// Enable statistics tracking
    pub track_stats: bool,

    /// Byte written over freshly allocated payloads when set
    pub alloc_pattern: Option<u8>,

    /// Byte written over released spans when set
    pub dealloc_pattern: Option<u8>,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) { Some(0xCC) } else { None },
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl LinearConfig {
    /// Production configuration - no tracking, no fills
    pub fn production() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
        }
    }

    /// Debug configuration - full tracking and fill patterns
    pub fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(0xCC),
            dealloc_pattern: Some(0xDD),
        }
    }
}

/// Bump-pointer allocator over a fixed backing block
///
/// # Memory Layout
/// ```text
/// [start]----[alloc1][alloc2][alloc3]----[cursor]----[free]----[end]
///             <------ allocated ------>   <----- available ----->
/// ```
///
/// `free` always fails with [`AllocError::UnsupportedOperation`]; use
/// [`LinearAllocator::clear`] to release everything at once.
pub struct LinearAllocator {
    block: BackingBlock,
    config: LinearConfig,

    /// Address of the first free byte
    cursor: Cell<usize>,

    used: Cell<usize>,
    allocations: Cell<usize>,
    total_allocs: Cell<usize>,
    peak_usage: Cell<usize>,
    failed_allocations: Cell<usize>,
}

impl LinearAllocator {
    /// Creates a linear allocator with a custom configuration
    pub fn with_config(capacity: usize, config: LinearConfig) -> AllocResult<Self> {
        let block = BackingBlock::reserve(capacity)?;
        let cursor = Cell::new(block.start_addr());
        Ok(Self {
            block,
            config,
            cursor,
            used: Cell::new(0),
            allocations: Cell::new(0),
            total_allocs: Cell::new(0),
            peak_usage: Cell::new(0),
            failed_allocations: Cell::new(0),
        })
    }

    /// Creates a linear allocator with the default configuration
    pub fn new(capacity: usize) -> AllocResult<Self> {
        Self::with_config(capacity, LinearConfig::default())
    }

    /// Total capacity of the backing block
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Bytes consumed so far, including alignment gaps
    #[inline]
    pub fn used(&self) -> usize {
        self.used.get()
    }

    /// Bytes still available
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Number of live allocations
    #[inline]
    pub fn allocation_count(&self) -> usize {
        self.allocations.get()
    }

    /// Resets the cursor to the start of the block
    ///
    /// Zeroes `used` and the allocation count. Memory contents are left
    /// as-is unless a `dealloc_pattern` is configured.
    ///
    /// # Safety note
    /// This is safe to call, but every previously returned pointer
    /// becomes logically stale: the next allocations will hand the same
    /// bytes out again. Callers must stop using old pointers first.
    pub fn clear(&self) {
        if let Some(pattern) = self.config.dealloc_pattern {
            let used = self.used.get();
            if used > 0 {
                // SAFETY: [start, start + used) was handed out by this
                // allocator and is being recycled wholesale.
                unsafe { self.block.fill(self.block.start_addr(), used, pattern) };
            }
        }

        self.cursor.set(self.block.start_addr());
        self.used.set(0);
        self.allocations.set(0);
        tracing::trace!(capacity = self.capacity(), "linear allocator cleared");
    }

    fn record_failure(&self) {
        if self.config.track_stats {
            self.failed_allocations.set(self.failed_allocations.get() + 1);
        }
    }
}

// SAFETY: allocate returns exclusive, aligned sub-ranges of the owned
// backing block; the cursor only moves forward between clears, so ranges
// never overlap. free refuses every pointer, so no release-order hazards
// exist.
unsafe impl Allocator for LinearAllocator {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            self.record_failure();
            return Err(AllocError::invalid_argument("size must be greater than zero"));
        }

        let cursor = self.cursor.get();
        let available = self.block.end_addr() - cursor;
        let Some(adjustment) = fit_within(cursor, layout.align(), layout.size(), available) else {
            self.record_failure();
            tracing::debug!(
                requested = layout.size(),
                align = layout.align(),
                available,
                "linear allocation does not fit"
            );
            return Err(AllocError::out_of_space(layout.size(), layout.align(), available));
        };

        let payload = cursor + adjustment;
        self.cursor.set(payload + layout.size());
        self.used.set(self.used.get() + adjustment + layout.size());
        self.allocations.set(self.allocations.get() + 1);
        if self.config.track_stats {
            self.total_allocs.set(self.total_allocs.get() + 1);
            if self.used.get() > self.peak_usage.get() {
                self.peak_usage.set(self.used.get());
            }
        }

        // SAFETY: [payload, payload + size) is inside the block (checked
        // by fit_within against the remaining span) and exclusively ours
        // now that the cursor has moved past it.
        let ptr = unsafe { self.block.non_null_at(payload) };
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: same freshly reserved range.
            unsafe { core::ptr::write_bytes(ptr.as_ptr(), pattern, layout.size()) };
        }

        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn free(&self, _ptr: NonNull<u8>) -> AllocResult<()> {
        // By contract this strategy only releases in bulk via clear().
        Err(AllocError::unsupported(
            "linear allocator frees the whole pool at once via clear()",
        ))
    }
}

impl MemoryUsage for LinearAllocator {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.available())
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.capacity())
    }
}

impl Resettable for LinearAllocator {
    unsafe fn reset(&self) {
        self.clear();
    }
}

impl StatisticsProvider for LinearAllocator {
    fn statistics(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.used(),
            peak_allocated_bytes: self.peak_usage.get().max(self.used()),
            allocation_count: if self.config.track_stats {
                self.total_allocs.get()
            } else {
                self.allocations.get()
            },
            deallocation_count: 0,
            failed_allocations: self.failed_allocations.get(),
        }
    }
}

impl core::fmt::Debug for LinearAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinearAllocator")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("allocations", &self.allocation_count())
            .finish()
    }
}
