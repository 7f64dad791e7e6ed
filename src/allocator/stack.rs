//! LIFO stack allocator
//!
//! Allocations advance a cursor like the linear arena, but each payload
//! is preceded by a small header recording the previous allocation's
//! address and the alignment adjustment. That header is what makes
//! partial release possible: `free` pops the most recent allocation,
//! rewinds the cursor past its adjustment, and restores the previous
//! allocation as the new top. Releasing in any other order is refused.
//!
//! ## Invariants
//!
//! - The cursor stays within `[start_addr, end_addr]` and only moves
//!   backward via `free`, and only by amounts previously advanced
//! - `top` is the payload address of the most recent live allocation
//!   (0 when the stack is empty); it always lies below the cursor
//! - Every payload has a header in the `adjustment` bytes before it
//! - A failed `allocate` or `free` leaves all state untouched
//!
//! # Memory Layout
//! ```text
//! [start]--[hdr|alloc1]--[hdr|alloc2]--[cursor]----[free]----[end]
//!                             ^top
//! ```

use core::alloc::Layout;
use core::cell::Cell;
use core::mem;
use core::ptr::NonNull;

use super::block::BackingBlock;
use super::stats::{AllocatorStats, StatisticsProvider};
use super::traits::{Allocator, MemoryUsage};
use crate::error::{AllocError, AllocResult};
use crate::utils::padding_with_header;

/// Configuration for the stack allocator
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Enable statistics tracking
    pub track_stats: bool,

    /// Byte written over freshly allocated payloads when set
    pub alloc_pattern: Option<u8>,

    /// Byte written over released spans when set
    pub dealloc_pattern: Option<u8>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) { Some(0xCC) } else { None },
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl StackConfig {
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

/// Per-allocation header stored immediately before each payload
///
/// `previous` is the payload address of the allocation below this one,
/// or 0 for the first allocation. `adjustment` is the full gap inserted
/// before the payload (alignment padding grown to fit this header), so
/// the cursor can be rewound to exactly where it was.
#[repr(C)]
#[derive(Clone, Copy)]
struct AllocationHeader {
    previous: usize,
    adjustment: usize,
}

const HEADER_SIZE: usize = mem::size_of::<AllocationHeader>();

/// LIFO allocator requiring release in exact reverse allocation order
pub struct StackAllocator {
    block: BackingBlock,
    config: StackConfig,

    /// Address of the first free byte
    cursor: Cell<usize>,

    /// Payload address of the most recent live allocation (0 when empty)
    top: Cell<usize>,

    used: Cell<usize>,
    live_allocations: Cell<usize>,
    total_allocs: Cell<usize>,
    total_deallocs: Cell<usize>,
    peak_usage: Cell<usize>,
    failed_allocations: Cell<usize>,
}

impl StackAllocator {
    /// Creates a stack allocator with a custom configuration
    pub fn with_config(capacity: usize, config: StackConfig) -> AllocResult<Self> {
        let block = BackingBlock::reserve(capacity)?;
        let cursor = Cell::new(block.start_addr());
        Ok(Self {
            block,
            config,
            cursor,
            top: Cell::new(0),
            used: Cell::new(0),
            live_allocations: Cell::new(0),
            total_allocs: Cell::new(0),
            total_deallocs: Cell::new(0),
            peak_usage: Cell::new(0),
            failed_allocations: Cell::new(0),
        })
    }

    /// Creates a stack allocator with the default configuration
    pub fn new(capacity: usize) -> AllocResult<Self> {
        Self::with_config(capacity, StackConfig::default())
    }

    /// Total capacity of the backing block
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Bytes consumed so far, including headers and alignment gaps
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
        self.live_allocations.get()
    }

    fn record_failure(&self) {
        if self.config.track_stats {
            self.failed_allocations.set(self.failed_allocations.get() + 1);
        }
    }

    /// Reads the header stored before `payload`
    ///
    /// # Safety
    /// `payload` must be the address of a live allocation from this
    /// allocator, so that the preceding `HEADER_SIZE` bytes hold a
    /// header this allocator wrote.
    unsafe fn read_header(&self, payload: usize) -> AllocationHeader {
        // The header address is only guaranteed to share the payload's
        // alignment, which may be smaller than the header's own, so the
        // read has to be unaligned.
        // SAFETY: header bytes are inside the block and were written by
        // allocate for this payload (caller contract).
        unsafe {
            self.block
                .ptr_at(payload - HEADER_SIZE)
                .cast::<AllocationHeader>()
                .read_unaligned()
        }
    }

    /// # Safety
    /// `payload - HEADER_SIZE` must be inside the reserved span for this
    /// allocation.
    unsafe fn write_header(&self, payload: usize, header: AllocationHeader) {
        // SAFETY: caller reserved [payload - adjustment, payload) with
        // adjustment >= HEADER_SIZE, so the header bytes are exclusive.
        unsafe {
            self.block
                .ptr_at(payload - HEADER_SIZE)
                .cast::<AllocationHeader>()
                .write_unaligned(header);
        }
    }
}

// SAFETY: allocate returns exclusive, aligned sub-ranges of the owned
// backing block; the cursor only moves past reserved spans, and free
// only rewinds over the span it verified to be the most recent
// allocation. No two live allocations overlap.
unsafe impl Allocator for StackAllocator {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            self.record_failure();
            return Err(AllocError::invalid_argument("size must be greater than zero"));
        }

        let cursor = self.cursor.get();
        let adjustment = padding_with_header(cursor, layout.align(), HEADER_SIZE);

        let new_cursor = cursor
            .checked_add(adjustment)
            .and_then(|payload| payload.checked_add(layout.size()));
        let Some(new_cursor) = new_cursor.filter(|&end| end <= self.block.end_addr()) else {
            self.record_failure();
            tracing::debug!(
                requested = layout.size(),
                align = layout.align(),
                available = self.available(),
                "stack allocation does not fit"
            );
            return Err(AllocError::out_of_space(
                layout.size(),
                layout.align(),
                self.available(),
            ));
        };

        let payload = cursor + adjustment;
        // SAFETY: [cursor, new_cursor) is inside the block (bounds
        // checked above) and adjustment >= HEADER_SIZE by construction.
        unsafe {
            self.write_header(
                payload,
                AllocationHeader {
                    previous: self.top.get(),
                    adjustment,
                },
            );
        }

        self.top.set(payload);
        self.cursor.set(new_cursor);
        self.used.set(self.used.get() + adjustment + layout.size());
        self.live_allocations.set(self.live_allocations.get() + 1);
        if self.config.track_stats {
            self.total_allocs.set(self.total_allocs.get() + 1);
            if self.used.get() > self.peak_usage.get() {
                self.peak_usage.set(self.used.get());
            }
        }

        // SAFETY: [payload, payload + size) was reserved above and is
        // exclusively ours.
        let ptr = unsafe { self.block.non_null_at(payload) };
        if let Some(pattern) = self.config.alloc_pattern {
            // SAFETY: same freshly reserved range.
            unsafe { core::ptr::write_bytes(ptr.as_ptr(), pattern, layout.size()) };
        }

        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn free(&self, ptr: NonNull<u8>) -> AllocResult<()> {
        let payload = ptr.as_ptr() as usize;
        if payload != self.top.get() {
            // The only legal transition is popping the most recent
            // frame.
            return Err(AllocError::OutOfOrder);
        }

        // SAFETY: payload is the most recent live allocation (verified
        // above), so its header is intact.
        let header = unsafe { self.read_header(payload) };
        let freed = (self.cursor.get() - payload) + header.adjustment;

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the span being popped belongs to this allocation
            // (header + payload) and is dead after this call.
            unsafe { self.block.fill(payload - header.adjustment, freed, pattern) };
        }

        self.cursor.set(payload - header.adjustment);
        self.top.set(header.previous);
        self.used.set(self.used.get() - freed);
        self.live_allocations.set(self.live_allocations.get() - 1);
        if self.config.track_stats {
            self.total_deallocs.set(self.total_deallocs.get() + 1);
        }
        Ok(())
    }
}

impl MemoryUsage for StackAllocator {
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

impl StatisticsProvider for StackAllocator {
    fn statistics(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.used(),
            peak_allocated_bytes: self.peak_usage.get().max(self.used()),
            allocation_count: if self.config.track_stats {
                self.total_allocs.get()
            } else {
                self.live_allocations.get()
            },
            deallocation_count: self.total_deallocs.get(),
            failed_allocations: self.failed_allocations.get(),
        }
    }
}

impl core::fmt::Debug for StackAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StackAllocator")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("allocations", &self.allocation_count())
            .finish()
    }
}
