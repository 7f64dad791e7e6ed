//! Free-list allocator
//!
//! General-purpose allocation and release in any order over a fixed
//! block. Free spans are tracked in a singly-linked list whose nodes
//! live inside the spans themselves: the first bytes of each free span
//! double as its `FreeBlock` node. The list is kept in ascending address
//! order so that merging adjacent spans on `free` is a local,
//! single-pass check.
//!
//! Allocation is first-fit with splitting; release coalesces with both
//! neighbors, which bounds fragmentation to the number of live
//! allocations instead of letting it grow without limit. The cost is
//! O(n) scans in the length of the free list.
//!
//! ## Invariants
//!
//! - Free-list nodes are ordered by strictly ascending address and
//!   never overlap
//! - No two consecutive nodes are physically adjacent (adjacency is
//!   merged eagerly on free)
//! - Every free span is at least `NODE_SIZE` bytes (smaller leftovers
//!   are absorbed into the allocation that produced them)
//! - Every payload has a header in the `adjustment` bytes before it
//!   recording the span to return on free
//! - A failed `allocate` or `free` leaves all state untouched

use core::alloc::Layout;
use core::cell::Cell;
use core::mem;
use core::ptr::NonNull;

use super::block::BackingBlock;
use super::stats::{AllocatorStats, StatisticsProvider};
use super::traits::{Allocator, MemoryUsage};
use crate::error::{AllocError, AllocResult};
use crate::utils::padding_with_header;

/// Configuration for the free-list allocator
#[derive(Debug, Clone)]
pub struct FreeListConfig {
    /// Enable statistics tracking
    pub track_stats: bool,

    /// Byte written over freshly allocated payloads when set
    pub alloc_pattern: Option<u8>,

    /// Byte written over released spans when set
    pub dealloc_pattern: Option<u8>,
}

impl Default for FreeListConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) { Some(0xCC) } else { None },
            dealloc_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl FreeListConfig {
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
/// `total_size` is everything this allocation consumed (payload plus
/// adjustment, plus any unusably small leftover it absorbed), so `free`
/// can reconstruct the exact span to give back.
#[repr(C)]
#[derive(Clone, Copy)]
struct AllocationHeader {
    total_size: usize,
    adjustment: usize,
}

/// Node describing one contiguous free span, stored in the span itself
///
/// `next` is the address of the next node in ascending order, or 0 at
/// the end of the list.
#[repr(C)]
#[derive(Clone, Copy)]
struct FreeBlock {
    size: usize,
    next: usize,
}

const HEADER_SIZE: usize = mem::size_of::<AllocationHeader>();
const NODE_SIZE: usize = mem::size_of::<FreeBlock>();

/// General allocator over a fixed block with splitting and coalescing
pub struct FreeListAllocator {
    block: BackingBlock,
    config: FreeListConfig,

    /// Address of the first (lowest) free block, 0 when exhausted
    head: Cell<usize>,

    used: Cell<usize>,
    live_allocations: Cell<usize>,
    total_allocs: Cell<usize>,
    total_deallocs: Cell<usize>,
    peak_usage: Cell<usize>,
    failed_allocations: Cell<usize>,
}

impl FreeListAllocator {
    /// Creates a free-list allocator with a custom configuration
    ///
    /// `capacity` must be large enough to hold at least one free-list
    /// node, since the node for the initial all-free span lives inside
    /// the block.
    pub fn with_config(capacity: usize, config: FreeListConfig) -> AllocResult<Self> {
        if capacity < NODE_SIZE {
            return Err(AllocError::invalid_argument(
                "capacity must hold at least one free-list node",
            ));
        }

        let block = BackingBlock::reserve(capacity)?;
        let allocator = Self {
            head: Cell::new(block.start_addr()),
            block,
            config,
            used: Cell::new(0),
            live_allocations: Cell::new(0),
            total_allocs: Cell::new(0),
            total_deallocs: Cell::new(0),
            peak_usage: Cell::new(0),
            failed_allocations: Cell::new(0),
        };

        // To start with, all the memory is one free block.
        // SAFETY: the block was just reserved and holds nothing yet.
        unsafe {
            allocator.write_node(
                allocator.block.start_addr(),
                FreeBlock {
                    size: capacity,
                    next: 0,
                },
            );
        }
        Ok(allocator)
    }

    /// Creates a free-list allocator with the default configuration
    pub fn new(capacity: usize) -> AllocResult<Self> {
        Self::with_config(capacity, FreeListConfig::default())
    }

    /// Total capacity of the backing block
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Bytes consumed so far, including headers, alignment gaps, and
    /// absorbed leftovers
    #[inline]
    pub fn used(&self) -> usize {
        self.used.get()
    }

    /// Bytes held by the free list
    #[inline]
    pub fn total_free(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Number of live allocations
    #[inline]
    pub fn allocation_count(&self) -> usize {
        self.live_allocations.get()
    }

    /// Number of blocks currently on the free list
    ///
    /// With eager coalescing this is bounded by the number of live
    /// allocations plus one.
    pub fn free_block_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.head.get();
        while cur != 0 {
            count += 1;
            // SAFETY: cur came from the free list, which only holds
            // valid node addresses.
            cur = unsafe { self.read_node(cur) }.next;
        }
        count
    }

    /// Size of the largest block on the free list
    pub fn largest_free_block(&self) -> usize {
        let mut largest = 0;
        let mut cur = self.head.get();
        while cur != 0 {
            // SAFETY: cur came from the free list.
            let node = unsafe { self.read_node(cur) };
            largest = largest.max(node.size);
            cur = node.next;
        }
        largest
    }

    fn record_failure(&self) {
        if self.config.track_stats {
            self.failed_allocations.set(self.failed_allocations.get() + 1);
        }
    }

    /// Reads the node stored at the start of a free span
    ///
    /// # Safety
    /// `addr` must be the address of a current free-list node.
    unsafe fn read_node(&self, addr: usize) -> FreeBlock {
        // Free spans start at arbitrary addresses, so node access is
        // unaligned.
        // SAFETY: free-list nodes always lie inside the block.
        unsafe { self.block.ptr_at(addr).cast::<FreeBlock>().read_unaligned() }
    }

    /// # Safety
    /// `[addr, addr + NODE_SIZE)` must lie inside the block and hold no
    /// live allocation.
    unsafe fn write_node(&self, addr: usize, node: FreeBlock) {
        debug_assert!(self.block.contains(addr, NODE_SIZE));
        // SAFETY: caller contract.
        unsafe {
            self.block
                .ptr_at(addr)
                .cast::<FreeBlock>()
                .write_unaligned(node);
        }
    }

    /// # Safety
    /// `payload` must be the address of a live allocation from this
    /// allocator.
    unsafe fn read_header(&self, payload: usize) -> AllocationHeader {
        // SAFETY: allocate wrote a header in the bytes before payload.
        unsafe {
            self.block
                .ptr_at(payload - HEADER_SIZE)
                .cast::<AllocationHeader>()
                .read_unaligned()
        }
    }

    /// # Safety
    /// `[payload - HEADER_SIZE, payload)` must be inside the span
    /// reserved for this allocation.
    unsafe fn write_header(&self, payload: usize, header: AllocationHeader) {
        // SAFETY: caller contract.
        unsafe {
            self.block
                .ptr_at(payload - HEADER_SIZE)
                .cast::<AllocationHeader>()
                .write_unaligned(header);
        }
    }

    /// Relinks the list so that `replacement` takes `removed`'s place
    ///
    /// `previous` is 0 when `removed` was the head; `replacement` is 0
    /// to unlink without a substitute.
    fn splice(&self, previous: usize, replacement: usize) {
        if previous == 0 {
            self.head.set(replacement);
        } else {
            // SAFETY: previous is a current free-list node.
            let mut node = unsafe { self.read_node(previous) };
            node.next = replacement;
            // SAFETY: rewriting an existing node in place.
            unsafe { self.write_node(previous, node) };
        }
    }
}

// SAFETY: allocate hands out spans carved from free-list blocks, which
// by the module invariants never overlap each other or live
// allocations; alignment comes from padding_with_header. free only
// returns spans recorded by allocate's own header.
unsafe impl Allocator for FreeListAllocator {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            self.record_failure();
            return Err(AllocError::invalid_argument("size must be greater than zero"));
        }

        // First-fit scan in ascending address order.
        let mut previous = 0usize;
        let mut current = self.head.get();
        while current != 0 {
            // SAFETY: current is a free-list node address.
            let node = unsafe { self.read_node(current) };

            let adjustment = padding_with_header(current, layout.align(), HEADER_SIZE);
            let Some(needed) = adjustment.checked_add(layout.size()) else {
                previous = current;
                current = node.next;
                continue;
            };
            if needed > node.size {
                // Does not fit; try the next block.
                previous = current;
                current = node.next;
                continue;
            }

            let total_size = if node.size - needed <= NODE_SIZE {
                // The leftover could never hold another allocation.
                // Take the whole block so the tail doesn't sit on the
                // list unusable; it comes back when this is freed.
                self.splice(previous, node.next);
                node.size
            } else {
                // Write the leftover tail back as a smaller block in
                // the consumed block's place.
                let remainder = current + needed;
                // SAFETY: [remainder, remainder + NODE_SIZE) is inside
                // this free span, past the bytes being handed out.
                unsafe {
                    self.write_node(
                        remainder,
                        FreeBlock {
                            size: node.size - needed,
                            next: node.next,
                        },
                    );
                }
                self.splice(previous, remainder);
                needed
            };

            let payload = current + adjustment;
            // SAFETY: the header bytes sit inside [current, payload),
            // which this allocation now owns.
            unsafe {
                self.write_header(
                    payload,
                    AllocationHeader {
                        total_size,
                        adjustment,
                    },
                );
            }

            self.used.set(self.used.get() + total_size);
            self.live_allocations.set(self.live_allocations.get() + 1);
            if self.config.track_stats {
                self.total_allocs.set(self.total_allocs.get() + 1);
                if self.used.get() > self.peak_usage.get() {
                    self.peak_usage.set(self.used.get());
                }
            }

            // SAFETY: [payload, payload + size) is owned by this
            // allocation.
            let ptr = unsafe { self.block.non_null_at(payload) };
            if let Some(pattern) = self.config.alloc_pattern {
                // SAFETY: same freshly reserved range.
                unsafe { core::ptr::write_bytes(ptr.as_ptr(), pattern, layout.size()) };
            }

            return Ok(NonNull::slice_from_raw_parts(ptr, layout.size()));
        }

        self.record_failure();
        tracing::debug!(
            requested = layout.size(),
            align = layout.align(),
            total_free = self.total_free(),
            "no free block fits the request"
        );
        Err(AllocError::out_of_memory(layout.size(), layout.align()))
    }

    unsafe fn free(&self, ptr: NonNull<u8>) -> AllocResult<()> {
        let payload = ptr.as_ptr() as usize;
        // SAFETY: caller contract says ptr came from this allocator's
        // allocate, so its header is intact.
        let header = unsafe { self.read_header(payload) };

        let span_start = payload - header.adjustment;
        let span_size = header.total_size;
        let span_end = span_start + span_size;
        debug_assert!(self.block.contains(span_start, span_size));

        if let Some(pattern) = self.config.dealloc_pattern {
            // SAFETY: the span belonged to this allocation and is dead
            // after this call.
            unsafe { self.block.fill(span_start, span_size, pattern) };
        }

        // Find the insertion point that keeps the list sorted by
        // address: the first free block at or past the freed span's
        // end, tracking the block just before it.
        let mut previous = 0usize;
        let mut current = self.head.get();
        while current != 0 && current < span_end {
            previous = current;
            // SAFETY: current is a free-list node address.
            current = unsafe { self.read_node(current) }.next;
        }

        // Insert or merge on the low side.
        let inserted = if previous == 0 {
            // Freed span is the lowest address; it becomes the head.
            // SAFETY: the span is dead memory owned by the allocator.
            unsafe {
                self.write_node(
                    span_start,
                    FreeBlock {
                        size: span_size,
                        next: current,
                    },
                );
            }
            self.head.set(span_start);
            span_start
        } else {
            // SAFETY: previous is a free-list node address.
            let mut prev_node = unsafe { self.read_node(previous) };
            if previous + prev_node.size == span_start {
                // Physically adjacent from below: grow the predecessor
                // instead of creating a node.
                prev_node.size += span_size;
                // SAFETY: rewriting an existing node in place.
                unsafe { self.write_node(previous, prev_node) };
                previous
            } else {
                // SAFETY: the span is dead memory owned by the
                // allocator.
                unsafe {
                    self.write_node(
                        span_start,
                        FreeBlock {
                            size: span_size,
                            next: prev_node.next,
                        },
                    );
                }
                prev_node.next = span_start;
                // SAFETY: rewriting an existing node in place.
                unsafe { self.write_node(previous, prev_node) };
                span_start
            }
        };

        // Merge forward if the following block starts exactly where the
        // inserted/merged span ends.
        // SAFETY: inserted is a free-list node address.
        let mut merged = unsafe { self.read_node(inserted) };
        let next = merged.next;
        if next != 0 && next == inserted + merged.size {
            // SAFETY: next is a free-list node address.
            let next_node = unsafe { self.read_node(next) };
            merged.size += next_node.size;
            merged.next = next_node.next;
            // SAFETY: rewriting an existing node in place.
            unsafe { self.write_node(inserted, merged) };
        }

        self.used.set(self.used.get() - span_size);
        self.live_allocations.set(self.live_allocations.get() - 1);
        if self.config.track_stats {
            self.total_deallocs.set(self.total_deallocs.get() + 1);
        }
        Ok(())
    }
}

impl MemoryUsage for FreeListAllocator {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.total_free())
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.capacity())
    }
}

impl StatisticsProvider for FreeListAllocator {
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

impl core::fmt::Debug for FreeListAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FreeListAllocator")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("allocations", &self.allocation_count())
            .field("free_blocks", &self.free_block_count())
            .finish()
    }
}
