//! Allocator capability contract
//!
//! Calling code depends on these traits rather than a concrete strategy.
//! Consumers must treat `free` as potentially unsupported (the linear
//! arena) or order-constrained (the stack) and propagate the
//! corresponding failure rather than suppress it.
//!
//! # Safety
//!
//! `Allocator` is an unsafe trait: implementors guarantee that returned
//! pointers are valid, properly aligned, exclusive, and live until freed
//! or until the allocator itself is dropped. Callers guarantee they only
//! free pointers obtained from the same instance and never use a pointer
//! after freeing it; violating either is undefined behavior, not a
//! detected error.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// Common contract satisfied by every allocation strategy
///
/// The two operations mirror the classic allocator surface:
/// `allocate(size, alignment) -> address` and `free(address)`. Unlike
/// the standard library's allocator API, `free` is fallible so that
/// strategy-specific refusals ([`AllocError::UnsupportedOperation`],
/// [`AllocError::OutOfOrder`]) stay visible to the caller.
pub unsafe trait Allocator {
    /// Allocates memory for the given layout
    ///
    /// On success the returned span is at least `layout.size()` bytes,
    /// its address is a multiple of `layout.align()`, and the memory is
    /// uninitialized.
    ///
    /// # Safety
    /// - The returned pointer must not be used after it is freed or
    ///   after the allocator is dropped
    ///
    /// # Errors
    /// - [`AllocError::InvalidArgument`] for a zero-sized layout
    /// - [`AllocError::OutOfSpace`] / [`AllocError::OutOfMemory`] when
    ///   the request cannot be satisfied; allocator state is unchanged
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Releases a previous allocation
    ///
    /// # Safety
    /// - `ptr` must have been returned by `allocate` on this same
    ///   instance and not freed since
    /// - The caller must have destroyed any payload object living at
    ///   `ptr` first; `free` never runs destructors
    ///
    /// # Errors
    /// - [`AllocError::UnsupportedOperation`] if the strategy has no
    ///   individual release (linear arena)
    /// - [`AllocError::OutOfOrder`] if the strategy enforces release
    ///   order and `ptr` is not next (stack)
    unsafe fn free(&self, ptr: NonNull<u8>) -> AllocResult<()>;

    /// Allocates from raw `(size, alignment)` arguments
    ///
    /// Validates the arguments first: zero size, zero alignment, and
    /// non-power-of-two alignment are all
    /// [`AllocError::InvalidArgument`]. Valid arguments delegate to
    /// [`Allocator::allocate`].
    fn allocate_bytes(&self, size: usize, alignment: usize) -> AllocResult<NonNull<[u8]>> {
        if size == 0 {
            return Err(AllocError::invalid_argument("size must be greater than zero"));
        }
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(AllocError::invalid_argument(
                "alignment must be a non-zero power of two",
            ));
        }
        let layout = Layout::from_size_align(size, alignment)
            .map_err(|_| AllocError::invalid_argument("size overflows when padded to alignment"))?;
        // SAFETY: layout validated above; pointer lifetime obligations
        // are forwarded to the caller through the returned NonNull.
        unsafe { self.allocate(layout) }
    }

    /// Releases a previous allocation given as a raw pointer
    ///
    /// A null pointer is [`AllocError::InvalidArgument`]; everything
    /// else delegates to [`Allocator::free`].
    ///
    /// # Safety
    /// Same requirements as [`Allocator::free`] for non-null pointers.
    unsafe fn free_raw(&self, ptr: *mut u8) -> AllocResult<()> {
        let ptr = NonNull::new(ptr)
            .ok_or(AllocError::invalid_argument("cannot free a null address"))?;
        // SAFETY: forwarded caller contract.
        unsafe { self.free(ptr) }
    }
}

/// Memory usage tracking
///
/// Implemented by every strategy; backs the capacity invariant that
/// `used_memory` never exceeds the configured capacity.
pub trait MemoryUsage {
    /// Currently used memory in bytes, including alignment and header
    /// overhead
    fn used_memory(&self) -> usize;

    /// Available memory in bytes (if known)
    fn available_memory(&self) -> Option<usize>;

    /// Total capacity in bytes (if known)
    fn total_memory(&self) -> Option<usize> {
        self.available_memory()
            .map(|available| self.used_memory() + available)
    }

    /// Memory usage as a percentage (0.0 to 100.0)
    ///
    /// Returns `None` if total capacity is unknown.
    fn memory_usage_percent(&self) -> Option<f32> {
        self.total_memory().map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.used_memory() as f32 / total as f32) * 100.0
            }
        })
    }
}

/// Bulk reset to the initial empty state
///
/// Resetting invalidates every outstanding allocation at once.
pub trait Resettable {
    /// Resets the allocator to its initial state
    ///
    /// # Safety
    /// - All pointers allocated before the reset become dangling
    ///   immediately; the caller must ensure none are used afterwards
    unsafe fn reset(&self);
}

// ============================================================================
// Blanket implementations for references
// ============================================================================

// SAFETY: forwards every call to the underlying T, preserving its
// contract; no new unsafe operations are introduced.
unsafe impl<T: Allocator + ?Sized> Allocator for &T {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).allocate(layout) }
    }

    unsafe fn free(&self, ptr: NonNull<u8>) -> AllocResult<()> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).free(ptr) }
    }
}

impl<T: MemoryUsage + ?Sized> MemoryUsage for &T {
    fn used_memory(&self) -> usize {
        (**self).used_memory()
    }

    fn available_memory(&self) -> Option<usize> {
        (**self).available_memory()
    }

    fn total_memory(&self) -> Option<usize> {
        (**self).total_memory()
    }
}
