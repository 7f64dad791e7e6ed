//! Backing block shared by every allocation strategy
//!
//! One contiguous byte range of fixed capacity, owned exclusively by the
//! allocator instance that reserved it. The block is acquired at
//! construction and released when the allocator is dropped; no pointer
//! handed out by an allocator may outlive it.
//!
//! # Safety
//!
//! The buffer sits behind an `UnsafeCell` so allocators can hand out
//! mutable sub-ranges through `&self`. There is no internal
//! synchronization: the wrapper is deliberately `!Sync`, which makes
//! concurrent use a compile error instead of undefined behavior.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// Byte buffer with interior mutability
#[repr(transparent)]
struct BufferCell(UnsafeCell<[u8]>);

impl BufferCell {
    fn get(&self) -> *mut [u8] {
        self.0.get()
    }
}

/// Fixed-capacity backing storage for one allocator instance
///
/// Reserves `capacity` bytes from the system allocator at construction
/// and releases them on drop, without inspecting outstanding
/// allocations. Addresses are exposed as `usize` so the strategies can
/// do offset arithmetic the same way.
pub struct BackingBlock {
    memory: Box<BufferCell>,
    start_addr: usize,
    end_addr: usize,
    capacity: usize,
}

impl BackingBlock {
    /// Reserves a backing block of `capacity` bytes
    ///
    /// # Errors
    /// - [`AllocError::InvalidArgument`] when `capacity` is zero
    /// - [`AllocError::SystemAllocationFailure`] when the system
    ///   allocator cannot satisfy the reservation
    pub fn reserve(capacity: usize) -> AllocResult<Self> {
        if capacity == 0 {
            return Err(AllocError::invalid_argument("capacity must be greater than zero"));
        }

        let mut vec: Vec<u8> = Vec::new();
        vec.try_reserve_exact(capacity)
            .map_err(|_| AllocError::SystemAllocationFailure { capacity })?;
        vec.resize(capacity, 0);

        let boxed_slice = vec.into_boxed_slice();
        let len = boxed_slice.len();
        let ptr = Box::into_raw(boxed_slice).cast::<u8>();
        // SAFETY: Converting Box<[u8]> to Box<BufferCell>.
        // - BufferCell is repr(transparent) over UnsafeCell<[u8]>
        // - UnsafeCell<T> is repr(transparent) over T
        // - Box ownership transferred via into_raw/from_raw
        // - Length preserved from the original boxed slice
        let memory: Box<BufferCell> = unsafe {
            Box::from_raw(core::ptr::slice_from_raw_parts_mut(ptr, len) as *mut BufferCell)
        };

        // SAFETY: memory.get() points at the buffer just allocated above;
        // taking its element pointer for address arithmetic is valid.
        let start_addr = unsafe { (*memory.get()).as_ptr() as usize };
        let end_addr = start_addr + capacity;

        tracing::trace!(capacity, start_addr, "reserved backing block");

        Ok(Self {
            memory,
            start_addr,
            end_addr,
            capacity,
        })
    }

    /// Total capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Address of the first byte
    #[inline]
    pub fn start_addr(&self) -> usize {
        self.start_addr
    }

    /// One past the address of the last byte
    #[inline]
    pub fn end_addr(&self) -> usize {
        self.end_addr
    }

    /// Checks that `[addr, addr + len)` lies inside the block
    #[inline]
    pub fn contains(&self, addr: usize, len: usize) -> bool {
        addr >= self.start_addr && addr.checked_add(len).is_some_and(|end| end <= self.end_addr)
    }

    /// Returns a raw pointer to the byte at `addr`
    ///
    /// # Safety
    /// - `addr` must lie within `[start_addr, end_addr)`
    /// - The caller must not create overlapping mutable accesses; each
    ///   strategy guarantees this by only touching ranges it has
    ///   reserved through its own bookkeeping
    #[inline]
    pub unsafe fn ptr_at(&self, addr: usize) -> *mut u8 {
        debug_assert!(addr >= self.start_addr && addr < self.end_addr);
        let offset = addr - self.start_addr;
        // SAFETY: offset is within the buffer (debug-asserted above,
        // guaranteed by the caller contract); pointer derived from the
        // buffer keeps its provenance.
        unsafe { (*self.memory.get()).as_mut_ptr().add(offset) }
    }

    /// Returns a non-null pointer to the byte at `addr`
    ///
    /// # Safety
    /// Same requirements as [`BackingBlock::ptr_at`].
    #[inline]
    pub unsafe fn non_null_at(&self, addr: usize) -> NonNull<u8> {
        // SAFETY: the pointer derives from the owned boxed buffer, which
        // is never null; range requirements are the caller contract.
        unsafe { NonNull::new_unchecked(self.ptr_at(addr)) }
    }

    /// Fills `[addr, addr + len)` with a byte pattern
    ///
    /// # Safety
    /// Same range requirements as [`BackingBlock::ptr_at`], and the
    /// range must not hold live data the caller still needs.
    #[inline]
    pub unsafe fn fill(&self, addr: usize, len: usize, pattern: u8) {
        debug_assert!(self.contains(addr, len));
        // SAFETY: range is within the buffer per the caller contract.
        unsafe { core::ptr::write_bytes(self.ptr_at(addr), pattern, len) };
    }
}

impl core::fmt::Debug for BackingBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackingBlock")
            .field("start_addr", &format_args!("{:#x}", self.start_addr))
            .field("capacity", &self.capacity)
            .finish()
    }
}
