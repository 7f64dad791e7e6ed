//! Fixed-capacity allocation strategies for latency-sensitive code
//!
//! This crate manages a single pre-reserved block of raw storage and
//! hands out sub-allocations from it, bypassing the general-purpose
//! allocator on the hot path. Callers choose an allocation *policy*
//! matched to their lifetime pattern:
//!
//! - [`LinearAllocator`]: bump-pointer arena with bulk-only reset
//! - [`StackAllocator`]: LIFO allocation with per-allocation rollback
//! - [`FreeListAllocator`]: general allocation/release in any order
//!
//! All three implement the [`Allocator`] capability contract, so code
//! can be written against the contract and handed whichever strategy
//! fits.
//!
//! # Example
//!
//! ```
//! use strata_memory::{Allocator, LinearAllocator, MemoryUsage};
//!
//! fn main() -> strata_memory::AllocResult<()> {
//!     let arena = LinearAllocator::new(4096)?;
//!
//!     let ptr = arena.allocate_bytes(128, 16)?;
//!     assert_eq!(ptr.cast::<u8>().as_ptr() as usize % 16, 0);
//!     assert!(arena.used_memory() >= 128);
//!
//!     // Arenas release everything at once.
//!     arena.clear();
//!     assert_eq!(arena.used_memory(), 0);
//!     Ok(())
//! }
//! ```
//!
//! # Threading
//!
//! Allocators are single-owner and `!Sync` by design: there is no
//! internal locking, and the type system rejects shared cross-thread
//! use. Wrap an allocator in an explicit mutual-exclusion boundary at
//! the call site if shared access is ever needed.
//!
//! # Caller obligations
//!
//! Dropping an allocator releases the whole backing block without
//! inspecting outstanding allocations; any pointers still held become
//! dangling. Destroy payload objects before freeing their memory and
//! before dropping the allocator. Freeing an address not obtained from
//! the same instance, double-freeing, or writing outside a returned
//! span is undefined behavior, not a detected error.

#![warn(missing_docs)]

pub mod allocator;
pub mod error;
pub mod utils;

pub use allocator::{
    Allocator, AllocatorStats, FreeListAllocator, FreeListConfig, LinearAllocator, LinearConfig,
    MemoryUsage, Resettable, StackAllocator, StackConfig, StatisticsProvider,
};
pub use error::{AllocError, AllocResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
