//! Allocation strategies over a fixed backing block
//!
//! Three strategies trade flexibility for throughput and fragmentation
//! control:
//!
//! - [`LinearAllocator`]: bump-pointer arena, bulk reset only
//! - [`StackAllocator`]: LIFO release in exact reverse order
//! - [`FreeListAllocator`]: arbitrary-order release with splitting and
//!   coalescing
//!
//! All three satisfy the [`Allocator`] capability contract, so calling
//! code can pick a policy without changing its allocation sites.

mod block;
mod stats;
mod traits;

pub mod freelist;
pub mod linear;
pub mod stack;

pub use block::BackingBlock;
pub use freelist::{FreeListAllocator, FreeListConfig};
pub use linear::{LinearAllocator, LinearConfig};
pub use stack::{StackAllocator, StackConfig};
pub use stats::{AllocatorStats, StatisticsProvider};
pub use traits::{Allocator, MemoryUsage, Resettable};

pub use crate::error::{AllocError, AllocResult};
