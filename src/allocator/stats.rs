//! Allocator statistics tracking

/// Point-in-time statistics for an allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Bytes currently allocated, including alignment/header overhead
    pub allocated_bytes: usize,
    /// Highest value `allocated_bytes` has reached
    pub peak_allocated_bytes: usize,
    /// Successful allocations over the allocator's lifetime
    pub allocation_count: usize,
    /// Successful frees over the allocator's lifetime
    pub deallocation_count: usize,
    /// Allocation attempts that returned an error
    pub failed_allocations: usize,
}

impl AllocatorStats {
    /// Creates an empty stats object
    pub const fn new() -> Self {
        Self {
            allocated_bytes: 0,
            peak_allocated_bytes: 0,
            allocation_count: 0,
            deallocation_count: 0,
            failed_allocations: 0,
        }
    }

    /// Allocations that have not been freed yet
    pub fn live_allocations(&self) -> usize {
        self.allocation_count - self.deallocation_count
    }

    /// Share of allocation attempts that succeeded (0.0 to 1.0)
    pub fn allocation_efficiency(&self) -> f64 {
        let attempts = self.allocation_count + self.failed_allocations;
        if attempts == 0 {
            1.0
        } else {
            self.allocation_count as f64 / attempts as f64
        }
    }
}

impl core::fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Allocator Statistics:")?;
        writeln!(f, "  Current allocated: {} bytes", self.allocated_bytes)?;
        writeln!(f, "  Peak allocated: {} bytes", self.peak_allocated_bytes)?;
        writeln!(f, "  Allocations: {}", self.allocation_count)?;
        writeln!(f, "  Deallocations: {}", self.deallocation_count)?;
        write!(f, "  Failed allocations: {}", self.failed_allocations)
    }
}

/// Implemented by allocators that can report statistics
pub trait StatisticsProvider {
    /// Returns a snapshot of the current statistics
    fn statistics(&self) -> AllocatorStats;
}
