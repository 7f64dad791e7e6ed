//! Integration tests for the free-list allocator

use std::alloc::Layout;

use strata_memory::{AllocError, Allocator, FreeListAllocator, FreeListConfig, MemoryUsage};

#[test]
fn basic_allocate_then_free() {
    let allocator = FreeListAllocator::new(4096).expect("failed to create free-list allocator");

    unsafe {
        let layout = Layout::from_size_align(128, 8).unwrap();
        let ptr = allocator.allocate(layout).expect("allocation failed");

        std::ptr::write_bytes(ptr.cast::<u8>().as_ptr(), 0x55, 128);
        assert_eq!(*ptr.cast::<u8>().as_ptr(), 0x55);
        assert_eq!(*ptr.cast::<u8>().as_ptr().add(127), 0x55);

        allocator.free(ptr.cast()).expect("free failed");
    }

    assert_eq!(allocator.used(), 0);
    assert_eq!(allocator.allocation_count(), 0);
    assert_eq!(allocator.free_block_count(), 1);
    assert_eq!(allocator.largest_free_block(), allocator.capacity());
}

#[test]
fn release_in_arbitrary_order() {
    let allocator = FreeListAllocator::new(4096).expect("failed to create free-list allocator");

    unsafe {
        let layout = Layout::from_size_align(64, 8).unwrap();

        let ptr_a = allocator.allocate(layout).expect("allocation A failed");
        let ptr_b = allocator.allocate(layout).expect("allocation B failed");
        let ptr_c = allocator.allocate(layout).expect("allocation C failed");

        std::ptr::write_bytes(ptr_a.cast::<u8>().as_ptr(), 0xAA, 64);
        std::ptr::write_bytes(ptr_b.cast::<u8>().as_ptr(), 0xBB, 64);
        std::ptr::write_bytes(ptr_c.cast::<u8>().as_ptr(), 0xCC, 64);

        // Middle first, then the ends: no order constraint here.
        allocator.free(ptr_b.cast()).expect("free B failed");
        assert_eq!(*ptr_a.cast::<u8>().as_ptr(), 0xAA);
        assert_eq!(*ptr_c.cast::<u8>().as_ptr(), 0xCC);

        allocator.free(ptr_a.cast()).expect("free A failed");
        allocator.free(ptr_c.cast()).expect("free C failed");
    }

    assert_eq!(allocator.used(), 0);
}

#[test]
fn adjacent_spans_coalesce_back_to_one_block() {
    let allocator = FreeListAllocator::new(2048).expect("failed to create free-list allocator");

    unsafe {
        let layout = Layout::from_size_align(128, 8).unwrap();
        let ptrs: Vec<_> = (0..4)
            .map(|_| allocator.allocate(layout).expect("allocation failed"))
            .collect();

        // Free in a deliberately scrambled order; every release merges
        // with whichever neighbors are already free.
        allocator.free(ptrs[2].cast()).expect("free failed");
        allocator.free(ptrs[0].cast()).expect("free failed");
        allocator.free(ptrs[3].cast()).expect("free failed");
        allocator.free(ptrs[1].cast()).expect("free failed");
    }

    assert_eq!(allocator.free_block_count(), 1);
    assert_eq!(allocator.largest_free_block(), allocator.capacity());

    // The recovered block can serve a request spanning most of the
    // capacity, which fragmentation would have made impossible.
    unsafe {
        let big = Layout::from_size_align(allocator.capacity() - 64, 1).unwrap();
        let ptr = allocator.allocate(big).expect("post-coalesce allocation failed");
        allocator.free(ptr.cast()).expect("free failed");
    }
}

#[test]
fn first_fit_reuses_the_lowest_fitting_hole() {
    let allocator = FreeListAllocator::new(4096).expect("failed to create free-list allocator");

    unsafe {
        let small = Layout::from_size_align(32, 8).unwrap();
        let large = Layout::from_size_align(128, 8).unwrap();
        let snug = Layout::from_size_align(104, 8).unwrap();

        let ptr_a = allocator.allocate(small).expect("allocation A failed");
        let _ptr_b = allocator.allocate(small).expect("allocation B failed");
        let ptr_c = allocator.allocate(large).expect("allocation C failed");
        let _ptr_d = allocator.allocate(small).expect("allocation D failed");
        let ptr_e = allocator.allocate(snug).expect("allocation E failed");
        let _ptr_f = allocator.allocate(small).expect("allocation F failed");

        let addr_c = ptr_c.cast::<u8>().as_ptr() as usize;

        // Three holes low to high: too small, roomy, snug. A best-fit
        // policy would pick E's hole for the request below; first-fit
        // must stop at C's.
        allocator.free(ptr_a.cast()).expect("free A failed");
        allocator.free(ptr_c.cast()).expect("free C failed");
        allocator.free(ptr_e.cast()).expect("free E failed");
        assert_eq!(allocator.free_block_count(), 3);

        // 100 bytes skip A's hole and land in C's, the lowest that fits.
        let reused = allocator
            .allocate(Layout::from_size_align(100, 8).unwrap())
            .expect("reuse allocation failed");
        assert_eq!(reused.cast::<u8>().as_ptr() as usize, addr_c);
    }
}

#[test]
fn splitting_leaves_the_remainder_allocatable() {
    let allocator = FreeListAllocator::new(1024).expect("failed to create free-list allocator");

    unsafe {
        let layout = Layout::from_size_align(256, 8).unwrap();
        let first = allocator.allocate(layout).expect("allocation failed");

        // The initial block was split; the tail remains on the list.
        assert_eq!(allocator.free_block_count(), 1);
        assert!(allocator.largest_free_block() < allocator.capacity());

        let second = allocator.allocate(layout).expect("second allocation failed");
        assert_ne!(
            first.cast::<u8>().as_ptr() as usize,
            second.cast::<u8>().as_ptr() as usize
        );

        allocator.free(first.cast()).expect("free failed");
        allocator.free(second.cast()).expect("free failed");
    }

    assert_eq!(allocator.free_block_count(), 1);
}

#[test]
fn tiny_leftovers_are_absorbed_and_returned_on_free() {
    let allocator = FreeListAllocator::new(1024).expect("failed to create free-list allocator");

    unsafe {
        // Leave a hole whose tail after reuse would be too small to
        // hold a free-list node.
        let hole_layout = Layout::from_size_align(64, 8).unwrap();
        let hole = allocator.allocate(hole_layout).expect("allocation failed");
        let _pin = allocator
            .allocate(Layout::from_size_align(64, 8).unwrap())
            .expect("allocation failed");
        allocator.free(hole.cast()).expect("free failed");
        let free_before = allocator.total_free();

        // Nearly fills the hole; the sliver left over is absorbed into
        // this allocation rather than becoming an unusable list entry.
        let near_fit = allocator
            .allocate(Layout::from_size_align(56, 8).unwrap())
            .expect("near-fit allocation failed");
        let absorbed = free_before - allocator.total_free();
        assert!(absorbed > 56);

        // The absorbed sliver comes back when the allocation does.
        allocator.free(near_fit.cast()).expect("free failed");
        assert_eq!(allocator.total_free(), free_before);
    }
}

#[test]
fn exhaustion_reports_out_of_memory_and_changes_nothing() {
    let allocator = FreeListAllocator::with_config(256, FreeListConfig::production())
        .expect("failed to create free-list allocator");

    unsafe {
        let err = allocator
            .allocate(Layout::from_size_align(512, 1).unwrap())
            .unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory { .. }));
        assert_eq!(allocator.used(), 0);
        assert_eq!(allocator.free_block_count(), 1);

        let ptr = allocator
            .allocate(Layout::from_size_align(64, 1).unwrap())
            .expect("small allocation failed");
        allocator.free(ptr.cast()).expect("free failed");
    }
}

#[test]
fn fragmentation_can_refuse_a_request_that_fits_in_total() {
    let allocator = FreeListAllocator::new(256).expect("failed to create free-list allocator");

    unsafe {
        let layout = Layout::from_size_align(64, 1).unwrap();
        let ptr_a = allocator.allocate(layout).expect("allocation A failed");
        let _ptr_b = allocator.allocate(layout).expect("allocation B failed");
        allocator.free(ptr_a.cast()).expect("free A failed");

        // Total free exceeds 120 bytes, but no single hole holds it.
        assert!(allocator.total_free() > 120);
        let err = allocator
            .allocate(Layout::from_size_align(120, 1).unwrap())
            .unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory { .. }));
    }
}

#[test]
fn capacity_too_small_for_a_node_is_rejected() {
    let err = FreeListAllocator::new(8).unwrap_err();
    assert!(matches!(err, AllocError::InvalidArgument { .. }));
}

#[test]
fn allocations_are_aligned() {
    let allocator = FreeListAllocator::new(8192).expect("failed to create free-list allocator");

    unsafe {
        let mut ptrs = Vec::new();
        for align in [1usize, 2, 4, 8, 16, 32, 64, 128] {
            let layout = Layout::from_size_align(48, align).unwrap();
            let ptr = allocator.allocate(layout).expect("allocation failed");
            assert_eq!(ptr.cast::<u8>().as_ptr() as usize % align, 0);
            ptrs.push(ptr);
        }
        for ptr in ptrs {
            allocator.free(ptr.cast()).expect("free failed");
        }
    }

    assert_eq!(allocator.free_block_count(), 1);
}

#[test]
fn interleaved_stress_recovers_the_whole_block() {
    let allocator = FreeListAllocator::new(64 * 1024).expect("failed to create free-list allocator");

    unsafe {
        let mut live = Vec::new();
        for round in 0..50usize {
            let size = 16 + (round * 37) % 200;
            let layout = Layout::from_size_align(size, 8).unwrap();
            let ptr = allocator.allocate(layout).expect("allocation failed");
            std::ptr::write_bytes(ptr.cast::<u8>().as_ptr(), round as u8, size);
            live.push((ptr, size, round as u8));

            // Release from the middle every few rounds.
            if round % 3 == 2 {
                let (victim, _, _) = live.remove(live.len() / 2);
                allocator.free(victim.cast()).expect("free failed");
            }
        }

        // Survivors still hold their fill bytes.
        for &(ptr, size, tag) in &live {
            assert_eq!(*ptr.cast::<u8>().as_ptr(), tag);
            assert_eq!(*ptr.cast::<u8>().as_ptr().add(size - 1), tag);
        }

        for (ptr, _, _) in live {
            allocator.free(ptr.cast()).expect("free failed");
        }
    }

    assert_eq!(allocator.used(), 0);
    assert_eq!(allocator.free_block_count(), 1);
    assert_eq!(allocator.largest_free_block(), allocator.capacity());
}

#[test]
fn usage_accounting_stays_consistent() {
    let allocator = FreeListAllocator::new(2048).expect("failed to create free-list allocator");

    unsafe {
        let layout = Layout::from_size_align(100, 8).unwrap();
        let ptr = allocator.allocate(layout).expect("allocation failed");

        assert!(allocator.used_memory() > 100);
        assert_eq!(
            allocator.used_memory() + allocator.available_memory().unwrap(),
            allocator.total_memory().unwrap()
        );

        allocator.free(ptr.cast()).expect("free failed");
    }

    assert_eq!(allocator.used_memory(), 0);
    assert_eq!(allocator.available_memory(), Some(2048));
}
