//! Shared alignment arithmetic
//!
//! Pure helpers used by every allocation strategy. All take alignments
//! that are powers of two; this is checked with `debug_assert!` rather
//! than at runtime because the public entry points validate alignments
//! before any arithmetic runs.

/// Aligns a value up to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use strata_memory::utils::align_up;
///
/// assert_eq!(align_up(7, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
#[inline(always)]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Aligns a value down to the nearest multiple of alignment
///
/// # Examples
/// ```
/// use strata_memory::utils::align_down;
///
/// assert_eq!(align_down(7, 8), 0);
/// assert_eq!(align_down(9, 8), 8);
/// ```
#[inline(always)]
pub const fn align_down(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    value & !(alignment - 1)
}

/// Checks if a value is aligned to the given alignment
///
/// # Examples
/// ```
/// use strata_memory::utils::is_aligned;
///
/// assert!(is_aligned(16, 8));
/// assert!(!is_aligned(17, 8));
/// ```
#[inline(always)]
pub const fn is_aligned(value: usize, alignment: usize) -> bool {
    debug_assert!(alignment.is_power_of_two());
    value & (alignment - 1) == 0
}

/// Calculates the padding needed to align a value
///
/// # Examples
/// ```
/// use strata_memory::utils::padding_needed;
///
/// assert_eq!(padding_needed(7, 8), 1);
/// assert_eq!(padding_needed(8, 8), 0);
/// ```
#[inline(always)]
pub const fn padding_needed(value: usize, alignment: usize) -> usize {
    align_up(value, alignment) - value
}

/// Computes the smallest forward adjustment that places an aligned
/// `size`-byte region inside an available span
///
/// Returns `None` when no adjustment produces an aligned region with
/// `adjustment + size <= available`.
///
/// # Examples
/// ```
/// use strata_memory::utils::fit_within;
///
/// assert_eq!(fit_within(0x1001, 8, 8, 16), Some(7));
/// assert_eq!(fit_within(0x1000, 8, 8, 8), Some(0));
/// assert_eq!(fit_within(0x1001, 8, 16, 16), None);
/// ```
#[inline]
pub const fn fit_within(addr: usize, alignment: usize, size: usize, available: usize) -> Option<usize> {
    let adjustment = padding_needed(addr, alignment);
    // Overflow cannot happen for addresses inside an owned buffer, but
    // the arithmetic stays checked so the function is total.
    match adjustment.checked_add(size) {
        Some(needed) => {
            if needed <= available {
                Some(adjustment)
            } else {
                None
            }
        }
        None => None,
    }
}

/// Computes the adjustment for an address whose payload must be preceded
/// by a `header_size`-byte header
///
/// Starts from the natural alignment padding; if that gap is too small
/// to hold the header, grows it to the next alignment multiple that
/// fits. The result is always `>= header_size` and keeps
/// `addr + adjustment` aligned.
///
/// # Examples
/// ```
/// use strata_memory::utils::padding_with_header;
///
/// // Already aligned, but the header still needs room.
/// assert_eq!(padding_with_header(0x1000, 8, 16), 16);
/// // A 7-byte gap cannot hold a 16-byte header; grow by two multiples.
/// assert_eq!(padding_with_header(0x1001, 8, 16), 23);
/// ```
#[inline]
pub const fn padding_with_header(addr: usize, alignment: usize, header_size: usize) -> usize {
    let mut adjustment = padding_needed(addr, alignment);
    if adjustment < header_size {
        adjustment += align_up(header_size - adjustment, alignment);
    }
    adjustment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_reports_cannot_fit() {
        // Span too small even before alignment.
        assert_eq!(fit_within(0x1000, 8, 32, 16), None);
        // Alignment padding eats the span.
        assert_eq!(fit_within(0x1007, 16, 16, 20), None);
        // Exact fit after padding.
        assert_eq!(fit_within(0x1007, 16, 16, 25), Some(9));
    }

    #[test]
    fn header_padding_is_aligned_and_sufficient() {
        for align in [1usize, 2, 4, 8, 16, 64] {
            for addr in 0x2000..0x2040usize {
                let adjustment = padding_with_header(addr, align, 16);
                assert!(adjustment >= 16);
                assert!(is_aligned(addr + adjustment, align));
            }
        }
    }
}
