//! Alignment arithmetic shared by the arena and the pool.

/// Alignment used when a caller does not ask for one: two machine words.
pub const DEFAULT_ALIGNMENT: usize = 2 * std::mem::size_of::<usize>();

/// Returns true if `x` is a non-zero power of two.
#[inline]
#[must_use]
pub const fn is_power_of_two(x: usize) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

/// Rounds `value` up to the next multiple of `align`.
///
/// Returns `None` on overflow. `align` must be a power of two.
#[inline]
#[must_use]
pub const fn align_forward(value: usize, align: usize) -> Option<usize> {
    debug_assert!(is_power_of_two(align), "alignment must be a power of two");
    // Same as (value % align) because align is a power of two.
    let modulo = value & (align - 1);
    if modulo == 0 {
        Some(value)
    } else {
        value.checked_add(align - modulo)
    }
}

/// Number of padding bytes needed to move `addr` up to a multiple of `align`.
#[inline]
#[must_use]
pub const fn padding_for(addr: usize, align: usize) -> usize {
    match align_forward(addr, align) {
        Some(aligned) => aligned - addr,
        None => usize::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(16));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(24));
    }

    #[test]
    fn test_align_forward() {
        assert_eq!(align_forward(0, 16), Some(0));
        assert_eq!(align_forward(1, 16), Some(16));
        assert_eq!(align_forward(16, 16), Some(16));
        assert_eq!(align_forward(17, 8), Some(24));
        assert_eq!(align_forward(usize::MAX, 16), None);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding_for(10, 16), 6);
        assert_eq!(padding_for(32, 16), 0);
    }
}
