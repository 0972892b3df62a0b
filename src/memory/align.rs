//! Alignment arithmetic shared by layouts and allocators.

use super::MemoryError;

/// Returns true if `alignment` is a non-zero power of two.
#[inline]
pub fn is_valid_alignment(alignment: usize) -> bool {
    alignment.is_power_of_two()
}

/// Validate an alignment, returning it unchanged.
#[inline]
pub fn check_alignment(alignment: usize) -> Result<usize, MemoryError> {
    if is_valid_alignment(alignment) {
        Ok(alignment)
    } else {
        Err(MemoryError::InvalidAlignment(alignment))
    }
}

/// Round `value` up to the next multiple of `alignment`.
///
/// Returns `None` on overflow. `alignment` must be a power of two.
#[inline]
pub fn align_forward(value: usize, alignment: usize) -> Option<usize> {
    let mask = alignment.checked_sub(1)?;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Round `value` down to a multiple of `alignment`.
#[inline]
pub fn align_backward(value: usize, alignment: usize) -> usize {
    value & !alignment.wrapping_sub(1)
}
