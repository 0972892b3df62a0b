//! Error types for memory access.

use thiserror::Error;

use super::NativeAddress;

/// Errors raised by memory views, codecs and allocators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Access out of bounds: offset {offset} with width {width} exceeds memory size {size}")]
    OutOfBounds {
        offset: usize,
        width: usize,
        size: usize,
    },

    #[error("Memory is not readable")]
    NotReadable,

    #[error("Memory is not writable")]
    NotWritable,

    #[error("Address {address} is not aligned to {alignment} bytes")]
    Misaligned {
        address: NativeAddress,
        alignment: usize,
    },

    #[error("Memory size {actual} does not match required size {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid alignment {0}: must be a non-zero power of two")]
    InvalidAlignment(usize),

    #[error("Encoder overflow: cannot put {width} bytes at position {position} of {size}")]
    Overflow {
        position: usize,
        width: usize,
        size: usize,
    },

    #[error("Decoder underflow: cannot take {width} bytes at position {position} of {size}")]
    Underflow {
        position: usize,
        width: usize,
        size: usize,
    },

    #[error("Address arithmetic overflow: {address} by {delta}")]
    AddressOverflow { address: NativeAddress, delta: i128 },

    #[error("Native allocation of {size} bytes aligned to {alignment} failed")]
    AllocationFailed { size: usize, alignment: usize },

    #[error("Insufficient space in memory stack: {requested} bytes requested, {available} available")]
    StackExhausted { requested: usize, available: usize },

    #[error("Memory stack frame is not the innermost live frame")]
    InactiveFrame,
}

impl MemoryError {
    /// Returns true for bounds failures of any kind (view, encoder, decoder).
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            MemoryError::OutOfBounds { .. }
                | MemoryError::Overflow { .. }
                | MemoryError::Underflow { .. }
        )
    }

    /// Returns true if the access was refused by a permission flag.
    pub fn is_permission(&self) -> bool {
        matches!(self, MemoryError::NotReadable | MemoryError::NotWritable)
    }
}
