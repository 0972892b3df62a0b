//! Error types for marshalling and native calls.

use thiserror::Error;

use crate::memory::MemoryError;

/// Errors converting between managed values and native bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Value {value} does not fit in {ty} ({width} bytes)")]
    OutOfRange {
        value: i128,
        ty: String,
        width: usize,
    },

    #[error("Unsupported native width: {0} bytes")]
    UnsupportedWidth(usize),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors raised while invoking a bound native function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("{function}: expected {expected} arguments, got {got}")]
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("{function}: argument {index}: {source}")]
    Argument {
        function: String,
        index: usize,
        source: MarshalError,
    },

    #[error("{function}: return value: {source}")]
    Return {
        function: String,
        source: MarshalError,
    },

    #[error("{function}: no scratch memory for the call: {source}")]
    Scratch {
        function: String,
        source: MemoryError,
    },
}
