//! Error types for type mapping and struct layout.

use thiserror::Error;

use crate::platform::Platform;

/// Errors raised while mapping declared types to their ABI shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unknown native type: {0}")]
    UnknownType(String),

    #[error("void is not allowed as {0}")]
    VoidNotAllowed(String),

    #[error("Struct {structure}: fields '{first}' and '{second}' both claim index {index}")]
    FieldIndexCollision {
        structure: String,
        index: usize,
        first: String,
        second: String,
    },

    #[error("Struct {structure}: no field declared at index {index}")]
    MissingFieldIndex { structure: String, index: usize },

    #[error("Struct {structure}: duplicate field name '{field}'")]
    DuplicateField { structure: String, field: String },

    #[error("Struct {structure} was laid out for {expected}, not {actual}")]
    PlatformMismatch {
        structure: String,
        expected: Platform,
        actual: Platform,
    },

    #[error("Calls can only be described for the host platform, not {0}")]
    ForeignPlatform(Platform),

    #[error("Struct {0} has no fields and cannot be passed or embedded by value")]
    EmptyStruct(String),

    #[error("Struct {0} is too large to lay out")]
    SizeOverflow(String),
}
