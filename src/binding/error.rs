//! Error types for binding libraries and structs.

use thiserror::Error;

use crate::layout::{LayoutError, ManagedKind};

/// Errors raised while binding, before any instance or call exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("Could not load library {library}: {message}")]
    LibraryNotFound { library: String, message: String },

    #[error("Could not find {symbol} in library {library}")]
    SymbolNotFound { library: String, symbol: String },

    #[error("Struct {structure} has no field '{field}'")]
    UnknownField { structure: String, field: String },

    #[error("Field {structure}.{field} holds {expected}, not {requested}")]
    AccessorMismatch {
        structure: String,
        field: String,
        expected: ManagedKind,
        requested: ManagedKind,
    },

    #[error("No function named {0} is bound")]
    UnknownFunction(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl BindError {
    /// Returns true if a library or symbol could not be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BindError::LibraryNotFound { .. } | BindError::SymbolNotFound { .. }
        )
    }
}
