//! Unified error type for the schism-ffi library.
//!
//! Each module has its own error enum; [`Error`] wraps all of them so
//! application code can use one type with `?` throughout.

use thiserror::Error;

use crate::binding::BindError;
use crate::call::{CallError, MarshalError};
use crate::config::ConfigError;
use crate::layout::LayoutError;
use crate::memory::MemoryError;

/// Unified error type for all schism-ffi operations.
///
/// # Example
///
/// ```no_run
/// use schism_ffi::binding::NativeLibrary;
/// use schism_ffi::call::{CallDescriptor, Value};
/// use schism_ffi::layout::NativeType;
///
/// fn absolute(value: i32) -> schism_ffi::Result<Option<Value>> {
///     let libc = NativeLibrary::open("")?;
///     let descriptor = CallDescriptor::new(&[NativeType::I32], Some(NativeType::I32))?;
///     // SAFETY: `abs` takes and returns a C int.
///     let abs = unsafe { libc.bind("abs", descriptor)? };
///     Ok(abs.invoke(&[Value::I32(value)])?)
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Memory access error (bounds, permission, alignment, allocation).
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Managed/native value conversion error.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Type mapping or struct layout error.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Library, symbol or struct binding error.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// Native call error.
    #[error(transparent)]
    Call(#[from] CallError),

    /// Configuration loading error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a memory error.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    /// Returns `true` if this is a marshalling error.
    pub fn is_marshal(&self) -> bool {
        matches!(self, Self::Marshal(_))
    }

    /// Returns `true` if this is a layout error.
    pub fn is_layout(&self) -> bool {
        matches!(self, Self::Layout(_))
    }

    /// Returns `true` if this is a binding error.
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind(_))
    }

    /// Returns `true` if this is a call error.
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if a library or symbol could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Bind(err) if err.is_not_found())
    }
}
