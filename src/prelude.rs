//! Convenient re-exports for common usage patterns.
//!
//! # Example
//!
//! ```no_run
//! use schism_ffi::prelude::*;
//!
//! # fn main() -> schism_ffi::Result<()> {
//! let decls = Declarations::parse("strlen: (const char *) -> size_t", &Platform::host())?;
//! let libc = NativeLibrary::open("")?;
//! // SAFETY: matches the C declaration of strlen.
//! let _linked = unsafe { libc.link_declarations(&decls)? };
//! # Ok(())
//! # }
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// Module errors
pub use crate::binding::BindError;
pub use crate::call::{CallError, MarshalError};
pub use crate::config::ConfigError;
pub use crate::layout::LayoutError;
pub use crate::memory::MemoryError;

// Memory model
pub use crate::memory::{
    ArrayView, ByteOrder, Decoder, Encoder, Memory, MemoryStack, NativeAddress, NativeAllocation,
    Scalar, StackFrame,
};

// Platform and layout
pub use crate::layout::{AbiType, ManagedKind, NativeType, StructLayout, StructSchema};
pub use crate::platform::{Platform, Width};

// Calls
pub use crate::call::{
    CLong, CPtrDiffT, CSizeT, CULong, CallDescriptor, Downcall, Managed, Narrowing, Upcall,
    UpcallHandler, Value,
};

// Binding
pub use crate::binding::{
    Declarations, FieldAccessor, FunctionDecl, LinkedLibrary, NativeLibrary, Struct, StructArray,
    StructType,
};

// Configuration
pub use crate::config::FfiConfig;
