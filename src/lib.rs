//! Marshalling between Rust values and native C code.
//!
//! This library describes C data and C functions for a target platform,
//! lays out C structs, and calls native functions (downcalls) or exposes
//! Rust closures as native function pointers (upcalls) through libffi.
//!
//! # Quick Start
//!
//! ```no_run
//! use schism_ffi::prelude::*;
//!
//! # fn main() -> schism_ffi::Result<()> {
//! // Describe a struct and view native memory through it
//! let point = StructType::compile(
//!     &StructSchema::new("point")
//!         .field("x", NativeType::I32)
//!         .field("y", NativeType::I32),
//!     &Platform::host(),
//! )?;
//! let mut storage = point.allocate()?;
//! let instance = point.wrap(storage.memory_mut())?;
//! instance.set("x", &Value::I32(3))?;
//!
//! // Bind and call a C function
//! let libc = NativeLibrary::open("")?;
//! let labs = CallDescriptor::new(&[NativeType::CLong], Some(NativeType::CLong))?;
//! // SAFETY: `labs` takes and returns a C long.
//! let labs = unsafe { libc.bind("labs", labs)? };
//! assert_eq!(labs.invoke(&[Value::I64(-5)])?, Some(Value::I64(5)));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`platform`] - Pointer and `long` widths of the host or a chosen target
//! - [`memory`] - Bounds-checked memory views, addresses, codecs, allocators
//! - [`layout`] - C type mapping and struct layout
//! - [`call`] - Call descriptors, downcalls, upcalls, value marshalling
//! - [`binding`] - Library linking, declaration files, struct accessors
//! - [`config`] - Library configuration (TOML loading requires `config`)
//!
//! # Feature Flags
//!
//! - `config` - Load [`FfiConfig`] from TOML (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the command-line interface binary
//! - `full` - Enable all features

pub mod binding;
pub mod call;
pub mod config;
pub mod layout;
mod logging;
pub mod memory;
pub mod platform;
pub mod prelude;

mod error;

// Re-export the unified error type
pub use error::{Error, Result};

pub use binding::{
    BindError, Declarations, FieldAccessor, LinkedLibrary, NativeLibrary, Struct, StructArray,
    StructType,
};
pub use call::{CallDescriptor, CallError, Downcall, MarshalError, Narrowing, Upcall, UpcallHandler, Value};
pub use config::{ConfigError, FfiConfig};
pub use layout::{LayoutError, NativeType, StructLayout, StructSchema};
pub use memory::{Memory, MemoryError, NativeAddress, NativeAllocation};
pub use platform::Platform;
