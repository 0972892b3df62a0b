//! Binding native libraries and structs.
//!
//! Binding resolves everything up front: a [`LinkedLibrary`] exists only if
//! every symbol resolved and every signature mapped, and a [`StructType`]
//! exists only if its layout could be computed. Instances and calls can then
//! only fail on the values passed to them.
//!
//! ```no_run
//! use schism_ffi::binding::{Declarations, NativeLibrary};
//! use schism_ffi::call::Value;
//! use schism_ffi::platform::Platform;
//!
//! # fn main() -> schism_ffi::Result<()> {
//! let decls = Declarations::parse("abs: (int) -> int", &Platform::host())?;
//! let libc = NativeLibrary::open("")?;
//! // SAFETY: `abs` has the declared signature.
//! let linked = unsafe { libc.link_declarations(&decls)? };
//! assert_eq!(linked.invoke("abs", &[Value::I32(-3)])?, Some(Value::I32(3)));
//! # Ok(())
//! # }
//! ```

mod declarations;
mod error;
mod library;
mod structs;

pub use declarations::{Declarations, FunctionDecl};
pub use error::BindError;
pub use library::{LinkedLibrary, NativeLibrary};
pub use structs::{FieldAccessor, Struct, StructArray, StructType};
