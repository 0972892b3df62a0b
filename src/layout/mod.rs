//! Type mapping and C struct layout.
//!
//! [`NativeType`] names a C type; resolving it against a
//! [`Platform`](crate::platform::Platform) yields an [`AbiType`] with a
//! concrete width, natural alignment, class and extension rule. A
//! [`StructSchema`] of such types lays out into a [`StructLayout`].

mod error;
mod structs;
mod types;

pub use error::LayoutError;
pub use structs::{FieldDecl, FieldLayout, StructLayout, StructSchema};
pub use types::{AbiClass, AbiType, Extension, ManagedKind, NativeType};
