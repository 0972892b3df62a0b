//! Native calls in both directions.
//!
//! A [`CallDescriptor`] fixes a function's native signature. A [`Downcall`]
//! invokes a native function with managed [`Value`]s; an [`UpcallHandler`]
//! exposes a Rust closure as a native function pointer. Integers narrower
//! than their managed form are sign- or zero-extended per the declared C
//! type, and widened values are narrowed back under a [`Narrowing`] policy.

mod descriptor;
mod downcall;
mod error;
pub mod marshal;
mod upcall;
mod value;

pub use descriptor::CallDescriptor;
pub use downcall::Downcall;
pub use error::{CallError, MarshalError};
pub use marshal::Narrowing;
pub use upcall::{Upcall, UpcallHandler};
pub use value::{CLong, CPtrDiffT, CSizeT, CULong, Managed, Value};
