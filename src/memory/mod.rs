//! Memory model: bounded views, raw addresses, sequential codecs and
//! native allocators.
//!
//! [`Memory`] is the single abstraction every higher layer reads and writes
//! through. Heap views wrap Rust slices; native views wrap raw memory with a
//! start address. Both check permissions first and bounds second.
//!
//! # Example
//!
//! ```rust
//! use schism_ffi::memory::{Memory, MemoryError};
//!
//! let mut bytes = [0u8; 8];
//! let memory = Memory::from_mut_slice(&mut bytes);
//! memory.set_le(0, 0x1234u16)?;
//! assert_eq!(memory.get_le::<u16>(0)?, 0x1234);
//! assert!(memory.get::<u64>(1).is_err());
//! # Ok::<(), MemoryError>(())
//! ```

pub mod align;

mod address;
mod allocation;
mod array;
mod decoder;
mod encoder;
mod error;
mod scalar;
mod stack;
mod view;

pub use address::NativeAddress;
pub use allocation::NativeAllocation;
pub use array::ArrayView;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::MemoryError;
pub use scalar::{ByteOrder, Scalar};
pub use stack::{MemoryStack, StackFrame};
pub use view::Memory;
