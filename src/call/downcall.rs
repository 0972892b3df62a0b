//! Downcalls: invoking native functions with managed arguments.

use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

use libffi::middle::{Cif, CodePtr};
use libffi::raw;
use libloading::Library;

use super::marshal::lower;
use super::{CallDescriptor, CallError, Value};
use crate::layout::LayoutError;
use crate::logging::trace;
use crate::memory::{MemoryStack, NativeAddress, StackFrame};

/// Minimum size and alignment of an argument slot.
const SLOT: usize = 8;

/// Alignment of the return buffer.
const RETURN_ALIGNMENT: usize = 16;

/// A callable native function.
///
/// Arguments are lowered into scratch memory from the calling thread's
/// [`MemoryStack`], passed through libffi, and the return value is lifted
/// with the descriptor's extension rules.
pub struct Downcall {
    name: String,
    address: NativeAddress,
    descriptor: CallDescriptor,
    cif: Cif,
    _library: Option<Arc<Library>>,
}

// SAFETY: the CIF is prepared once and only read by `ffi_call`, which libffi
// allows from any number of threads at once. The library handle is shared
// through an `Arc` and is itself `Send + Sync`.
unsafe impl Send for Downcall {}
// SAFETY: see above.
unsafe impl Sync for Downcall {}

impl Downcall {
    /// Wrap a native function pointer.
    ///
    /// # Safety
    ///
    /// `address` must be a function whose C signature matches `descriptor`
    /// and that stays valid for the life of the returned value.
    pub unsafe fn from_address(
        name: impl Into<String>,
        address: NativeAddress,
        descriptor: CallDescriptor,
    ) -> Result<Self, LayoutError> {
        Self::build(name.into(), address, descriptor, None)
    }

    pub(crate) fn from_library(
        name: String,
        address: NativeAddress,
        descriptor: CallDescriptor,
        library: Arc<Library>,
    ) -> Result<Self, LayoutError> {
        Self::build(name, address, descriptor, Some(library))
    }

    fn build(
        name: String,
        address: NativeAddress,
        descriptor: CallDescriptor,
        library: Option<Arc<Library>>,
    ) -> Result<Self, LayoutError> {
        let cif = descriptor.cif()?;
        Ok(Self {
            name,
            address,
            descriptor,
            cif,
            _library: library,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> NativeAddress {
        self.address
    }

    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    /// Call the function with scratch memory from this thread's default
    /// [`MemoryStack`]. Returns `None` for `void` functions.
    pub fn invoke(&self, args: &[Value]) -> Result<Option<Value>, CallError> {
        self.check_arity(args)?;
        MemoryStack::with_thread_frame(|frame| self.invoke_in(frame, args)).map_err(|source| {
            CallError::Scratch {
                function: self.name.clone(),
                source,
            }
        })?
    }

    /// Call the function with argument and return slots allocated from
    /// `frame`, which must be the innermost live frame of its stack.
    pub fn invoke_in(
        &self,
        frame: &StackFrame<'_>,
        args: &[Value],
    ) -> Result<Option<Value>, CallError> {
        self.check_arity(args)?;
        trace!(
            function = %self.name,
            arity = args.len(),
            depth = frame.depth(),
            "invoking downcall"
        );
        let scratch = |source| CallError::Scratch {
            function: self.name.clone(),
            source,
        };

        let mut slots: Vec<*mut c_void> = Vec::with_capacity(args.len());
        for (index, (abi, value)) in self.descriptor.params().iter().zip(args).enumerate() {
            let slot = frame
                .allocate(abi.width().max(SLOT), abi.alignment().max(SLOT))
                .map_err(scratch)?;
            lower(&slot, 0, abi, value, self.descriptor.narrowing()).map_err(|source| {
                CallError::Argument {
                    function: self.name.clone(),
                    index,
                    source,
                }
            })?;
            slots.push(slot.as_mut_ptr().cast());
        }

        let ret = frame
            .allocate(self.descriptor.return_buffer_size(), RETURN_ALIGNMENT)
            .map_err(scratch)?;
        let code = CodePtr::from_ptr(self.address.as_ptr::<c_void>());

        // SAFETY: the CIF matches the descriptor, every argument slot holds a
        // value of its parameter type, and the return buffer is at least as
        // large as the return type and a full register pair. The caller of
        // `from_address`, or the symbol lookup, vouched for the signature.
        unsafe {
            raw::ffi_call(
                self.cif.as_raw_ptr(),
                Some(*code.as_safe_fun()),
                ret.as_mut_ptr().cast(),
                slots.as_mut_ptr(),
            );
        }

        self.descriptor
            .lift_return(&ret)
            .map_err(|source| CallError::Return {
                function: self.name.clone(),
                source,
            })
    }
}

impl Downcall {
    fn check_arity(&self, args: &[Value]) -> Result<(), CallError> {
        if args.len() == self.descriptor.arity() {
            Ok(())
        } else {
            Err(CallError::ArityMismatch {
                function: self.name.clone(),
                expected: self.descriptor.arity(),
                got: args.len(),
            })
        }
    }
}

impl fmt::Debug for Downcall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downcall")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
