//! Upcalls: native function pointers that call back into Rust.

use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::process;

use libffi::low::ffi_cif;
use libffi::middle::Closure;

use super::marshal::lift;
use super::{CallDescriptor, CallError, MarshalError, Value};
use crate::layout::LayoutError;
use crate::logging::{debug, error};
use crate::memory::{Memory, NativeAddress};

type Handler = dyn Fn(&[Value]) -> Option<Value> + Send + Sync;

/// A Rust function together with the native signature it will be called with.
///
/// Native code may call the bound pointer from any thread, so the function
/// must be `Send + Sync`. Returning a value that does not match the
/// descriptor's return type is logged and the native caller receives zero.
pub struct UpcallHandler {
    name: String,
    descriptor: CallDescriptor,
    function: Box<Handler>,
}

impl UpcallHandler {
    pub fn new<F>(
        name: impl Into<String>,
        descriptor: CallDescriptor,
        function: F,
    ) -> Result<Self, LayoutError>
    where
        F: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        descriptor.require_host()?;
        Ok(Self {
            name: name.into(),
            descriptor,
            function: Box::new(function),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &CallDescriptor {
        &self.descriptor
    }

    /// Create a native entry point for this handler.
    ///
    /// The entry point is valid until the returned [`Upcall`] is dropped.
    pub fn bind(&self) -> Result<Upcall<'_>, LayoutError> {
        let cif = self.descriptor.cif()?;
        let closure = Closure::new(cif, dispatch, self);
        let address = NativeAddress::from_ptr(*closure.code_ptr() as *const ());
        debug!(upcall = %self.name, %address, "created upcall stub");
        Ok(Upcall {
            closure,
            address,
            handler: self,
        })
    }

    /// Lift the native arguments, run the handler and store its result.
    ///
    /// # Safety
    ///
    /// `args` must hold one valid pointer per parameter, each pointing at a
    /// value of that parameter's type, and `result` must point at a buffer
    /// large enough for the return type and a full register.
    unsafe fn call(&self, result: *mut u8, args: *const *const c_void) -> Result<(), CallError> {
        let mut values = Vec::with_capacity(self.descriptor.arity());
        for (index, abi) in self.descriptor.params().iter().enumerate() {
            // SAFETY: libffi passes one argument pointer per parameter.
            let arg = unsafe { *args.add(index) };
            // SAFETY: the argument pointer addresses a value of this type that
            // lives for the duration of the callback.
            let memory = unsafe {
                Memory::from_raw_parts_read_only(NativeAddress::from_ptr(arg), abi.width())
            };
            let value = lift(&memory, 0, abi).map_err(|source| CallError::Argument {
                function: self.name.clone(),
                index,
                source,
            })?;
            values.push(value);
        }

        let returned = (self.function)(&values);

        let Some(abi) = self.descriptor.ret() else {
            return Ok(());
        };
        // SAFETY: libffi sizes the result buffer for the return type, and
        // never below one register.
        let buffer = unsafe {
            Memory::from_raw_parts(
                NativeAddress::from_ptr(result),
                abi.width().max(std::mem::size_of::<usize>()),
            )
        };
        let outcome = match &returned {
            Some(value) => self.descriptor.lower_return(&buffer, value),
            None => Err(MarshalError::TypeMismatch {
                expected: abi.native().to_string(),
                got: "no value".to_string(),
            }),
        };
        outcome.map_err(|source| {
            // Writable native view filled over its own extent: cannot fail.
            let _ = buffer.fill(0);
            CallError::Return {
                function: self.name.clone(),
                source,
            }
        })
    }
}

impl fmt::Debug for UpcallHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpcallHandler")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

unsafe extern "C" fn dispatch(
    _cif: &ffi_cif,
    result: &mut u64,
    args: *const *const c_void,
    handler: &UpcallHandler,
) {
    let result: *mut u8 = std::ptr::from_mut(result).cast();
    // SAFETY: libffi upholds the argument and result buffer contracts of
    // `UpcallHandler::call` for the CIF the closure was created with.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| unsafe { handler.call(result, args) }));
    match outcome {
        Ok(Ok(())) => {}
        #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
        Ok(Err(err)) => {
            error!(upcall = %handler.name, error = %err, "upcall failed; returning zero");
        }
        Err(_) => {
            error!(upcall = %handler.name, "upcall panicked; aborting");
            process::abort();
        }
    }
}

/// A live native entry point for an [`UpcallHandler`].
///
/// Dropping it frees the trampoline; native code must not call
/// [`Upcall::address`] afterwards.
pub struct Upcall<'h> {
    closure: Closure<'h>,
    address: NativeAddress,
    handler: &'h UpcallHandler,
}

impl Upcall<'_> {
    /// The native function pointer.
    pub fn address(&self) -> NativeAddress {
        self.address
    }

    pub fn handler(&self) -> &UpcallHandler {
        self.handler
    }

    /// The entry point as a typed function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be an `extern "C"` function pointer type whose signature
    /// matches the handler's descriptor.
    pub unsafe fn as_fn<F: Copy>(&self) -> F {
        // SAFETY: forwarded to the caller.
        unsafe { *self.closure.instantiate_code_ptr::<F>() }
    }
}

impl fmt::Debug for Upcall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upcall")
            .field("name", &self.handler.name)
            .field("address", &self.address)
            .finish()
    }
}
