//! Native library loading and symbol linking.

use std::ffi::{CString, c_void};
use std::fmt;
use std::sync::Arc;

use libloading::Library;

use super::{BindError, Declarations};
use crate::call::{CallDescriptor, Downcall, Value};
use crate::logging::{debug, info};
use crate::memory::NativeAddress;

/// A loaded native library.
///
/// The handle is shared with every [`Downcall`] bound from it, so the library
/// stays loaded while any of them is alive.
#[derive(Clone)]
pub struct NativeLibrary {
    name: String,
    library: Arc<Library>,
}

impl NativeLibrary {
    /// Load a library by path or base name.
    ///
    /// The name is tried as given first, then as a platform file name
    /// (`libNAME.so`, `libNAME.dylib`, `NAME.dll`). An empty name opens the
    /// symbols already loaded into the current process.
    pub fn open(name: &str) -> Result<Self, BindError> {
        let library = if name.is_empty() {
            Self::this()?
        } else {
            // SAFETY: loading a library runs its initializers; callers opt in
            // to native code by naming it.
            match unsafe { Library::new(name) } {
                Ok(library) => library,
                Err(first) => {
                    let filename = libloading::library_filename(name);
                    // SAFETY: as above.
                    unsafe { Library::new(&filename) }.map_err(|e| BindError::LibraryNotFound {
                        library: name.to_string(),
                        message: format!(
                            "{}; tried '{}': {}",
                            first,
                            filename.to_string_lossy(),
                            e
                        ),
                    })?
                }
            }
        };
        info!(library = %display_name(name), "opened native library");
        Ok(Self {
            name: name.to_string(),
            library: Arc::new(library),
        })
    }

    #[cfg(unix)]
    fn this() -> Result<Library, BindError> {
        Ok(libloading::os::unix::Library::this().into())
    }

    #[cfg(windows)]
    fn this() -> Result<Library, BindError> {
        libloading::os::windows::Library::this()
            .map(Into::into)
            .map_err(|e| BindError::LibraryNotFound {
                library: display_name("").to_string(),
                message: e.to_string(),
            })
    }

    /// The name the library was opened with; empty for the process itself.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a symbol to its address.
    pub fn symbol(&self, symbol: &str) -> Result<NativeAddress, BindError> {
        let not_found = || BindError::SymbolNotFound {
            library: display_name(&self.name).to_string(),
            symbol: symbol.to_string(),
        };
        let c_name = CString::new(symbol).map_err(|_| not_found())?;
        // SAFETY: the symbol is read as an opaque address and never
        // dereferenced here.
        let pointer = unsafe { self.library.get::<*const c_void>(c_name.as_bytes_with_nul()) }
            .map(|symbol| *symbol)
            .map_err(|_| not_found())?;
        let address = NativeAddress::from_ptr(pointer);
        if address.is_null() {
            return Err(not_found());
        }
        debug!(library = %display_name(&self.name), symbol, %address, "resolved symbol");
        Ok(address)
    }

    /// Bind one function.
    ///
    /// # Safety
    ///
    /// The symbol must be a function whose C signature matches `descriptor`.
    pub unsafe fn bind(&self, symbol: &str, descriptor: CallDescriptor) -> Result<Downcall, BindError> {
        let address = self.symbol(symbol)?;
        Ok(Downcall::from_library(
            symbol.to_string(),
            address,
            descriptor,
            Arc::clone(&self.library),
        )?)
    }

    /// Bind a set of functions. Fails on the first symbol that cannot be
    /// resolved.
    ///
    /// # Safety
    ///
    /// Every symbol must be a function whose C signature matches its
    /// descriptor.
    pub unsafe fn link<I, S>(&self, functions: I) -> Result<LinkedLibrary, BindError>
    where
        I: IntoIterator<Item = (S, CallDescriptor)>,
        S: AsRef<str>,
    {
        let functions = functions
            .into_iter()
            // SAFETY: forwarded to the caller.
            .map(|(symbol, descriptor)| unsafe { self.bind(symbol.as_ref(), descriptor) })
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            library = %display_name(&self.name),
            count = functions.len(),
            "linked native functions"
        );
        Ok(LinkedLibrary {
            name: self.name.clone(),
            functions,
        })
    }

    /// Bind every function of a declaration file.
    ///
    /// # Safety
    ///
    /// The declarations must match the library's real signatures.
    pub unsafe fn link_declarations(
        &self,
        declarations: &Declarations,
    ) -> Result<LinkedLibrary, BindError> {
        let functions = declarations
            .functions()
            .iter()
            .map(|f| -> Result<_, BindError> {
                Ok((f.symbol(), f.descriptor(declarations.platform())?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        // SAFETY: forwarded to the caller.
        unsafe { self.link(functions) }
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("name", &display_name(&self.name))
            .finish_non_exhaustive()
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "<process>" } else { name }
}

/// Functions bound from one library, looked up by symbol.
#[derive(Debug)]
pub struct LinkedLibrary {
    name: String,
    functions: Vec<Downcall>,
}

impl LinkedLibrary {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[Downcall] {
        &self.functions
    }

    pub fn function(&self, symbol: &str) -> Option<&Downcall> {
        self.functions.iter().find(|f| f.name() == symbol)
    }

    /// Call a bound function by symbol.
    pub fn invoke(&self, symbol: &str, args: &[Value]) -> crate::Result<Option<Value>> {
        let function = self
            .function(symbol)
            .ok_or_else(|| BindError::UnknownFunction(symbol.to_string()))?;
        Ok(function.invoke(args)?)
    }
}
