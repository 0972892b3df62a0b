//! Owned native allocations with exactly-once release.

use std::alloc::{self, Layout};
use std::fmt;

use super::align::check_alignment;
use super::{Memory, MemoryError, NativeAddress};
use crate::logging::trace;

type Release = Box<dyn FnOnce(NativeAddress) + Send + Sync>;

enum Owner {
    /// Allocated here from the global allocator.
    Global(Layout),
    /// Adopted from foreign code with its own release function.
    Foreign(Option<Release>),
    /// Zero-sized; nothing to release.
    Empty,
}

/// A region of native memory released exactly once.
///
/// Release happens on drop or through [`NativeAllocation::free`]. Views
/// borrowed from the allocation cannot outlive it.
pub struct NativeAllocation {
    address: NativeAddress,
    size: usize,
    owner: Owner,
}

// SAFETY: the allocation owns its bytes outright. Shared access only hands
// out read-only views; writable views need `&mut self`.
unsafe impl Send for NativeAllocation {}
// SAFETY: see above.
unsafe impl Sync for NativeAllocation {}

impl NativeAllocation {
    /// Allocate `size` zeroed bytes aligned to `alignment`.
    pub fn new(size: usize, alignment: usize) -> Result<Self, MemoryError> {
        check_alignment(alignment)?;
        if size == 0 {
            return Ok(Self {
                address: NativeAddress::from_bits(alignment),
                size,
                owner: Owner::Empty,
            });
        }
        let layout = Layout::from_size_align(size, alignment)
            .map_err(|_| MemoryError::AllocationFailed { size, alignment })?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(MemoryError::AllocationFailed { size, alignment });
        }
        let address = NativeAddress::from_ptr(ptr);
        trace!(%address, size, alignment, "allocated native memory");
        Ok(Self {
            address,
            size,
            owner: Owner::Global(layout),
        })
    }

    /// Adopt `size` bytes at `address` owned by foreign code.
    ///
    /// `release` runs exactly once, when the allocation is dropped or freed.
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads and writes of `size` bytes until
    /// `release` runs, and nothing else may free it.
    pub unsafe fn from_raw_parts(
        address: NativeAddress,
        size: usize,
        release: impl FnOnce(NativeAddress) + Send + Sync + 'static,
    ) -> Self {
        Self {
            address,
            size,
            owner: Owner::Foreign(Some(Box::new(release))),
        }
    }

    pub fn address(&self) -> NativeAddress {
        self.address
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Read-only view of the allocation.
    pub fn memory(&self) -> Memory<'_> {
        // SAFETY: the allocation covers `size` bytes and lives as long as the
        // borrow; shared borrows never produce a writable view.
        unsafe { Memory::from_raw_parts_read_only(self.address, self.size) }
    }

    /// Readable and writable view of the allocation.
    pub fn memory_mut(&mut self) -> Memory<'_> {
        // SAFETY: the allocation covers `size` bytes and the exclusive borrow
        // keeps every other view away for its duration.
        unsafe { Memory::from_raw_parts(self.address, self.size) }
    }

    /// Release now instead of at end of scope.
    pub fn free(self) {
        drop(self);
    }
}

impl Drop for NativeAllocation {
    fn drop(&mut self) {
        match &mut self.owner {
            Owner::Global(layout) => {
                trace!(address = %self.address, size = self.size, "releasing native memory");
                // SAFETY: allocated in `new` with this exact layout, released once.
                unsafe { alloc::dealloc(self.address.as_mut_ptr(), *layout) };
            }
            Owner::Foreign(release) => {
                if let Some(release) = release.take() {
                    release(self.address);
                }
            }
            Owner::Empty => {}
        }
    }
}

impl fmt::Debug for NativeAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeAllocation")
            .field("address", &self.address)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zeroed_and_aligned() {
        let mut allocation = NativeAllocation::new(64, 16).unwrap();
        assert!(allocation.address().is_aligned_to(16));
        let memory = allocation.memory_mut();
        assert!(memory.is_native());
        assert!(memory.to_vec().unwrap().iter().all(|b| *b == 0));
        memory.set(60, 0xDEAD_BEEFu32).unwrap();
        assert_eq!(allocation.memory().get::<u32>(60).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_shared_view_is_read_only() {
        let allocation = NativeAllocation::new(8, 8).unwrap();
        assert!(!allocation.memory().is_writable());
    }

    #[test]
    fn test_zero_size() {
        let allocation = NativeAllocation::new(0, 8).unwrap();
        assert!(allocation.memory().is_empty());
        allocation.free();
    }

    #[test]
    fn test_invalid_alignment() {
        assert_eq!(
            NativeAllocation::new(8, 3).unwrap_err(),
            MemoryError::InvalidAlignment(3)
        );
    }

    #[test]
    fn test_foreign_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut backing = vec![0u8; 4];
        let address = NativeAddress::from_ptr(backing.as_mut_ptr());
        let counter = Arc::clone(&released);
        let allocation = unsafe {
            NativeAllocation::from_raw_parts(address, 4, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        };
        allocation.free();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        drop(backing);
    }
}
