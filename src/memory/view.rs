//! Bounded, permission-checked views over bytes.

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use super::align::check_alignment;
use super::{ArrayView, ByteOrder, Decoder, Encoder, MemoryError, NativeAddress, Scalar};

const READABLE: u8 = 0b001;
const WRITABLE: u8 = 0b010;
const NATIVE: u8 = 0b100;

/// A view of `size` contiguous bytes.
///
/// A view is either heap-backed (borrowed from a Rust slice, no stable
/// address) or native-backed (raw memory with a start address). Every
/// access checks the permission flag first and the bounds second, so a
/// refused access never touches the backing storage.
///
/// Views are cheap to copy. Derived views from [`Memory::slice`] and
/// [`Memory::as_read_only`] share the storage of their parent and never
/// outlive it.
#[derive(Clone, Copy)]
pub struct Memory<'a> {
    start: *mut u8,
    size: usize,
    flags: u8,
    _storage: PhantomData<&'a UnsafeCell<[u8]>>,
}

impl<'a> Memory<'a> {
    /// Writable heap view over a mutable slice.
    pub fn from_mut_slice(bytes: &'a mut [u8]) -> Self {
        Self {
            start: bytes.as_mut_ptr(),
            size: bytes.len(),
            flags: READABLE | WRITABLE,
            _storage: PhantomData,
        }
    }

    /// Read-only heap view over a shared slice.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self {
            start: bytes.as_ptr().cast_mut(),
            size: bytes.len(),
            flags: READABLE,
            _storage: PhantomData,
        }
    }

    /// Readable and writable native view of `size` bytes at `address`.
    ///
    /// The view does not own the memory and never frees it.
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads and writes of `size` bytes for the
    /// whole of `'a`, and no Rust reference may alias those bytes meanwhile.
    pub unsafe fn from_raw_parts(address: NativeAddress, size: usize) -> Self {
        Self {
            start: address.as_mut_ptr(),
            size,
            flags: READABLE | WRITABLE | NATIVE,
            _storage: PhantomData,
        }
    }

    /// Read-only native view of `size` bytes at `address`.
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads of `size` bytes for the whole of
    /// `'a`, and nothing may write those bytes through a Rust reference
    /// meanwhile.
    pub unsafe fn from_raw_parts_read_only(address: NativeAddress, size: usize) -> Self {
        Self {
            start: address.as_mut_ptr(),
            size,
            flags: READABLE | NATIVE,
            _storage: PhantomData,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_readable(&self) -> bool {
        self.flags & READABLE != 0
    }

    pub fn is_writable(&self) -> bool {
        self.flags & WRITABLE != 0
    }

    pub fn is_native(&self) -> bool {
        self.flags & NATIVE != 0
    }

    /// Start address, for native views only.
    pub fn start_address(&self) -> Option<NativeAddress> {
        self.is_native().then(|| NativeAddress::from_ptr(self.start))
    }

    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.start
    }

    /// Fails if this is a native view whose start address is not a multiple
    /// of `alignment`. Heap views have no stable address and always pass.
    pub fn require_aligned_to(&self, alignment: usize) -> Result<(), MemoryError> {
        check_alignment(alignment)?;
        match self.start_address() {
            Some(address) => address.require_aligned_to(alignment),
            None => Ok(()),
        }
    }

    fn check_readable(&self) -> Result<(), MemoryError> {
        if self.is_readable() {
            Ok(())
        } else {
            Err(MemoryError::NotReadable)
        }
    }

    fn check_writable(&self) -> Result<(), MemoryError> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(MemoryError::NotWritable)
        }
    }

    /// Pointer to `offset` after proving `[offset, offset + width)` is in bounds.
    fn range(&self, offset: usize, width: usize) -> Result<*mut u8, MemoryError> {
        match offset.checked_add(width) {
            Some(end) if end <= self.size => Ok(self.start.wrapping_add(offset)),
            _ => Err(MemoryError::OutOfBounds {
                offset,
                width,
                size: self.size,
            }),
        }
    }

    /// A sub-view of `size` bytes starting at `offset`, with the same flags.
    pub fn slice(&self, offset: usize, size: usize) -> Result<Memory<'a>, MemoryError> {
        let start = self.range(offset, size)?;
        Ok(Self {
            start,
            size,
            flags: self.flags,
            _storage: PhantomData,
        })
    }

    /// The same bytes with the writable flag cleared.
    pub fn as_read_only(&self) -> Memory<'a> {
        Self {
            flags: self.flags & !WRITABLE,
            ..*self
        }
    }

    pub fn get<T: Scalar>(&self, offset: usize) -> Result<T, MemoryError> {
        self.get_in(offset, ByteOrder::Native)
    }

    pub fn get_le<T: Scalar>(&self, offset: usize) -> Result<T, MemoryError> {
        self.get_in(offset, ByteOrder::Little)
    }

    pub fn get_be<T: Scalar>(&self, offset: usize) -> Result<T, MemoryError> {
        self.get_in(offset, ByteOrder::Big)
    }

    pub fn get_in<T: Scalar>(&self, offset: usize, order: ByteOrder) -> Result<T, MemoryError> {
        self.check_readable()?;
        let src = self.range(offset, T::SIZE)?;
        let mut bytes = T::Bytes::default();
        let dst = bytes.as_mut();
        // SAFETY: `range` proved `dst.len()` bytes at `src` lie inside the view.
        unsafe { ptr::copy_nonoverlapping(src, dst.as_mut_ptr(), dst.len()) };
        Ok(T::from_bytes(bytes, order))
    }

    pub fn set<T: Scalar>(&self, offset: usize, value: T) -> Result<(), MemoryError> {
        self.set_in(offset, value, ByteOrder::Native)
    }

    pub fn set_le<T: Scalar>(&self, offset: usize, value: T) -> Result<(), MemoryError> {
        self.set_in(offset, value, ByteOrder::Little)
    }

    pub fn set_be<T: Scalar>(&self, offset: usize, value: T) -> Result<(), MemoryError> {
        self.set_in(offset, value, ByteOrder::Big)
    }

    pub fn set_in<T: Scalar>(
        &self,
        offset: usize,
        value: T,
        order: ByteOrder,
    ) -> Result<(), MemoryError> {
        self.check_writable()?;
        let dst = self.range(offset, T::SIZE)?;
        let bytes = value.to_bytes(order);
        let src = bytes.as_ref();
        // SAFETY: `range` proved `src.len()` bytes at `dst` lie inside the view.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len()) };
        Ok(())
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    pub fn read_bytes(&self, offset: usize, dst: &mut [u8]) -> Result<(), MemoryError> {
        self.check_readable()?;
        let src = self.range(offset, dst.len())?;
        // SAFETY: `range` proved the source bytes lie inside the view; `dst`
        // is a distinct Rust borrow.
        unsafe { ptr::copy(src, dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }

    /// Copy all of `src` into the view starting at `offset`.
    pub fn write_bytes(&self, offset: usize, src: &[u8]) -> Result<(), MemoryError> {
        self.check_writable()?;
        let dst = self.range(offset, src.len())?;
        // SAFETY: `range` proved the destination bytes lie inside the view.
        unsafe { ptr::copy(src.as_ptr(), dst, src.len()) };
        Ok(())
    }

    /// Copy the whole of `source` into the start of this view.
    ///
    /// Fails without copying if `source` is larger than this view.
    /// Overlapping views are handled.
    pub fn copy_from(&self, source: &Memory<'_>) -> Result<(), MemoryError> {
        self.check_writable()?;
        source.check_readable()?;
        let dst = self.range(0, source.size)?;
        // SAFETY: both ranges were checked; `ptr::copy` tolerates overlap.
        unsafe { ptr::copy(source.start, dst, source.size) };
        Ok(())
    }

    /// Copy the whole of this view into the start of `destination`.
    pub fn copy_to(&self, destination: &Memory<'_>) -> Result<(), MemoryError> {
        destination.copy_from(self)
    }

    /// Copy `self.size()` bytes from a raw address into this view.
    ///
    /// # Safety
    ///
    /// `source` must be valid for reads of `self.size()` bytes.
    pub unsafe fn copy_from_address(&self, source: NativeAddress) -> Result<(), MemoryError> {
        self.check_writable()?;
        // SAFETY: the view covers its own size; the caller vouches for `source`.
        unsafe { ptr::copy(source.as_ptr::<u8>(), self.start, self.size) };
        Ok(())
    }

    /// Copy this view to a raw address.
    ///
    /// # Safety
    ///
    /// `destination` must be valid for writes of `self.size()` bytes.
    pub unsafe fn copy_to_address(&self, destination: NativeAddress) -> Result<(), MemoryError> {
        self.check_readable()?;
        // SAFETY: the view covers its own size; the caller vouches for `destination`.
        unsafe { ptr::copy(self.start, destination.as_mut_ptr::<u8>(), self.size) };
        Ok(())
    }

    pub fn fill(&self, byte: u8) -> Result<(), MemoryError> {
        self.check_writable()?;
        // SAFETY: exactly the bytes of the view are written.
        unsafe { ptr::write_bytes(self.start, byte, self.size) };
        Ok(())
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, MemoryError> {
        let mut bytes = vec![0u8; self.size];
        self.read_bytes(0, &mut bytes)?;
        Ok(bytes)
    }

    /// Sequential writer positioned at offset 0.
    pub fn encoder(&self) -> Result<Encoder<'a>, MemoryError> {
        self.check_writable()?;
        Ok(Encoder::new(*self))
    }

    /// Sequential reader positioned at offset 0.
    pub fn decoder(&self) -> Result<Decoder<'a>, MemoryError> {
        self.check_readable()?;
        Ok(Decoder::new(*self))
    }

    /// The view as `size / T::SIZE` consecutive scalars.
    pub fn array<T: Scalar>(&self) -> ArrayView<'a, T> {
        ArrayView::new(*self)
    }
}

impl<'a> From<&'a mut [u8]> for Memory<'a> {
    fn from(bytes: &'a mut [u8]) -> Self {
        Memory::from_mut_slice(bytes)
    }
}

impl<'a> From<&'a [u8]> for Memory<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Memory::from_slice(bytes)
    }
}

impl fmt::Debug for Memory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("size", &self.size)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .field("address", &self.start_address())
            .finish()
    }
}
