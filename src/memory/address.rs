//! Raw native addresses.

use std::ffi::{CStr, c_char};
use std::fmt;
use std::ptr;

use super::{ByteOrder, MemoryError, Scalar};

/// An unsigned machine-word address.
///
/// Arithmetic is checked and fails instead of wrapping. Dereferencing is
/// `unsafe`: the type carries no guarantee that the address is valid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct NativeAddress(usize);

impl NativeAddress {
    pub const NULL: NativeAddress = NativeAddress(0);

    /// Size of an address in bytes.
    pub const BYTE_SIZE: usize = std::mem::size_of::<usize>();

    /// Size of an address in bits.
    pub const BIT_SIZE: u32 = usize::BITS;

    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> usize {
        self.0
    }

    /// Address of a pointer, exposing its provenance.
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.expose_provenance())
    }

    /// Pointer to this address, picking up any exposed provenance.
    pub fn as_ptr<T>(self) -> *const T {
        ptr::with_exposed_provenance(self.0)
    }

    pub fn as_mut_ptr<T>(self) -> *mut T {
        ptr::with_exposed_provenance_mut(self.0)
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the address is a multiple of `alignment`.
    ///
    /// `alignment` must be a power of two; any other value yields false.
    pub const fn is_aligned_to(self, alignment: usize) -> bool {
        alignment.is_power_of_two() && self.0 & (alignment - 1) == 0
    }

    pub fn require_aligned_to(self, alignment: usize) -> Result<(), MemoryError> {
        if !alignment.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment(alignment));
        }
        if self.is_aligned_to(alignment) {
            Ok(())
        } else {
            Err(MemoryError::Misaligned {
                address: self,
                alignment,
            })
        }
    }

    pub fn checked_add(self, offset: usize) -> Result<Self, MemoryError> {
        self.0
            .checked_add(offset)
            .map(Self)
            .ok_or(MemoryError::AddressOverflow {
                address: self,
                delta: offset as i128,
            })
    }

    pub fn checked_sub(self, offset: usize) -> Result<Self, MemoryError> {
        self.0
            .checked_sub(offset)
            .map(Self)
            .ok_or(MemoryError::AddressOverflow {
                address: self,
                delta: -(offset as i128),
            })
    }

    /// Signed distance from `origin` to `self`.
    pub fn offset_from(self, origin: NativeAddress) -> Result<isize, MemoryError> {
        let delta = self.0 as i128 - origin.0 as i128;
        isize::try_from(delta).map_err(|_| MemoryError::AddressOverflow {
            address: origin,
            delta,
        })
    }

    /// Read a scalar in host byte order.
    ///
    /// # Safety
    ///
    /// `self` must be valid for reads of `T::SIZE` bytes.
    pub unsafe fn read<T: Scalar>(self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.read_in(ByteOrder::Native) }
    }

    /// # Safety
    ///
    /// See [`NativeAddress::read`].
    pub unsafe fn read_le<T: Scalar>(self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.read_in(ByteOrder::Little) }
    }

    /// # Safety
    ///
    /// See [`NativeAddress::read`].
    pub unsafe fn read_be<T: Scalar>(self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.read_in(ByteOrder::Big) }
    }

    /// # Safety
    ///
    /// See [`NativeAddress::read`].
    pub unsafe fn read_in<T: Scalar>(self, order: ByteOrder) -> T {
        let mut bytes = T::Bytes::default();
        let dst = bytes.as_mut();
        // SAFETY: the caller guarantees `dst.len()` readable bytes at `self`.
        unsafe { ptr::copy_nonoverlapping(self.as_ptr::<u8>(), dst.as_mut_ptr(), dst.len()) };
        T::from_bytes(bytes, order)
    }

    /// Write a scalar in host byte order.
    ///
    /// # Safety
    ///
    /// `self` must be valid for writes of `T::SIZE` bytes.
    pub unsafe fn write<T: Scalar>(self, value: T) {
        // SAFETY: forwarded to the caller.
        unsafe { self.write_in(value, ByteOrder::Native) }
    }

    /// # Safety
    ///
    /// See [`NativeAddress::write`].
    pub unsafe fn write_le<T: Scalar>(self, value: T) {
        // SAFETY: forwarded to the caller.
        unsafe { self.write_in(value, ByteOrder::Little) }
    }

    /// # Safety
    ///
    /// See [`NativeAddress::write`].
    pub unsafe fn write_be<T: Scalar>(self, value: T) {
        // SAFETY: forwarded to the caller.
        unsafe { self.write_in(value, ByteOrder::Big) }
    }

    /// # Safety
    ///
    /// See [`NativeAddress::write`].
    pub unsafe fn write_in<T: Scalar>(self, value: T, order: ByteOrder) {
        let bytes = value.to_bytes(order);
        let src = bytes.as_ref();
        // SAFETY: the caller guarantees `src.len()` writable bytes at `self`.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.as_mut_ptr::<u8>(), src.len()) };
    }

    /// Read a NUL-terminated string, replacing invalid UTF-8.
    ///
    /// # Safety
    ///
    /// `self` must point to a NUL-terminated byte sequence that stays valid
    /// for the duration of the call.
    pub unsafe fn read_c_str(self) -> String {
        // SAFETY: forwarded to the caller.
        let c_str = unsafe { CStr::from_ptr(self.as_ptr::<c_char>()) };
        c_str.to_string_lossy().into_owned()
    }
}

impl fmt::Display for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:0width$x}>", self.0, width = Self::BYTE_SIZE * 2)
    }
}

impl fmt::Debug for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<usize> for NativeAddress {
    fn from(bits: usize) -> Self {
        Self(bits)
    }
}

impl From<NativeAddress> for usize {
    fn from(address: NativeAddress) -> Self {
        address.0
    }
}
