//! Fixed-width scalars that can be moved through a memory view.

/// Byte order used when reading or writing a multi-byte scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Host byte order.
    #[default]
    Native,
    Little,
    Big,
}

mod sealed {
    pub trait Sealed {}
}

/// A plain fixed-width value with a byte representation.
///
/// Sealed: the set of scalars is closed so every width is known up front.
pub trait Scalar: Copy + sealed::Sealed {
    /// Width in bytes.
    const SIZE: usize;

    /// Byte array of exactly [`Scalar::SIZE`] bytes.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default + Copy;

    fn from_bytes(bytes: Self::Bytes, order: ByteOrder) -> Self;

    fn to_bytes(self, order: ByteOrder) -> Self::Bytes;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Scalar for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();
            type Bytes = [u8; std::mem::size_of::<$ty>()];

            #[inline]
            fn from_bytes(bytes: Self::Bytes, order: ByteOrder) -> Self {
                match order {
                    ByteOrder::Native => <$ty>::from_ne_bytes(bytes),
                    ByteOrder::Little => <$ty>::from_le_bytes(bytes),
                    ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                }
            }

            #[inline]
            fn to_bytes(self, order: ByteOrder) -> Self::Bytes {
                match order {
                    ByteOrder::Native => self.to_ne_bytes(),
                    ByteOrder::Little => self.to_le_bytes(),
                    ByteOrder::Big => self.to_be_bytes(),
                }
            }
        }
    )*};
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

impl sealed::Sealed for super::NativeAddress {}

impl Scalar for super::NativeAddress {
    const SIZE: usize = std::mem::size_of::<usize>();
    type Bytes = [u8; std::mem::size_of::<usize>()];

    #[inline]
    fn from_bytes(bytes: Self::Bytes, order: ByteOrder) -> Self {
        Self::from_bits(usize::from_bytes(bytes, order))
    }

    #[inline]
    fn to_bytes(self, order: ByteOrder) -> Self::Bytes {
        self.to_bits().to_bytes(order)
    }
}
