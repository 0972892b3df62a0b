//! Managed values crossing the native boundary.

use std::fmt;

use crate::layout::ManagedKind;
use crate::memory::NativeAddress;

/// A managed value in its managed representation.
///
/// Platform-variable C integers travel as 64-bit values: `long` and
/// `ptrdiff_t` as [`Value::I64`], `unsigned long` and `size_t` as
/// [`Value::U64`]. Pointers travel as [`Value::Address`]; structs passed by
/// value travel as their raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Address(NativeAddress),
    Struct(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ManagedKind {
        match self {
            Value::I8(_) => ManagedKind::I8,
            Value::U8(_) => ManagedKind::U8,
            Value::I16(_) => ManagedKind::I16,
            Value::U16(_) => ManagedKind::U16,
            Value::I32(_) => ManagedKind::I32,
            Value::U32(_) => ManagedKind::U32,
            Value::I64(_) => ManagedKind::I64,
            Value::U64(_) => ManagedKind::U64,
            Value::F32(_) => ManagedKind::F32,
            Value::F64(_) => ManagedKind::F64,
            Value::Address(_) => ManagedKind::Address,
            Value::Struct(_) => ManagedKind::Struct,
        }
    }

    /// The value as a wide integer, for integers and addresses.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::I8(v) => Some(i128::from(*v)),
            Value::U8(v) => Some(i128::from(*v)),
            Value::I16(v) => Some(i128::from(*v)),
            Value::U16(v) => Some(i128::from(*v)),
            Value::I32(v) => Some(i128::from(*v)),
            Value::U32(v) => Some(i128::from(*v)),
            Value::I64(v) => Some(i128::from(*v)),
            Value::U64(v) => Some(i128::from(*v)),
            Value::Address(address) => Some(address.to_bits() as i128),
            Value::F32(_) | Value::F64(_) | Value::Struct(_) => None,
        }
    }

    /// Convert into a typed managed value.
    pub fn get<T: Managed>(self) -> Option<T> {
        T::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I8(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Address(address) => write!(f, "{address}"),
            Value::Struct(bytes) => {
                f.write_str("{")?;
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A Rust type with a fixed managed representation.
///
/// Implemented for the primitive integers and floats, [`NativeAddress`],
/// the C integer newtypes and `Vec<u8>` (struct bytes).
pub trait Managed: Sized {
    const KIND: ManagedKind;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_managed {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl Managed for $ty {
            const KIND: ManagedKind = ManagedKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    )*};
}

impl_managed!(
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    NativeAddress => Address,
    Vec<u8> => Struct,
);

macro_rules! c_integer {
    ($(#[$meta:meta])* $name:ident($inner:ty) => $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub $inner);

        impl Managed for $name {
            const KIND: ManagedKind = ManagedKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self.0)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some($name(v)),
                    _ => None,
                }
            }
        }

        impl From<$name> for Value {
            fn from(v: $name) -> Self {
                Value::$variant(v.0)
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                $name(v)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

c_integer!(
    /// Managed form of C `long`.
    CLong(i64) => I64
);
c_integer!(
    /// Managed form of C `unsigned long`.
    CULong(u64) => U64
);
c_integer!(
    /// Managed form of C `size_t`.
    CSizeT(u64) => U64
);
c_integer!(
    /// Managed form of C `ptrdiff_t`.
    CPtrDiffT(i64) => I64
);
