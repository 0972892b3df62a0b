//! Native type tags and their resolved ABI shape.

use std::fmt;
use std::sync::Arc;

use super::{LayoutError, StructLayout};
use crate::memory::NativeAddress;
use crate::platform::Platform;

/// A C type as declared in a signature or struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// C `long`.
    CLong,
    /// C `unsigned long`.
    CULong,
    /// C `size_t`.
    SizeT,
    /// C `ptrdiff_t`.
    PtrDiffT,
    /// Any data or function pointer.
    Pointer,
    /// A struct embedded by value.
    Struct(Arc<StructLayout>),
}

impl NativeType {
    /// Parse a scalar type name in C or Rust spelling.
    ///
    /// Struct names are resolved by the declaration parser, not here.
    /// Anything ending in `*` is a pointer.
    pub fn from_name(name: &str) -> Result<Self, LayoutError> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.ends_with('*') {
            return Ok(NativeType::Pointer);
        }
        let ty = match normalized.as_str() {
            "i8" | "int8_t" | "char" | "signed char" => NativeType::I8,
            "u8" | "uint8_t" | "unsigned char" | "uchar" => NativeType::U8,
            "i16" | "int16_t" | "short" | "signed short" | "short int" => NativeType::I16,
            "u16" | "uint16_t" | "unsigned short" | "ushort" => NativeType::U16,
            "i32" | "int32_t" | "int" | "signed" | "signed int" => NativeType::I32,
            "u32" | "uint32_t" | "unsigned" | "unsigned int" | "uint" => NativeType::U32,
            "i64" | "int64_t" | "long long" | "signed long long" => NativeType::I64,
            "u64" | "uint64_t" | "unsigned long long" => NativeType::U64,
            "f32" | "float" => NativeType::F32,
            "f64" | "double" => NativeType::F64,
            "long" | "signed long" | "long int" | "c_long" => NativeType::CLong,
            "unsigned long" | "ulong" | "c_ulong" => NativeType::CULong,
            "size_t" | "usize" | "uintptr_t" => NativeType::SizeT,
            "ptrdiff_t" | "isize" | "ssize_t" | "intptr_t" => NativeType::PtrDiffT,
            "pointer" | "ptr" => NativeType::Pointer,
            _ => return Err(LayoutError::UnknownType(normalized)),
        };
        Ok(ty)
    }

    /// Whether the width depends on the platform.
    pub fn is_platform_dependent(&self) -> bool {
        match self {
            NativeType::CLong
            | NativeType::CULong
            | NativeType::SizeT
            | NativeType::PtrDiffT
            | NativeType::Pointer => true,
            NativeType::Struct(layout) => layout
                .fields()
                .iter()
                .any(|field| field.abi().native().is_platform_dependent()),
            _ => false,
        }
    }

    /// Resolve to a concrete width, alignment, class and extension rule.
    pub fn resolve(&self, platform: &Platform) -> Result<AbiType, LayoutError> {
        let pointer = platform.pointer_width().bytes();
        let long = platform.long_width().bytes();
        let (width, alignment, class) = match self {
            NativeType::I8 => (1, 1, AbiClass::Signed),
            NativeType::U8 => (1, 1, AbiClass::Unsigned),
            NativeType::I16 => (2, 2, AbiClass::Signed),
            NativeType::U16 => (2, 2, AbiClass::Unsigned),
            NativeType::I32 => (4, 4, AbiClass::Signed),
            NativeType::U32 => (4, 4, AbiClass::Unsigned),
            NativeType::I64 => (8, 8, AbiClass::Signed),
            NativeType::U64 => (8, 8, AbiClass::Unsigned),
            NativeType::F32 => (4, 4, AbiClass::Float),
            NativeType::F64 => (8, 8, AbiClass::Float),
            NativeType::CLong => (long, long, AbiClass::Signed),
            NativeType::CULong => (long, long, AbiClass::Unsigned),
            NativeType::SizeT => (pointer, pointer, AbiClass::Unsigned),
            NativeType::PtrDiffT => (pointer, pointer, AbiClass::Signed),
            NativeType::Pointer => (pointer, pointer, AbiClass::Address),
            NativeType::Struct(layout) => {
                if layout.platform() != platform {
                    return Err(LayoutError::PlatformMismatch {
                        structure: layout.name().to_string(),
                        expected: *layout.platform(),
                        actual: *platform,
                    });
                }
                (layout.size(), layout.alignment(), AbiClass::Struct)
            }
        };
        let kind = ManagedKind::for_native(self);
        let extension = match (class, kind.width()) {
            (AbiClass::Signed, Some(managed)) if width < managed => Extension::Sign,
            (AbiClass::Unsigned | AbiClass::Address, Some(managed)) if width < managed => {
                Extension::Zero
            }
            _ => Extension::None,
        };
        Ok(AbiType {
            native: self.clone(),
            width,
            alignment,
            class,
            extension,
        })
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeType::I8 => f.write_str("int8_t"),
            NativeType::U8 => f.write_str("uint8_t"),
            NativeType::I16 => f.write_str("int16_t"),
            NativeType::U16 => f.write_str("uint16_t"),
            NativeType::I32 => f.write_str("int32_t"),
            NativeType::U32 => f.write_str("uint32_t"),
            NativeType::I64 => f.write_str("int64_t"),
            NativeType::U64 => f.write_str("uint64_t"),
            NativeType::F32 => f.write_str("float"),
            NativeType::F64 => f.write_str("double"),
            NativeType::CLong => f.write_str("long"),
            NativeType::CULong => f.write_str("unsigned long"),
            NativeType::SizeT => f.write_str("size_t"),
            NativeType::PtrDiffT => f.write_str("ptrdiff_t"),
            NativeType::Pointer => f.write_str("void*"),
            NativeType::Struct(layout) => write!(f, "struct {}", layout.name()),
        }
    }
}

/// How a resolved type travels through registers and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiClass {
    Signed,
    Unsigned,
    Float,
    Address,
    Struct,
}

/// Widening applied when a narrower native integer becomes its managed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    None,
    Sign,
    Zero,
}

/// The managed representation a native type lifts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Address,
    Struct,
}

impl ManagedKind {
    /// Platform-variable integers widen to 64 bits; pointers become addresses.
    pub fn for_native(ty: &NativeType) -> Self {
        match ty {
            NativeType::I8 => ManagedKind::I8,
            NativeType::U8 => ManagedKind::U8,
            NativeType::I16 => ManagedKind::I16,
            NativeType::U16 => ManagedKind::U16,
            NativeType::I32 => ManagedKind::I32,
            NativeType::U32 => ManagedKind::U32,
            NativeType::I64 | NativeType::CLong | NativeType::PtrDiffT => ManagedKind::I64,
            NativeType::U64 | NativeType::CULong | NativeType::SizeT => ManagedKind::U64,
            NativeType::F32 => ManagedKind::F32,
            NativeType::F64 => ManagedKind::F64,
            NativeType::Pointer => ManagedKind::Address,
            NativeType::Struct(_) => ManagedKind::Struct,
        }
    }

    /// Width of the managed value in bytes; structs have none.
    pub fn width(self) -> Option<usize> {
        match self {
            ManagedKind::I8 | ManagedKind::U8 => Some(1),
            ManagedKind::I16 | ManagedKind::U16 => Some(2),
            ManagedKind::I32 | ManagedKind::U32 | ManagedKind::F32 => Some(4),
            ManagedKind::I64 | ManagedKind::U64 | ManagedKind::F64 => Some(8),
            ManagedKind::Address => Some(NativeAddress::BYTE_SIZE),
            ManagedKind::Struct => None,
        }
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManagedKind::I8 => "i8",
            ManagedKind::U8 => "u8",
            ManagedKind::I16 => "i16",
            ManagedKind::U16 => "u16",
            ManagedKind::I32 => "i32",
            ManagedKind::U32 => "u32",
            ManagedKind::I64 => "i64",
            ManagedKind::U64 => "u64",
            ManagedKind::F32 => "f32",
            ManagedKind::F64 => "f64",
            ManagedKind::Address => "address",
            ManagedKind::Struct => "struct bytes",
        };
        f.write_str(name)
    }
}

/// A native type resolved against a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiType {
    native: NativeType,
    width: usize,
    alignment: usize,
    class: AbiClass,
    extension: Extension,
}

impl AbiType {
    pub fn native(&self) -> &NativeType {
        &self.native
    }

    /// Width in bytes.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Natural alignment in bytes.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn class(&self) -> AbiClass {
        self.class
    }

    pub fn extension(&self) -> Extension {
        self.extension
    }

    pub fn managed_kind(&self) -> ManagedKind {
        ManagedKind::for_native(&self.native)
    }
}
