//! Call descriptors: a native signature resolved against a platform.

use libffi::middle::{Cif, Type};

use super::marshal::{lift, lift_bits, lower, lower_bits};
use super::{MarshalError, Narrowing, Value};
use crate::layout::{AbiClass, AbiType, LayoutError, NativeType};
use crate::memory::Memory;
use crate::platform::Platform;

/// Width of the register slot libffi uses for integer returns (`ffi_arg`).
const RETURN_REGISTER: usize = std::mem::size_of::<usize>();

/// Parameter and return types of a native function.
///
/// `None` as the return type means `void`.
///
/// # Example
///
/// ```rust
/// use schism_ffi::call::{CallDescriptor, Value};
/// use schism_ffi::layout::NativeType;
/// use schism_ffi::platform::Platform;
///
/// let descriptor =
///     CallDescriptor::for_platform(&[NativeType::I32], Some(NativeType::CLong), &Platform::LLP64)?;
/// assert_eq!(descriptor.lift_return_bits(0xFFFF_FFFF)?, Some(Value::I64(-1)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    params: Vec<AbiType>,
    ret: Option<AbiType>,
    platform: Platform,
    narrowing: Narrowing,
}

impl CallDescriptor {
    /// Describe a function of the host platform.
    pub fn new(params: &[NativeType], ret: Option<NativeType>) -> Result<Self, LayoutError> {
        Self::for_platform(params, ret, &Platform::host())
    }

    /// Describe a function of any platform.
    ///
    /// Only host descriptors can be called; others are useful for
    /// inspecting widths and extension rules.
    pub fn for_platform(
        params: &[NativeType],
        ret: Option<NativeType>,
        platform: &Platform,
    ) -> Result<Self, LayoutError> {
        let resolve = |ty: &NativeType| -> Result<AbiType, LayoutError> {
            if let NativeType::Struct(layout) = ty {
                if layout.fields().is_empty() {
                    return Err(LayoutError::EmptyStruct(layout.name().to_string()));
                }
            }
            ty.resolve(platform)
        };
        Ok(Self {
            params: params.iter().map(resolve).collect::<Result<_, _>>()?,
            ret: ret.as_ref().map(resolve).transpose()?,
            platform: *platform,
            narrowing: Narrowing::default(),
        })
    }

    pub fn with_narrowing(mut self, narrowing: Narrowing) -> Self {
        self.narrowing = narrowing;
        self
    }

    pub fn params(&self) -> &[AbiType] {
        &self.params
    }

    pub fn ret(&self) -> Option<&AbiType> {
        self.ret.as_ref()
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn narrowing(&self) -> Narrowing {
        self.narrowing
    }

    pub(crate) fn require_host(&self) -> Result<(), LayoutError> {
        if self.platform.is_host() {
            Ok(())
        } else {
            Err(LayoutError::ForeignPlatform(self.platform))
        }
    }

    /// Build the libffi call interface for this signature.
    pub(crate) fn cif(&self) -> Result<Cif, LayoutError> {
        self.require_host()?;
        let ret = self.ret.as_ref().map_or_else(Type::void, ffi_type);
        Ok(Cif::new(self.params.iter().map(ffi_type), ret))
    }

    /// Lift a scalar return value delivered as raw register bits.
    pub fn lift_return_bits(&self, bits: u64) -> Result<Option<Value>, MarshalError> {
        self.ret.as_ref().map(|abi| lift_bits(bits, abi)).transpose()
    }

    /// Lower a scalar return value to register bits, extended to the full
    /// register the way native callers expect.
    pub fn lower_return_bits(&self, value: &Value) -> Result<u64, MarshalError> {
        let Some(abi) = &self.ret else {
            return Err(MarshalError::TypeMismatch {
                expected: "void".to_string(),
                got: value.kind().to_string(),
            });
        };
        let bits = lower_bits(value, abi, self.narrowing)?;
        Ok(match abi.class() {
            AbiClass::Signed if abi.width() < 8 => {
                let shift = 64 - (abi.width() as u32) * 8;
                (((bits << shift) as i64) >> shift) as u64
            }
            _ => bits,
        })
    }

    /// Lift the return value libffi left in `buffer`.
    pub(crate) fn lift_return(&self, buffer: &Memory<'_>) -> Result<Option<Value>, MarshalError> {
        let Some(abi) = &self.ret else {
            return Ok(None);
        };
        let value = match abi.class() {
            AbiClass::Signed | AbiClass::Unsigned | AbiClass::Address
                if abi.width() < RETURN_REGISTER =>
            {
                let register = buffer.get::<usize>(0)?;
                lift_bits(register as u64, abi)?
            }
            _ => lift(buffer, 0, abi)?,
        };
        Ok(Some(value))
    }

    /// Store a return value where libffi expects it for a closure.
    pub(crate) fn lower_return(
        &self,
        buffer: &Memory<'_>,
        value: &Value,
    ) -> Result<(), MarshalError> {
        let Some(abi) = &self.ret else {
            return Ok(());
        };
        match abi.class() {
            AbiClass::Signed | AbiClass::Unsigned | AbiClass::Address
                if abi.width() < RETURN_REGISTER =>
            {
                let register = self.lower_return_bits(value)?;
                buffer.set(0, register as usize)?;
                Ok(())
            }
            _ => lower(buffer, 0, abi, value, self.narrowing),
        }
    }

    /// Size of the buffer libffi needs for the return value.
    pub(crate) fn return_buffer_size(&self) -> usize {
        self.ret
            .as_ref()
            .map_or(0, AbiType::width)
            .max(2 * RETURN_REGISTER)
    }
}

fn ffi_type(abi: &AbiType) -> Type {
    match abi.native() {
        NativeType::I8 => Type::i8(),
        NativeType::U8 => Type::u8(),
        NativeType::I16 => Type::i16(),
        NativeType::U16 => Type::u16(),
        NativeType::I32 => Type::i32(),
        NativeType::U32 => Type::u32(),
        NativeType::I64 => Type::i64(),
        NativeType::U64 => Type::u64(),
        NativeType::F32 => Type::f32(),
        NativeType::F64 => Type::f64(),
        NativeType::CLong if abi.width() == 4 => Type::i32(),
        NativeType::CLong => Type::i64(),
        NativeType::CULong if abi.width() == 4 => Type::u32(),
        NativeType::CULong => Type::u64(),
        NativeType::SizeT => Type::usize(),
        NativeType::PtrDiffT => Type::isize(),
        NativeType::Pointer => Type::pointer(),
        NativeType::Struct(layout) => {
            Type::structure(layout.fields().iter().map(|field| ffi_type(field.abi())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StructSchema;
    use std::sync::Arc;

    #[test]
    fn test_void_return() {
        let descriptor = CallDescriptor::new(&[], None).unwrap();
        assert_eq!(descriptor.lift_return_bits(42).unwrap(), None);
        assert!(descriptor.lower_return_bits(&Value::I32(1)).is_err());
    }

    #[test]
    fn test_signed_return_is_register_extended() {
        let descriptor = CallDescriptor::new(&[], Some(NativeType::I8)).unwrap();
        assert_eq!(
            descriptor.lower_return_bits(&Value::I8(-1)).unwrap(),
            u64::MAX
        );
        let unsigned = CallDescriptor::new(&[], Some(NativeType::U8)).unwrap();
        assert_eq!(unsigned.lower_return_bits(&Value::U8(0xFF)).unwrap(), 0xFF);
    }

    #[test]
    fn test_foreign_platform_cannot_build_cif() {
        let foreign = if Platform::host() == Platform::LLP64 {
            Platform::LP64
        } else {
            Platform::LLP64
        };
        let descriptor = CallDescriptor::for_platform(&[NativeType::CLong], None, &foreign).unwrap();
        assert!(matches!(
            descriptor.cif(),
            Err(LayoutError::ForeignPlatform(platform)) if platform == foreign
        ));
    }

    #[test]
    fn test_empty_struct_by_value_rejected() {
        let empty = Arc::new(StructSchema::new("empty").layout(&Platform::host()).unwrap());
        let err = CallDescriptor::new(&[empty.into_native_type()], None).unwrap_err();
        assert_eq!(err, LayoutError::EmptyStruct("empty".to_string()));
    }

    #[test]
    fn test_return_buffer_covers_register_pair() {
        let descriptor = CallDescriptor::new(&[], Some(NativeType::U8)).unwrap();
        assert!(descriptor.return_buffer_size() >= 2 * RETURN_REGISTER);
    }
}
