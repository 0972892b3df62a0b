//! Lowering managed values to native bytes and lifting them back.
//!
//! Lifting applies the type's [`Extension`]: a 4-byte `long` holding
//! `0xFFFF_FFFF` lifts to `-1`, a 4-byte `unsigned long` to `4294967295`.
//! Lowering into a narrower native width follows a [`Narrowing`] policy.

use super::{MarshalError, Value};
use crate::layout::{AbiClass, AbiType, Extension, ManagedKind};
use crate::memory::{Memory, NativeAddress};

/// What happens when a managed value does not fit its native width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Narrowing {
    /// Fail with [`MarshalError::OutOfRange`].
    #[default]
    Checked,
    /// Keep the low bytes (two's-complement truncation).
    Wrap,
}

fn mask(bits: u64, width: usize) -> u64 {
    if width >= 8 {
        bits
    } else {
        bits & ((1u64 << (width * 8)) - 1)
    }
}

fn sign_extend(bits: u64, width: usize) -> u64 {
    let shift = 64 - (width.min(8) as u32) * 8;
    (((bits << shift) as i64) >> shift) as u64
}

fn fits(value: i128, width: usize, class: AbiClass) -> bool {
    if width >= 16 {
        return true;
    }
    let bits = (width * 8) as u32;
    match class {
        AbiClass::Signed => {
            let limit = 1i128 << (bits - 1);
            (-limit..limit).contains(&value)
        }
        _ => (0..(1i128 << bits)).contains(&value),
    }
}

fn mismatch(abi: &AbiType, value: &Value) -> MarshalError {
    MarshalError::TypeMismatch {
        expected: format!("{} ({})", abi.native(), abi.managed_kind()),
        got: value.kind().to_string(),
    }
}

/// Lower a scalar to the raw bits of its native representation.
///
/// The result holds the native value in its low `abi.width()` bytes.
pub fn lower_bits(value: &Value, abi: &AbiType, narrowing: Narrowing) -> Result<u64, MarshalError> {
    if value.kind() != abi.managed_kind() {
        return Err(mismatch(abi, value));
    }
    let integer = match value {
        Value::F32(v) => return Ok(u64::from(v.to_bits())),
        Value::F64(v) => return Ok(v.to_bits()),
        other => other.as_i128().ok_or_else(|| mismatch(abi, value))?,
    };
    if narrowing == Narrowing::Checked && !fits(integer, abi.width(), abi.class()) {
        return Err(MarshalError::OutOfRange {
            value: integer,
            ty: abi.native().to_string(),
            width: abi.width(),
        });
    }
    Ok(mask(integer as u64, abi.width()))
}

/// Lift the low `abi.width()` bytes of `bits` into a managed scalar.
pub fn lift_bits(bits: u64, abi: &AbiType) -> Result<Value, MarshalError> {
    let width = abi.width();
    let raw = mask(bits, width);
    let widened = match abi.extension() {
        Extension::Sign => sign_extend(raw, width),
        Extension::Zero | Extension::None => raw,
    };
    let value = match abi.managed_kind() {
        ManagedKind::I8 => Value::I8(widened as i8),
        ManagedKind::U8 => Value::U8(widened as u8),
        ManagedKind::I16 => Value::I16(widened as i16),
        ManagedKind::U16 => Value::U16(widened as u16),
        ManagedKind::I32 => Value::I32(widened as i32),
        ManagedKind::U32 => Value::U32(widened as u32),
        ManagedKind::I64 => Value::I64(widened as i64),
        ManagedKind::U64 => Value::U64(widened),
        ManagedKind::F32 => Value::F32(f32::from_bits(widened as u32)),
        ManagedKind::F64 => Value::F64(f64::from_bits(widened)),
        ManagedKind::Address => {
            let bits = usize::try_from(widened).map_err(|_| MarshalError::OutOfRange {
                value: i128::from(widened),
                ty: abi.native().to_string(),
                width: NativeAddress::BYTE_SIZE,
            })?;
            Value::Address(NativeAddress::from_bits(bits))
        }
        ManagedKind::Struct => {
            return Err(MarshalError::TypeMismatch {
                expected: "scalar".to_string(),
                got: abi.native().to_string(),
            });
        }
    };
    Ok(value)
}

fn read_uint(memory: &Memory<'_>, offset: usize, width: usize) -> Result<u64, MarshalError> {
    let bits = match width {
        1 => u64::from(memory.get::<u8>(offset)?),
        2 => u64::from(memory.get::<u16>(offset)?),
        4 => u64::from(memory.get::<u32>(offset)?),
        8 => memory.get::<u64>(offset)?,
        other => return Err(MarshalError::UnsupportedWidth(other)),
    };
    Ok(bits)
}

fn write_uint(
    memory: &Memory<'_>,
    offset: usize,
    width: usize,
    bits: u64,
) -> Result<(), MarshalError> {
    match width {
        1 => memory.set(offset, bits as u8)?,
        2 => memory.set(offset, bits as u16)?,
        4 => memory.set(offset, bits as u32)?,
        8 => memory.set(offset, bits)?,
        other => return Err(MarshalError::UnsupportedWidth(other)),
    }
    Ok(())
}

/// Read the native value of type `abi` at `offset` and lift it.
pub fn lift(memory: &Memory<'_>, offset: usize, abi: &AbiType) -> Result<Value, MarshalError> {
    if abi.class() == AbiClass::Struct {
        let mut bytes = vec![0u8; abi.width()];
        memory.read_bytes(offset, &mut bytes)?;
        return Ok(Value::Struct(bytes));
    }
    lift_bits(read_uint(memory, offset, abi.width())?, abi)
}

/// Lower `value` and write it as type `abi` at `offset`.
///
/// Nothing is written unless the whole conversion succeeds.
pub fn lower(
    memory: &Memory<'_>,
    offset: usize,
    abi: &AbiType,
    value: &Value,
    narrowing: Narrowing,
) -> Result<(), MarshalError> {
    if let Value::Struct(bytes) = value {
        if abi.class() != AbiClass::Struct {
            return Err(mismatch(abi, value));
        }
        if bytes.len() != abi.width() {
            return Err(MarshalError::TypeMismatch {
                expected: format!("{} ({} bytes)", abi.native(), abi.width()),
                got: format!("{} bytes", bytes.len()),
            });
        }
        memory.write_bytes(offset, bytes)?;
        return Ok(());
    }
    let bits = lower_bits(value, abi, narrowing)?;
    write_uint(memory, offset, abi.width(), bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::NativeType;
    use crate::platform::Platform;

    fn abi(ty: NativeType, platform: Platform) -> AbiType {
        ty.resolve(&platform).unwrap()
    }

    #[test]
    fn test_four_byte_long_extension() {
        let long = abi(NativeType::CLong, Platform::LLP64);
        let ulong = abi(NativeType::CULong, Platform::LLP64);
        assert_eq!(lift_bits(0xFFFF_FFFF, &long).unwrap(), Value::I64(-1));
        assert_eq!(
            lift_bits(0xFFFF_FFFF, &ulong).unwrap(),
            Value::U64(4_294_967_295)
        );
    }

    #[test]
    fn test_eight_byte_long_is_identity() {
        let long = abi(NativeType::CLong, Platform::LP64);
        assert_eq!(lift_bits(0xFFFF_FFFF, &long).unwrap(), Value::I64(0xFFFF_FFFF));
    }

    #[test]
    fn test_checked_narrowing() {
        let long = abi(NativeType::CLong, Platform::LLP64);
        let err = lower_bits(&Value::I64(1 << 40), &long, Narrowing::Checked).unwrap_err();
        assert!(matches!(err, MarshalError::OutOfRange { width: 4, .. }));
        assert_eq!(
            lower_bits(&Value::I64(-1), &long, Narrowing::Checked).unwrap(),
            0xFFFF_FFFF
        );
        assert_eq!(
            lower_bits(&Value::I64(i64::from(i32::MIN)), &long, Narrowing::Checked).unwrap(),
            0x8000_0000
        );
    }

    #[test]
    fn test_wrap_narrowing() {
        let size = abi(NativeType::SizeT, Platform::ILP32);
        let bits = lower_bits(&Value::U64(0x1_0000_0002), &size, Narrowing::Wrap).unwrap();
        assert_eq!(bits, 2);
    }

    #[test]
    fn test_type_mismatch() {
        let int = abi(NativeType::I32, Platform::LP64);
        let err = lower_bits(&Value::I64(1), &int, Narrowing::Checked).unwrap_err();
        assert_eq!(
            err,
            MarshalError::TypeMismatch {
                expected: "int32_t (i32)".to_string(),
                got: "i64".to_string(),
            }
        );
    }

    #[test]
    fn test_memory_round_trip_with_extension() {
        let mut bytes = [0u8; 8];
        let memory = Memory::from_mut_slice(&mut bytes);
        let long = abi(NativeType::CLong, Platform::LLP64);
        lower(&memory, 4, &long, &Value::I64(-7), Narrowing::Checked).unwrap();
        assert_eq!(lift(&memory, 4, &long).unwrap(), Value::I64(-7));
        assert_eq!(memory.get::<i32>(4).unwrap(), -7);
        assert_eq!(memory.get::<u32>(0).unwrap(), 0);
    }

    #[test]
    fn test_failed_lower_writes_nothing() {
        let mut bytes = [0xAAu8; 4];
        let memory = Memory::from_mut_slice(&mut bytes);
        let int = abi(NativeType::U16, Platform::LP64);
        assert!(lower(&memory, 3, &int, &Value::U16(1), Narrowing::Checked).is_err());
        let long = abi(NativeType::CLong, Platform::LLP64);
        assert!(lower(&memory, 0, &long, &Value::I64(i64::MAX), Narrowing::Checked).is_err());
        assert_eq!(bytes, [0xAA; 4]);
    }

    #[test]
    fn test_floats() {
        let double = abi(NativeType::F64, Platform::LP64);
        let bits = lower_bits(&Value::F64(2.5), &double, Narrowing::Checked).unwrap();
        assert_eq!(lift_bits(bits, &double).unwrap(), Value::F64(2.5));
    }
}
