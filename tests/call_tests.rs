//! Integration tests for downcalls and upcalls.

use std::ffi::{c_long, c_ulong};

use schism_ffi::call::{CallDescriptor, CallError, Downcall, MarshalError, UpcallHandler, Value};
use schism_ffi::layout::NativeType;
use schism_ffi::FfiConfig;
use schism_ffi::memory::{MemoryError, NativeAddress};

extern "C" fn identity_i32(value: i32) -> i32 {
    value
}

extern "C" fn sum3(a: i64, b: i64, c: i64) -> i64 {
    a.wrapping_add(b).wrapping_add(c)
}

extern "C" fn identity_long(value: c_long) -> c_long {
    value
}

extern "C" fn identity_ulong(value: c_ulong) -> c_ulong {
    value
}

extern "C" fn identity_i8(value: i8) -> i8 {
    value
}

extern "C" fn weighted(a: u8, b: i16, c: f64) -> f64 {
    f64::from(a) + f64::from(b) * 2.0 + c
}

fn bind(name: &str, f: *const (), params: &[NativeType], ret: Option<NativeType>) -> Downcall {
    let descriptor = CallDescriptor::new(params, ret).unwrap();
    unsafe { Downcall::from_address(name, NativeAddress::from_ptr(f), descriptor) }.unwrap()
}

#[test]
fn int_identity_survives_extremes() {
    let f = bind(
        "identity_i32",
        identity_i32 as *const (),
        &[NativeType::I32],
        Some(NativeType::I32),
    );
    for value in [0, -1, i32::MAX, i32::MIN] {
        assert_eq!(f.invoke(&[Value::I32(value)]).unwrap(), Some(Value::I32(value)));
    }
}

#[test]
fn long_identity_survives_extremes() {
    let f = bind(
        "identity_long",
        identity_long as *const (),
        &[NativeType::CLong],
        Some(NativeType::CLong),
    );
    for value in [0, -1, 1, i64::from(c_long::MAX), i64::from(c_long::MIN)] {
        assert_eq!(f.invoke(&[Value::I64(value)]).unwrap(), Some(Value::I64(value)));
    }
}

#[test]
fn unsigned_long_identity_survives_extremes() {
    let f = bind(
        "identity_ulong",
        identity_ulong as *const (),
        &[NativeType::CULong],
        Some(NativeType::CULong),
    );
    for value in [0, 1, u64::from(c_ulong::MAX)] {
        assert_eq!(f.invoke(&[Value::U64(value)]).unwrap(), Some(Value::U64(value)));
    }
}

#[test]
fn narrow_signed_return_is_sign_extended() {
    let f = bind(
        "identity_i8",
        identity_i8 as *const (),
        &[NativeType::I8],
        Some(NativeType::I8),
    );
    assert_eq!(f.invoke(&[Value::I8(-128)]).unwrap(), Some(Value::I8(-128)));
    assert_eq!(f.invoke(&[Value::I8(127)]).unwrap(), Some(Value::I8(127)));
}

#[test]
fn mixed_arguments_are_passed_in_order() {
    let f = bind(
        "weighted",
        weighted as *const (),
        &[NativeType::U8, NativeType::I16, NativeType::F64],
        Some(NativeType::F64),
    );
    let result = f
        .invoke(&[Value::U8(1), Value::I16(-3), Value::F64(0.5)])
        .unwrap();
    assert_eq!(result, Some(Value::F64(-4.5)));
}

#[test]
fn out_of_range_argument_is_rejected_before_the_call() {
    let f = bind(
        "identity_i8",
        identity_i8 as *const (),
        &[NativeType::I8],
        Some(NativeType::I8),
    );
    let err = f.invoke(&[Value::I32(1)]).unwrap_err();
    assert!(matches!(
        err,
        CallError::Argument {
            index: 0,
            source: MarshalError::TypeMismatch { .. },
            ..
        }
    ));
}

#[test]
fn configured_stack_backs_the_call() {
    let f = bind(
        "sum3",
        sum3 as *const (),
        &[NativeType::I64, NativeType::I64, NativeType::I64],
        Some(NativeType::I64),
    );
    let args = [Value::I64(1), Value::I64(2), Value::I64(3)];

    let roomy = FfiConfig::default().with_memory_stack(1024, 16).memory_stack().unwrap();
    let result = roomy.with_frame(|frame| f.invoke_in(frame, &args)).unwrap();
    assert_eq!(result, Some(Value::I64(6)));

    let tiny = FfiConfig::default().with_memory_stack(8, 8).memory_stack().unwrap();
    let err = tiny.with_frame(|frame| f.invoke_in(frame, &args)).unwrap_err();
    assert!(matches!(
        err,
        CallError::Scratch {
            source: MemoryError::StackExhausted { .. },
            ..
        }
    ));
}

#[test]
fn upcall_round_trips_through_a_downcall() {
    let descriptor =
        CallDescriptor::new(&[NativeType::CLong, NativeType::I32], Some(NativeType::CLong))
            .unwrap();
    let handler = UpcallHandler::new("sum", descriptor.clone(), |args| match args {
        [Value::I64(a), Value::I32(b)] => Some(Value::I64(a + i64::from(*b))),
        _ => None,
    })
    .unwrap();
    let upcall = handler.bind().unwrap();

    let downcall = unsafe { Downcall::from_address("sum", upcall.address(), descriptor) }.unwrap();
    assert_eq!(
        downcall.invoke(&[Value::I64(-40), Value::I32(-2)]).unwrap(),
        Some(Value::I64(-42))
    );
}

#[test]
fn void_upcall_runs_for_side_effects() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};

    let seen = Arc::new(AtomicI32::new(0));
    let sink = Arc::clone(&seen);
    let descriptor = CallDescriptor::new(&[NativeType::I32], None).unwrap();
    let handler = UpcallHandler::new("record", descriptor, move |args| {
        if let [Value::I32(v)] = args {
            sink.store(*v, Ordering::SeqCst);
        }
        None
    })
    .unwrap();
    let upcall = handler.bind().unwrap();
    let record: extern "C" fn(i32) = unsafe { upcall.as_fn() };
    record(7);
    assert_eq!(seen.load(Ordering::SeqCst), 7);
}
