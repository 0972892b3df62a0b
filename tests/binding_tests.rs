//! Integration tests for library linking and struct binding.

mod common;

use schism_ffi::binding::{BindError, Declarations, NativeLibrary, StructType};
use schism_ffi::call::{CSizeT, CallDescriptor, Value};
use schism_ffi::layout::{NativeType, StructSchema};
use schism_ffi::memory::{Memory, NativeAddress};
use schism_ffi::platform::Platform;

use common::{LAYOUT_DECLARATIONS, LIBC_DECLARATIONS, write_temp};

#[test]
fn missing_library_names_the_library() {
    let err = NativeLibrary::open("definitely_not_a_real_library_name").unwrap_err();
    match err {
        BindError::LibraryNotFound { library, .. } => {
            assert_eq!(library, "definitely_not_a_real_library_name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[cfg(unix)]
#[test]
fn missing_symbol_fails_at_link_time() {
    let libc = NativeLibrary::open("").unwrap();
    let descriptor = CallDescriptor::new(&[], None).unwrap();
    let err = unsafe { libc.bind("definitely_not_a_real_symbol", descriptor) }.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("definitely_not_a_real_symbol"));
}

#[cfg(unix)]
#[test]
fn libc_functions_from_a_declaration_file() {
    let (_dir, path) = write_temp("libc.decl", LIBC_DECLARATIONS);
    let decls = Declarations::parse_file(&path, &Platform::host()).unwrap();
    let libc = NativeLibrary::open("").unwrap();
    let linked = unsafe { libc.link_declarations(&decls) }.unwrap();

    assert_eq!(
        linked.invoke("abs", &[Value::I32(-12)]).unwrap(),
        Some(Value::I32(12))
    );
    assert_eq!(
        linked.invoke("llabs", &[Value::I64(i64::MIN + 1)]).unwrap(),
        Some(Value::I64(i64::MAX))
    );

    let text = b"schism\0";
    let address = NativeAddress::from_ptr(text.as_ptr());
    assert_eq!(
        linked.invoke("strlen", &[Value::Address(address)]).unwrap(),
        Some(Value::U64(6))
    );
    assert_eq!(
        linked
            .function("strlen")
            .unwrap()
            .invoke(&[Value::Address(address)])
            .unwrap()
            .and_then(Value::get::<CSizeT>),
        Some(CSizeT(6))
    );
}

#[test]
fn parse_file_reports_missing_file_as_line_zero() {
    let err = Declarations::parse_file("/nonexistent/decls.txt", &Platform::host()).unwrap_err();
    assert!(matches!(err, BindError::Parse { line: 0, .. }));
}

#[test]
fn declared_struct_accessors() {
    let decls = Declarations::parse(LAYOUT_DECLARATIONS, &Platform::host()).unwrap();
    let header = decls.struct_type("header").unwrap();
    let length = header.accessor::<schism_ffi::call::CULong>("length").unwrap();

    let mut storage = header.allocate().unwrap();
    let instance = header.wrap(storage.memory_mut()).unwrap();
    instance.set("tag", &Value::U8(0xfe)).unwrap();
    length.set(&instance, schism_ffi::call::CULong(4096)).unwrap();
    instance.set("checksum", &Value::U16(0xbeef)).unwrap();

    assert_eq!(instance.get("tag").unwrap(), Value::U8(0xfe));
    assert_eq!(length.get(&instance).unwrap().0, 4096);
    assert_eq!(instance.get("checksum").unwrap(), Value::U16(0xbeef));

    let err = instance.set("checksum", &Value::U16(1)).and(instance.set("tag", &Value::U64(1)));
    assert!(err.unwrap_err().is_marshal());
    assert!(instance.get("missing").unwrap_err().is_bind());
}

#[test]
fn struct_arrays_use_struct_size_as_stride() {
    let ty = StructType::compile(
        &StructSchema::new("pair")
            .field("key", NativeType::U16)
            .field("value", NativeType::I32),
        &Platform::host(),
    )
    .unwrap();
    assert_eq!(ty.size(), 8);

    let mut storage = ty.allocate_array(3).unwrap();
    let array = ty.wrap_array(storage.memory_mut()).unwrap();
    assert_eq!(array.len(), 3);
    for (i, element) in array.iter().enumerate() {
        element.set("value", &Value::I32(i as i32 * 10)).unwrap();
    }
    let memory = *array.get(2).unwrap().memory();
    assert_eq!(memory.get::<i32>(4).unwrap(), 20);
    assert!(array.get(3).is_err());
}

#[test]
fn struct_passed_by_value_as_bytes() {
    let ty = StructType::compile(
        &StructSchema::new("rgb")
            .field("r", NativeType::U8)
            .field("g", NativeType::U8)
            .field("b", NativeType::U8),
        &Platform::host(),
    )
    .unwrap();
    let mut bytes = [1u8, 2, 3];
    let instance = ty.wrap(Memory::from_mut_slice(&mut bytes)).unwrap();
    assert_eq!(instance.to_value().unwrap(), Value::Struct(vec![1, 2, 3]));
}
