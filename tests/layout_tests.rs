//! Integration tests for struct layout across platforms.

mod common;

use proptest::prelude::*;
use schism_ffi::binding::{BindError, Declarations, StructType};
use schism_ffi::layout::{LayoutError, NativeType, StructSchema};
use schism_ffi::platform::Platform;

use common::LAYOUT_DECLARATIONS;

fn layout_of(platform: Platform, name: &str) -> (usize, usize, Vec<usize>) {
    let decls = Declarations::parse(LAYOUT_DECLARATIONS, &platform).unwrap();
    let layout = decls.struct_layout(name).unwrap();
    (layout.size(), layout.alignment(), layout.offsets())
}

#[test]
fn header_follows_long_width() {
    assert_eq!(layout_of(Platform::LP64, "header"), (24, 8, vec![0, 8, 16]));
    assert_eq!(layout_of(Platform::LLP64, "header"), (12, 4, vec![0, 4, 8]));
    assert_eq!(layout_of(Platform::ILP32, "header"), (12, 4, vec![0, 4, 8]));
}

#[test]
fn nested_struct_contributes_its_size_and_alignment() {
    assert_eq!(layout_of(Platform::LP64, "packet"), (40, 8, vec![0, 24, 32]));
    assert_eq!(layout_of(Platform::LLP64, "packet"), (32, 8, vec![0, 16, 24]));
    assert_eq!(layout_of(Platform::ILP32, "packet"), (20, 4, vec![0, 12, 16]));
}

#[test]
fn size_is_a_multiple_of_alignment() {
    for platform in [Platform::LP64, Platform::LLP64, Platform::ILP32] {
        let decls = Declarations::parse(LAYOUT_DECLARATIONS, &platform).unwrap();
        for layout in decls.structs() {
            assert_eq!(layout.size() % layout.alignment(), 0, "{}", layout.name());
            for field in layout.fields() {
                assert_eq!(field.offset() % field.abi().alignment(), 0);
            }
        }
    }
}

#[test]
fn foreign_nested_struct_is_rejected() {
    let inner = StructType::compile(
        &StructSchema::new("inner").field("v", NativeType::CLong),
        &Platform::LLP64,
    )
    .unwrap();
    let err = StructSchema::new("outer")
        .field("inner", inner.native_type())
        .layout(&Platform::LP64)
        .unwrap_err();
    assert!(matches!(err, LayoutError::PlatformMismatch { .. }));
}

#[test]
fn explicit_slots_define_order() {
    let layout = StructSchema::new("slots")
        .field_at(1, "wide", NativeType::F64)
        .field_at(0, "narrow", NativeType::U8)
        .layout(&Platform::LP64)
        .unwrap();
    assert_eq!(layout.fields().first().unwrap().name(), "narrow");
    assert_eq!(layout.offsets(), vec![0, 8]);
    assert_eq!(layout.size(), 16);
}

#[test]
fn slot_collision_is_a_bind_time_failure() {
    let schema = StructSchema::new("clash")
        .field_at(0, "a", NativeType::I32)
        .field_at(0, "b", NativeType::I32);
    let err = StructType::compile(&schema, &Platform::host()).unwrap_err();
    assert!(err.to_string().contains("clash"));
}

#[test]
fn empty_struct_is_rejected_when_embedded() {
    let source = "struct empty { }\nstruct outer { e: struct empty, x: i32 }";
    let err = Declarations::parse(source, &Platform::host()).unwrap_err();
    assert!(matches!(
        err,
        BindError::Layout(LayoutError::EmptyStruct(ref name)) if name == "empty"
    ));
}

fn reordered_fields() -> impl Strategy<Value = Vec<NativeType>> {
    Just(vec![NativeType::U8, NativeType::U32, NativeType::U16, NativeType::I64]).prop_shuffle()
}

proptest! {
    #[test]
    fn reordering_keeps_alignment_and_never_beats_packed_size(
        fields in reordered_fields(),
        platform in prop_oneof![Just(Platform::LP64), Just(Platform::LLP64), Just(Platform::ILP32)],
    ) {
        let schema = fields
            .iter()
            .enumerate()
            .fold(StructSchema::new("shuffled"), |schema, (i, ty)| {
                schema.field(format!("f{i}"), ty.clone())
            });
        let layout = schema.layout(&platform).unwrap();

        let alignment = fields
            .iter()
            .map(|ty| ty.resolve(&platform).unwrap().alignment())
            .max()
            .unwrap();
        let packed: usize = fields
            .iter()
            .map(|ty| ty.resolve(&platform).unwrap().width())
            .sum();
        let minimum = packed.div_ceil(alignment) * alignment;

        prop_assert_eq!(layout.alignment(), alignment);
        prop_assert!(layout.size() >= minimum);
        prop_assert_eq!(layout.size() % alignment, 0);
    }
}
