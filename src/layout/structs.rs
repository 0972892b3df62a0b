//! C struct layout: forward-aligned fields with trailing padding.

use std::collections::HashSet;
use std::sync::Arc;

use super::{AbiType, LayoutError, NativeType};
use crate::memory::align::align_forward;
use crate::platform::Platform;

/// A field as declared: name, declaration slot and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    name: String,
    index: usize,
    ty: NativeType,
}

impl FieldDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ty(&self) -> &NativeType {
        &self.ty
    }
}

/// Field declarations of a struct, before layout.
///
/// Fields are laid out by declaration slot. [`StructSchema::field`] takes
/// the next free slot; [`StructSchema::field_at`] claims an explicit one.
/// Slots must form `0..n` with no collisions.
///
/// # Example
///
/// ```rust
/// use schism_ffi::layout::{NativeType, StructSchema};
/// use schism_ffi::platform::Platform;
///
/// let layout = StructSchema::new("mixed")
///     .field("a", NativeType::I8)
///     .field("b", NativeType::I32)
///     .field("c", NativeType::I16)
///     .field("d", NativeType::I64)
///     .layout(&Platform::LP64)?;
/// assert_eq!(layout.offsets(), vec![0, 4, 8, 16]);
/// assert_eq!((layout.size(), layout.alignment()), (24, 8));
/// # Ok::<(), schism_ffi::layout::LayoutError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructSchema {
    name: String,
    fields: Vec<FieldDecl>,
    next_index: usize,
}

impl StructSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            next_index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    /// Append a field in the next declaration slot.
    pub fn field(self, name: impl Into<String>, ty: NativeType) -> Self {
        let index = self.next_index;
        self.field_at(index, name, ty)
    }

    /// Declare a field in an explicit slot.
    pub fn field_at(mut self, index: usize, name: impl Into<String>, ty: NativeType) -> Self {
        self.push(index, name.into(), ty);
        self
    }

    pub(crate) fn push(&mut self, index: usize, name: String, ty: NativeType) {
        self.next_index = self.next_index.max(index.saturating_add(1));
        self.fields.push(FieldDecl { name, index, ty });
    }

    /// Compute the layout for `platform`.
    pub fn layout(&self, platform: &Platform) -> Result<StructLayout, LayoutError> {
        StructLayout::compute(self, platform)
    }
}

/// A field after layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    name: String,
    offset: usize,
    abi: AbiType,
}

impl FieldLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset from the start of the struct.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn abi(&self) -> &AbiType {
        &self.abi
    }
}

/// The computed size, alignment and field offsets of a struct on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    name: String,
    size: usize,
    alignment: usize,
    platform: Platform,
    fields: Vec<FieldLayout>,
}

impl StructLayout {
    fn compute(schema: &StructSchema, platform: &Platform) -> Result<Self, LayoutError> {
        let structure = schema.name();
        let mut ordered: Vec<&FieldDecl> = schema.fields.iter().collect();
        ordered.sort_by_key(|field| field.index);

        let mut names = HashSet::new();
        let mut previous: Option<&FieldDecl> = None;
        for (expected, field) in ordered.iter().enumerate() {
            if let Some(prior) = previous.filter(|prior| prior.index == field.index) {
                return Err(LayoutError::FieldIndexCollision {
                    structure: structure.to_string(),
                    index: field.index,
                    first: prior.name.clone(),
                    second: field.name.clone(),
                });
            }
            if field.index != expected {
                return Err(LayoutError::MissingFieldIndex {
                    structure: structure.to_string(),
                    index: expected,
                });
            }
            if !names.insert(field.name.as_str()) {
                return Err(LayoutError::DuplicateField {
                    structure: structure.to_string(),
                    field: field.name.clone(),
                });
            }
            previous = Some(*field);
        }

        let overflow = || LayoutError::SizeOverflow(structure.to_string());
        let mut size = 0usize;
        let mut alignment = 1usize;
        let mut fields = Vec::with_capacity(ordered.len());
        for field in ordered {
            if let NativeType::Struct(nested) = &field.ty {
                if nested.size() == 0 {
                    return Err(LayoutError::EmptyStruct(nested.name().to_string()));
                }
            }
            let abi = field.ty.resolve(platform)?;
            let offset = align_forward(size, abi.alignment()).ok_or_else(overflow)?;
            size = offset.checked_add(abi.width()).ok_or_else(overflow)?;
            alignment = alignment.max(abi.alignment());
            fields.push(FieldLayout {
                name: field.name.clone(),
                offset,
                abi,
            });
        }
        let size = align_forward(size, alignment).ok_or_else(overflow)?;

        Ok(Self {
            name: structure.to_string(),
            size,
            alignment,
            platform: *platform,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, a multiple of the alignment.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.fields.iter().map(FieldLayout::offset).collect()
    }

    /// Offset of element `index` in an array of this struct.
    pub fn element_offset(&self, index: usize) -> Option<usize> {
        index.checked_mul(self.size)
    }

    /// Embed this layout by value in another struct or signature.
    pub fn into_native_type(self: Arc<Self>) -> NativeType {
        NativeType::Struct(self)
    }
}
