//! Compiled struct types and typed field access over native memory.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::BindError;
use crate::call::marshal::{lift, lower};
use crate::call::{Managed, MarshalError, Narrowing, Value};
use crate::layout::{AbiType, FieldLayout, ManagedKind, NativeType, StructLayout, StructSchema};
use crate::logging::{debug, info};
use crate::memory::{Memory, MemoryError, NativeAllocation};
use crate::platform::Platform;

/// A struct whose layout has been computed for one platform.
///
/// Every failure (unknown type, slot collision, nested platform mismatch) is
/// reported by [`StructType::compile`], before any instance exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    layout: Arc<StructLayout>,
    narrowing: Narrowing,
}

impl StructType {
    pub fn compile(schema: &StructSchema, platform: &Platform) -> Result<Self, BindError> {
        let layout = schema.layout(platform)?;
        info!(
            structure = layout.name(),
            size = layout.size(),
            alignment = layout.alignment(),
            fields = layout.fields().len(),
            "compiled struct layout"
        );
        Ok(Self::from_layout(Arc::new(layout)))
    }

    pub fn from_layout(layout: Arc<StructLayout>) -> Self {
        Self {
            layout,
            narrowing: Narrowing::default(),
        }
    }

    /// Set the policy used when field writes narrow a managed value.
    pub fn with_narrowing(mut self, narrowing: Narrowing) -> Self {
        self.narrowing = narrowing;
        self
    }

    pub fn layout(&self) -> &Arc<StructLayout> {
        &self.layout
    }

    pub fn name(&self) -> &str {
        self.layout.name()
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn alignment(&self) -> usize {
        self.layout.alignment()
    }

    pub fn narrowing(&self) -> Narrowing {
        self.narrowing
    }

    /// This struct as a by-value type for signatures and nested fields.
    pub fn native_type(&self) -> NativeType {
        NativeType::Struct(Arc::clone(&self.layout))
    }

    /// View `memory` as one instance.
    ///
    /// The memory must be exactly [`StructType::size`] bytes and, when
    /// native, aligned to [`StructType::alignment`].
    pub fn wrap<'m>(&self, memory: Memory<'m>) -> Result<Struct<'m>, MemoryError> {
        if memory.size() != self.size() {
            return Err(MemoryError::SizeMismatch {
                expected: self.size(),
                actual: memory.size(),
            });
        }
        memory.require_aligned_to(self.alignment())?;
        Ok(Struct {
            ty: self.clone(),
            memory,
        })
    }

    /// View `memory` as consecutive instances. A trailing partial element is
    /// ignored.
    pub fn wrap_array<'m>(&self, memory: Memory<'m>) -> Result<StructArray<'m>, MemoryError> {
        memory.require_aligned_to(self.alignment())?;
        Ok(StructArray {
            ty: self.clone(),
            memory,
        })
    }

    /// Allocate zeroed native memory for one instance.
    pub fn allocate(&self) -> Result<NativeAllocation, MemoryError> {
        NativeAllocation::new(self.size(), self.alignment())
    }

    /// Allocate zeroed native memory for `count` instances.
    pub fn allocate_array(&self, count: usize) -> Result<NativeAllocation, MemoryError> {
        let size = self
            .size()
            .checked_mul(count)
            .ok_or(MemoryError::AllocationFailed {
                size: usize::MAX,
                alignment: self.alignment(),
            })?;
        NativeAllocation::new(size, self.alignment())
    }

    fn require_field(&self, name: &str) -> Result<&FieldLayout, BindError> {
        self.layout.field(name).ok_or_else(|| BindError::UnknownField {
            structure: self.name().to_string(),
            field: name.to_string(),
        })
    }

    /// A typed accessor for one field, checked once here.
    pub fn accessor<T: Managed>(&self, field: &str) -> Result<FieldAccessor<T>, BindError> {
        let layout = self.require_field(field)?;
        let expected = layout.abi().managed_kind();
        if expected != T::KIND {
            return Err(BindError::AccessorMismatch {
                structure: self.name().to_string(),
                field: field.to_string(),
                expected,
                requested: T::KIND,
            });
        }
        debug!(structure = self.name(), field, offset = layout.offset(), "created field accessor");
        Ok(FieldAccessor {
            structure: Arc::clone(&self.layout),
            field: field.to_string(),
            offset: layout.offset(),
            abi: layout.abi().clone(),
            narrowing: self.narrowing,
            _managed: PhantomData,
        })
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "struct {} (size {}, alignment {})",
            self.name(),
            self.size(),
            self.alignment()
        )?;
        for field in self.layout.fields() {
            writeln!(
                f,
                "  {:>4}  {}: {}",
                field.offset(),
                field.name(),
                field.abi().native()
            )?;
        }
        Ok(())
    }
}

/// One struct instance over a [`Memory`] view.
#[derive(Debug, Clone)]
pub struct Struct<'m> {
    ty: StructType,
    memory: Memory<'m>,
}

impl<'m> Struct<'m> {
    pub fn ty(&self) -> &StructType {
        &self.ty
    }

    pub fn memory(&self) -> &Memory<'m> {
        &self.memory
    }

    /// The memory of one field.
    pub fn field(&self, name: &str) -> crate::Result<Memory<'m>> {
        let layout = self.ty.require_field(name)?;
        Ok(self.memory.slice(layout.offset(), layout.abi().width())?)
    }

    /// Read a field as a managed value.
    pub fn get(&self, name: &str) -> crate::Result<Value> {
        let layout = self.ty.require_field(name)?;
        Ok(lift(&self.memory, layout.offset(), layout.abi())?)
    }

    /// Write a field. Nothing is written if the value does not fit.
    pub fn set(&self, name: &str, value: &Value) -> crate::Result<()> {
        let layout = self.ty.require_field(name)?;
        lower(
            &self.memory,
            layout.offset(),
            layout.abi(),
            value,
            self.ty.narrowing,
        )?;
        Ok(())
    }

    /// A view of a nested struct field.
    pub fn get_struct(&self, name: &str) -> crate::Result<Struct<'m>> {
        let layout = self.ty.require_field(name)?;
        let NativeType::Struct(nested) = layout.abi().native() else {
            return Err(BindError::AccessorMismatch {
                structure: self.ty.name().to_string(),
                field: name.to_string(),
                expected: layout.abi().managed_kind(),
                requested: ManagedKind::Struct,
            }
            .into());
        };
        let ty = StructType::from_layout(Arc::clone(nested)).with_narrowing(self.ty.narrowing);
        let memory = self.memory.slice(layout.offset(), nested.size())?;
        Ok(Struct { ty, memory })
    }

    /// The instance's bytes, as passed by value.
    pub fn to_value(&self) -> Result<Value, MemoryError> {
        self.memory.to_vec().map(Value::Struct)
    }
}

/// A field accessor with its offset and type resolved at bind time.
#[derive(Debug, Clone)]
pub struct FieldAccessor<T> {
    structure: Arc<StructLayout>,
    field: String,
    offset: usize,
    abi: AbiType,
    narrowing: Narrowing,
    _managed: PhantomData<fn() -> T>,
}

impl<T: Managed> FieldAccessor<T> {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn check(&self, instance: &Struct<'_>) -> Result<(), MarshalError> {
        let layout = instance.ty.layout();
        if Arc::ptr_eq(layout, &self.structure) || **layout == *self.structure {
            Ok(())
        } else {
            Err(MarshalError::TypeMismatch {
                expected: format!("struct {}", self.structure.name()),
                got: format!("struct {}", layout.name()),
            })
        }
    }

    pub fn get(&self, instance: &Struct<'_>) -> Result<T, MarshalError> {
        self.check(instance)?;
        let value = lift(&instance.memory, self.offset, &self.abi)?;
        let got = value.kind().to_string();
        T::from_value(value).ok_or_else(|| MarshalError::TypeMismatch {
            expected: T::KIND.to_string(),
            got,
        })
    }

    pub fn set(&self, instance: &Struct<'_>, value: T) -> Result<(), MarshalError> {
        self.check(instance)?;
        lower(
            &instance.memory,
            self.offset,
            &self.abi,
            &value.into_value(),
            self.narrowing,
        )
    }
}

/// Consecutive struct instances with a stride of the struct size.
#[derive(Debug, Clone)]
pub struct StructArray<'m> {
    ty: StructType,
    memory: Memory<'m>,
}

impl<'m> StructArray<'m> {
    pub fn ty(&self) -> &StructType {
        &self.ty
    }

    pub fn len(&self) -> usize {
        match self.ty.size() {
            0 => 0,
            size => self.memory.size() / size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `index`; out of range is a bounds error.
    pub fn get(&self, index: usize) -> Result<Struct<'m>, MemoryError> {
        let size = self.ty.size();
        let out_of_bounds = MemoryError::OutOfBounds {
            offset: index.saturating_mul(size),
            width: size,
            size: self.len().saturating_mul(size),
        };
        if index >= self.len() {
            return Err(out_of_bounds);
        }
        let offset = index.checked_mul(size).ok_or(out_of_bounds)?;
        Ok(Struct {
            ty: self.ty.clone(),
            memory: self.memory.slice(offset, size)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Struct<'m>> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index).ok())
    }
}
