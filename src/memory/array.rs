//! Homogeneous scalar arrays over a memory view.

use std::marker::PhantomData;

use super::{ByteOrder, Memory, MemoryError, Scalar};

/// A view of consecutive `T` values.
///
/// The length is `memory.size() / T::SIZE`; trailing bytes that do not make
/// up a whole element are not addressable.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a, T: Scalar> {
    memory: Memory<'a>,
    order: ByteOrder,
    _element: PhantomData<fn() -> T>,
}

impl<'a, T: Scalar> ArrayView<'a, T> {
    pub(crate) fn new(memory: Memory<'a>) -> Self {
        Self {
            memory,
            order: ByteOrder::Native,
            _element: PhantomData,
        }
    }

    /// Use a fixed byte order for every element.
    pub fn with_order(self, order: ByteOrder) -> Self {
        Self { order, ..self }
    }

    pub fn len(&self) -> usize {
        self.memory.size() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn offset(&self, index: usize) -> Result<usize, MemoryError> {
        match index.checked_mul(T::SIZE) {
            Some(offset) if index < self.len() => Ok(offset),
            _ => Err(MemoryError::OutOfBounds {
                offset: index.saturating_mul(T::SIZE),
                width: T::SIZE,
                size: self.memory.size(),
            }),
        }
    }

    pub fn get(&self, index: usize) -> Result<T, MemoryError> {
        let offset = self.offset(index)?;
        self.memory.get_in(offset, self.order)
    }

    pub fn set(&self, index: usize, value: T) -> Result<(), MemoryError> {
        let offset = self.offset(index)?;
        self.memory.set_in(offset, value, self.order)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<T, MemoryError>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    pub fn to_vec(&self) -> Result<Vec<T>, MemoryError> {
        self.iter().collect()
    }
}
