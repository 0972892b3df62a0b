//! Sequential writer over a memory view.

use super::{ByteOrder, Memory, MemoryError, Scalar};

/// Writes scalars one after another, advancing a position.
///
/// A put that does not fit fails with [`MemoryError::Overflow`] and leaves
/// both the position and the memory unchanged.
#[derive(Debug)]
pub struct Encoder<'a> {
    memory: Memory<'a>,
    position: usize,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(memory: Memory<'a>) -> Self {
        Self {
            memory,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.memory.size() - self.position
    }

    pub fn memory(&self) -> Memory<'a> {
        self.memory
    }

    /// Claim `width` bytes, returning the offset where they start.
    fn claim(&self, width: usize) -> Result<usize, MemoryError> {
        if width <= self.remaining() {
            Ok(self.position)
        } else {
            Err(MemoryError::Overflow {
                position: self.position,
                width,
                size: self.memory.size(),
            })
        }
    }

    /// Advance without writing.
    pub fn skip(&mut self, count: usize) -> Result<(), MemoryError> {
        let start = self.claim(count)?;
        self.position = start + count;
        Ok(())
    }

    pub fn put<T: Scalar>(&mut self, value: T) -> Result<(), MemoryError> {
        self.put_in(value, ByteOrder::Native)
    }

    pub fn put_le<T: Scalar>(&mut self, value: T) -> Result<(), MemoryError> {
        self.put_in(value, ByteOrder::Little)
    }

    pub fn put_be<T: Scalar>(&mut self, value: T) -> Result<(), MemoryError> {
        self.put_in(value, ByteOrder::Big)
    }

    pub fn put_in<T: Scalar>(&mut self, value: T, order: ByteOrder) -> Result<(), MemoryError> {
        let start = self.claim(T::SIZE)?;
        self.memory.set_in(start, value, order)?;
        self.position = start + T::SIZE;
        Ok(())
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), MemoryError> {
        let start = self.claim(bytes.len())?;
        self.memory.write_bytes(start, bytes)?;
        self.position = start + bytes.len();
        Ok(())
    }

    /// Copy a whole view at the current position.
    pub fn put_memory(&mut self, source: &Memory<'_>) -> Result<(), MemoryError> {
        let start = self.claim(source.size())?;
        self.memory.slice(start, source.size())?.copy_from(source)?;
        self.position = start + source.size();
        Ok(())
    }

    /// Run `block` and return how many bytes it advanced the position.
    pub fn positional_difference<E>(
        &mut self,
        block: impl FnOnce(&mut Self) -> Result<(), E>,
    ) -> Result<usize, E> {
        let start = self.position;
        block(self)?;
        Ok(self.position - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_puts() {
        let mut bytes = [0u8; 8];
        let memory = Memory::from_mut_slice(&mut bytes);
        let mut encoder = memory.encoder().unwrap();
        encoder.put(1u8).unwrap();
        encoder.skip(1).unwrap();
        encoder.put_be(0x0203u16).unwrap();
        encoder.put_le(0x0706_0504u32).unwrap();
        assert_eq!(encoder.position(), 8);
        assert_eq!(bytes, [1, 0, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_overflow_keeps_position() {
        let mut bytes = [0u8; 6];
        let memory = Memory::from_mut_slice(&mut bytes);
        let mut encoder = memory.encoder().unwrap();
        encoder.put(1u32).unwrap();
        let err = encoder.put(2u32).unwrap_err();
        assert_eq!(
            err,
            MemoryError::Overflow {
                position: 4,
                width: 4,
                size: 6
            }
        );
        assert_eq!(encoder.position(), 4);
        assert_eq!(encoder.remaining(), 2);
        assert_eq!(memory.get::<u16>(4).unwrap(), 0);
    }

    #[test]
    fn test_positional_difference() {
        let mut bytes = [0u8; 16];
        let memory = Memory::from_mut_slice(&mut bytes);
        let mut encoder = memory.encoder().unwrap();
        encoder.put(0u8).unwrap();
        let written = encoder
            .positional_difference(|e| {
                e.put(1u64)?;
                e.put_bytes(&[1, 2, 3])
            })
            .unwrap();
        assert_eq!(written, 11);
    }
}
