//! Sequential reader over a memory view.

use super::{ByteOrder, Memory, MemoryError, Scalar};

/// Reads scalars one after another, advancing a position.
///
/// A read past the end fails with [`MemoryError::Underflow`] and leaves
/// the position unchanged.
#[derive(Debug)]
pub struct Decoder<'a> {
    memory: Memory<'a>,
    position: usize,
}

impl<'a> Decoder<'a> {
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

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    fn claim(&self, width: usize) -> Result<usize, MemoryError> {
        if width <= self.remaining() {
            Ok(self.position)
        } else {
            Err(MemoryError::Underflow {
                position: self.position,
                width,
                size: self.memory.size(),
            })
        }
    }

    pub fn skip(&mut self, count: usize) -> Result<(), MemoryError> {
        let start = self.claim(count)?;
        self.position = start + count;
        Ok(())
    }

    pub fn next<T: Scalar>(&mut self) -> Result<T, MemoryError> {
        self.next_in(ByteOrder::Native)
    }

    pub fn next_le<T: Scalar>(&mut self) -> Result<T, MemoryError> {
        self.next_in(ByteOrder::Little)
    }

    pub fn next_be<T: Scalar>(&mut self) -> Result<T, MemoryError> {
        self.next_in(ByteOrder::Big)
    }

    pub fn next_in<T: Scalar>(&mut self, order: ByteOrder) -> Result<T, MemoryError> {
        let start = self.claim(T::SIZE)?;
        let value = self.memory.get_in(start, order)?;
        self.position = start + T::SIZE;
        Ok(value)
    }

    /// Fill `dst` with the next `dst.len()` bytes.
    pub fn next_bytes(&mut self, dst: &mut [u8]) -> Result<(), MemoryError> {
        let start = self.claim(dst.len())?;
        self.memory.read_bytes(start, dst)?;
        self.position = start + dst.len();
        Ok(())
    }

    /// Fill the whole of `destination` with the next bytes.
    pub fn next_into(&mut self, destination: &Memory<'_>) -> Result<(), MemoryError> {
        let start = self.claim(destination.size())?;
        destination.copy_from(&self.memory.slice(start, destination.size())?)?;
        self.position = start + destination.size();
        Ok(())
    }

    /// Run `block` and return how many bytes it consumed.
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
    fn test_sequential_reads() {
        let bytes = [1u8, 0, 2, 3, 4, 5, 6, 7];
        let memory = Memory::from_slice(&bytes);
        let mut decoder = memory.decoder().unwrap();
        assert_eq!(decoder.next::<u8>().unwrap(), 1);
        decoder.skip(1).unwrap();
        assert_eq!(decoder.next_be::<u16>().unwrap(), 0x0203);
        assert_eq!(decoder.next_le::<u32>().unwrap(), 0x0706_0504);
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn test_underflow_keeps_position() {
        let bytes = [0u8; 3];
        let memory = Memory::from_slice(&bytes);
        let mut decoder = memory.decoder().unwrap();
        decoder.next::<u16>().unwrap();
        assert_eq!(
            decoder.next::<u16>(),
            Err(MemoryError::Underflow {
                position: 2,
                width: 2,
                size: 3
            })
        );
        assert_eq!(decoder.position(), 2);
        assert_eq!(decoder.next::<u8>(), Ok(0));
    }

    #[test]
    fn test_next_into_memory() {
        let bytes = [9u8, 8, 7, 6];
        let source = Memory::from_slice(&bytes);
        let mut out = [0u8; 2];
        let destination = Memory::from_mut_slice(&mut out);
        let mut decoder = source.decoder().unwrap();
        decoder.skip(1).unwrap();
        let consumed = decoder
            .positional_difference(|d| d.next_into(&destination))
            .unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(out, [8, 7]);
    }
}
