//! Per-thread scratch stack for short-lived native memory.

use std::cell::Cell;

use super::align::{align_backward, check_alignment};
use super::{Memory, MemoryError, NativeAddress, NativeAllocation};
use crate::logging::{debug, trace, warn};

/// A downward-growing bump region carved into nested frames.
///
/// Frames are strictly nested: [`MemoryStack::with_frame`] and
/// [`StackFrame::with_frame`] only hand a frame to a closure, and on exit
/// the stack pointer returns to where the frame began. Only the innermost
/// live frame may allocate.
#[derive(Debug)]
pub struct MemoryStack {
    region: NativeAllocation,
    pointer: Cell<usize>,
    depth: Cell<usize>,
}

impl MemoryStack {
    pub const DEFAULT_SIZE: usize = 4 * 1024 * 1024;

    /// Default alignment of the region itself.
    pub const ALIGNMENT: usize = 8;

    pub fn new(size: usize) -> Result<Self, MemoryError> {
        Self::with_alignment(size, Self::ALIGNMENT)
    }

    /// Create a stack whose region is aligned to `alignment`.
    pub fn with_alignment(size: usize, alignment: usize) -> Result<Self, MemoryError> {
        let region = NativeAllocation::new(size, alignment)?;
        let top = region.address().to_bits() + size;
        debug!(size, alignment, "created memory stack");
        Ok(Self {
            region,
            pointer: Cell::new(top),
            depth: Cell::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.region.size()
    }

    /// Bytes still free below the stack pointer.
    pub fn available(&self) -> usize {
        self.pointer.get() - self.region.address().to_bits()
    }

    /// Run `f` inside a fresh frame; everything it allocates is reclaimed
    /// when it returns.
    pub fn with_frame<R>(&self, f: impl FnOnce(&StackFrame<'_>) -> R) -> R {
        let frame = StackFrame::push(self);
        f(&frame)
    }

    /// Run `f` inside a frame of this thread's default stack.
    pub fn with_thread_frame<R>(f: impl FnOnce(&StackFrame<'_>) -> R) -> Result<R, MemoryError> {
        THREAD_STACK.with(|stack| match stack {
            Some(stack) => Ok(stack.with_frame(f)),
            None => Err(MemoryError::AllocationFailed {
                size: Self::DEFAULT_SIZE,
                alignment: Self::ALIGNMENT,
            }),
        })
    }
}

thread_local! {
    static THREAD_STACK: Option<MemoryStack> = MemoryStack::new(MemoryStack::DEFAULT_SIZE).ok();
}

/// A live frame of a [`MemoryStack`].
#[derive(Debug)]
pub struct StackFrame<'s> {
    stack: &'s MemoryStack,
    saved_pointer: usize,
    depth: usize,
}

impl<'s> StackFrame<'s> {
    fn push(stack: &'s MemoryStack) -> Self {
        let depth = stack.depth.get() + 1;
        stack.depth.set(depth);
        trace!(depth, available = stack.available(), "pushed stack frame");
        Self {
            stack,
            saved_pointer: stack.pointer.get(),
            depth,
        }
    }

    /// Nesting depth, starting at 1 for the outermost frame.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` inside a child frame. This frame cannot allocate until `f`
    /// returns.
    pub fn with_frame<R>(&self, f: impl FnOnce(&StackFrame<'_>) -> R) -> R {
        self.stack.with_frame(f)
    }

    /// Reserve `size` zeroed bytes aligned to `alignment`.
    ///
    /// The view is valid until this frame ends.
    pub fn allocate(&self, size: usize, alignment: usize) -> Result<Memory<'_>, MemoryError> {
        check_alignment(alignment)?;
        if self.stack.depth.get() != self.depth {
            return Err(MemoryError::InactiveFrame);
        }
        let bottom = self.stack.region.address().to_bits();
        let pointer = self.stack.pointer.get();
        let available = pointer - bottom;
        let start = pointer
            .checked_sub(size)
            .map(|unaligned| align_backward(unaligned, alignment))
            .filter(|start| *start >= bottom)
            .ok_or_else(|| {
                warn!(requested = size, available, "memory stack exhausted");
                MemoryError::StackExhausted {
                    requested: size,
                    available,
                }
            })?;
        self.stack.pointer.set(start);
        // SAFETY: `[start, start + size)` lies inside the region, below every
        // live allocation of an enclosing frame, and is reclaimed only when
        // this frame (which the view borrows) ends.
        let memory = unsafe { Memory::from_raw_parts(NativeAddress::from_bits(start), size) };
        memory.fill(0)?;
        Ok(memory)
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        self.stack.pointer.set(self.saved_pointer);
        self.stack.depth.set(self.depth - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_aligned_and_disjoint() {
        let stack = MemoryStack::new(256).unwrap();
        stack.with_frame(|frame| {
            let a = frame.allocate(3, 1).unwrap();
            let b = frame.allocate(8, 8).unwrap();
            let a_start = a.start_address().unwrap().to_bits();
            let b_start = b.start_address().unwrap().to_bits();
            assert!(b.require_aligned_to(8).is_ok());
            assert!(b_start + 8 <= a_start);
            a.fill(0xFF).unwrap();
            assert_eq!(b.get::<u64>(0).unwrap(), 0);
        });
        assert_eq!(stack.available(), 256);
    }

    #[test]
    fn test_frames_reclaim_space() {
        let stack = MemoryStack::new(64).unwrap();
        stack.with_frame(|outer| {
            outer.allocate(16, 8).unwrap();
            let before = stack.available();
            outer.with_frame(|inner| {
                inner.allocate(32, 8).unwrap();
                assert_eq!(inner.depth(), 2);
            });
            assert_eq!(stack.available(), before);
        });
    }

    #[test]
    fn test_exhaustion() {
        let stack = MemoryStack::new(32).unwrap();
        stack.with_frame(|frame| {
            let err = frame.allocate(64, 8).unwrap_err();
            assert_eq!(
                err,
                MemoryError::StackExhausted {
                    requested: 64,
                    available: 32
                }
            );
            assert!(frame.allocate(32, 8).is_ok());
            assert!(frame.allocate(1, 1).is_err());
        });
    }

    #[test]
    fn test_outer_frame_inactive_while_inner_lives() {
        let stack = MemoryStack::new(64).unwrap();
        stack.with_frame(|outer| {
            outer.with_frame(|_inner| {
                assert_eq!(
                    outer.allocate(8, 8).unwrap_err(),
                    MemoryError::InactiveFrame
                );
            });
            assert!(outer.allocate(8, 8).is_ok());
        });
    }

    #[test]
    fn test_thread_frame() {
        let value = MemoryStack::with_thread_frame(|frame| {
            let memory = frame.allocate(4, 4).unwrap();
            memory.set(0, 41i32).unwrap();
            memory.get::<i32>(0).unwrap() + 1
        })
        .unwrap();
        assert_eq!(value, 42);
    }
}
