//! Ring buffer for per-frame constant data
//!
//! Per-draw uniform writes cannot use map-discard semantics on this backend
//! model: queued buffer writes land before command submission, so every draw
//! would observe the last write. Instead a frame's worth of per-draw data is
//! laid out at aligned offsets in one buffer and bound with dynamic offsets,
//! and the ring is reset once the frame's writes are retired.

use crate::backend::traits::*;
use crate::backend::types::{BufferDescriptor, BufferUsage};

/// A sub-allocation from a ring buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingAllocation {
    /// Byte offset into the ring buffer
    pub offset: u64,
    /// Size of the allocation in bytes
    pub size: u64,
}

/// A fixed-capacity ring of per-frame constant data
///
/// Allocations are aligned to the minimum uniform-buffer offset alignment
/// (256 bytes) so the offsets are directly usable as dynamic bind offsets.
pub struct RingBuffer {
    buffer: BufferHandle,
    capacity: u64,
    write_offset: u64,
    alignment: u64,
}

impl RingBuffer {
    /// Minimum uniform buffer offset alignment required by most GPUs
    pub const DEFAULT_ALIGNMENT: u64 = 256;

    /// Create a ring buffer with the given capacity
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        capacity: u64,
        usage: BufferUsage,
        label: &str,
    ) -> BackendResult<Self> {
        let alignment = Self::DEFAULT_ALIGNMENT;
        let aligned_capacity = align_up(capacity, alignment);

        let buffer = backend.create_buffer(
            &BufferDescriptor::new(aligned_capacity, usage | BufferUsage::COPY_DST)
                .with_label(format!("{label}_ring")),
        )?;

        Ok(Self {
            buffer,
            capacity: aligned_capacity,
            write_offset: 0,
            alignment,
        })
    }

    /// The underlying GPU buffer
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current write offset
    pub fn write_offset(&self) -> u64 {
        self.write_offset
    }

    /// Allocate space for one constant block. Returns `None` when the frame
    /// has exhausted the ring; call [`reset`](Self::reset) at frame start.
    pub fn allocate(&mut self, size: u64) -> Option<RingAllocation> {
        if size == 0 {
            return Some(RingAllocation {
                offset: self.write_offset,
                size: 0,
            });
        }

        let aligned_offset = align_up(self.write_offset, self.alignment);
        if aligned_offset + size > self.capacity {
            return None;
        }

        self.write_offset = aligned_offset + size;
        Some(RingAllocation {
            offset: aligned_offset,
            size,
        })
    }

    /// Reclaim the whole ring. Call once per frame, before the first
    /// allocation; every write in the new frame fully replaces the prior
    /// frame's contents.
    pub fn reset(&mut self) {
        self.write_offset = 0;
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("write_offset", &self.write_offset)
            .field("alignment", &self.alignment)
            .finish()
    }
}

/// Align a value up to the given power-of-two alignment
#[inline]
fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn test_ring(capacity: u64) -> RingBuffer {
        let mut backend = DummyBackend::new();
        RingBuffer::new(&mut backend, capacity, BufferUsage::UNIFORM, "test").unwrap()
    }

    #[test]
    fn allocations_are_aligned() {
        let mut ring = test_ring(2048);

        let first = ring.allocate(100).unwrap();
        assert_eq!(first.offset, 0);

        let second = ring.allocate(100).unwrap();
        assert_eq!(second.offset, 256);
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut ring = test_ring(512);

        assert!(ring.allocate(512).is_some());
        assert!(ring.allocate(1).is_none());
    }

    #[test]
    fn reset_reclaims_the_ring() {
        let mut ring = test_ring(512);
        ring.allocate(512).unwrap();

        ring.reset();

        let alloc = ring.allocate(128).unwrap();
        assert_eq!(alloc.offset, 0);
    }

    #[test]
    fn align_up_rounds_to_power_of_two() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }
}
