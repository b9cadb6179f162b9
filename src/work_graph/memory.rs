//! Work graph backing memory.

use crate::backend::*;

use super::ProgramResult;

/// Scratch memory of a work graph and the program binding that uses it.
///
/// A fresh allocation must be initialized by the first dispatch that runs
/// with it, so [`WorkGraphFlags::INITIALIZE`] starts out set and is cleared
/// by [`mark_dispatched`](Self::mark_dispatched). Nothing sets it again; a
/// rebuilt program gets a new `GraphMemory`.
pub struct GraphMemory<D: WorkGraphDevice> {
    buffer: Option<D::Buffer>,
    program: ProgramIdentifier,
    flags: WorkGraphFlags,
}

impl<D: WorkGraphDevice> GraphMemory<D> {
    pub const LABEL: &'static str = "WorkGraphBackingMemory";

    /// Allocate `size_in_bytes` of backing memory for `program`.
    ///
    /// A zero size allocates nothing and dispatches run without backing
    /// memory. Otherwise the size is rounded up to the device's backing
    /// memory alignment.
    pub fn ensure(
        device: &mut D,
        program: ProgramIdentifier,
        size_in_bytes: u64,
    ) -> ProgramResult<Self> {
        let buffer = if size_in_bytes == 0 {
            log::debug!("Work graph needs no backing memory");
            None
        } else {
            let alignment = device.backing_memory_alignment().max(1);
            let size = size_in_bytes.div_ceil(alignment) * alignment;
            log::debug!(
                "Allocating {} bytes of work graph backing memory (requested {}, alignment {})",
                size,
                size_in_bytes,
                alignment
            );

            Some(device.create_buffer(&BufferDescriptor {
                label: Self::LABEL.to_string(),
                size,
                alignment,
                usage: BufferUsage::UNORDERED_ACCESS,
                initial_state: ResourceState::UNORDERED_ACCESS,
            })?)
        };

        Ok(Self {
            buffer,
            program,
            flags: WorkGraphFlags::INITIALIZE,
        })
    }

    /// Backing buffer, if the graph needs any memory
    pub fn buffer(&self) -> Option<&D::Buffer> {
        self.buffer.as_ref()
    }

    /// Backing memory range, empty when nothing was allocated
    pub fn backing_range(&self) -> GpuVirtualRange {
        self.buffer
            .as_ref()
            .map(|b| b.gpu_range())
            .unwrap_or(GpuVirtualRange::EMPTY)
    }

    /// Whether the next dispatch still has to initialize the memory
    pub fn needs_initialize(&self) -> bool {
        self.flags.contains(WorkGraphFlags::INITIALIZE)
    }

    /// Program binding for the next dispatch
    pub fn program_desc(&self) -> SetProgramDesc {
        SetProgramDesc {
            program: self.program,
            flags: self.flags,
            backing_memory: self.backing_range(),
        }
    }

    /// Record that a dispatch using [`program_desc`](Self::program_desc) was issued
    pub fn mark_dispatched(&mut self) {
        if self.needs_initialize() {
            log::trace!("Work graph backing memory initialized");
            self.flags.remove(WorkGraphFlags::INITIALIZE);
        }
    }
}
