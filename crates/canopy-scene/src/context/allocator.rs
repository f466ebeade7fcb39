// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Allocate and Resize phase context.

use crate::context::phase_context;
use crate::error::SceneError;
use crate::resources::ResourceTable;
use crate::state::AllocState;
use canopy_core::image::ImageLoaderFactory;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::*;
use canopy_core::renderer::AllocationStrategy;
use canopy_core::{DeviceError, GraphicsDevice};

/// Totals of one allocation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationReport {
    /// Resources bound by the pass.
    pub resources: usize,
    /// Sum of the sizes the resources asked for.
    pub requested_bytes: u64,
    /// Sum of the sizes of the published bindings.
    pub bound_bytes: u64,
    /// Memory blocks allocated.
    pub blocks: usize,
    /// Sum of the sizes of those blocks.
    pub block_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Buffer(BufferId),
    Image(ImageId),
}

#[derive(Debug)]
struct Request {
    resource: Pending,
    requested: u64,
    requirements: MemoryRequirements,
    type_index: u32,
}

#[derive(Debug)]
struct Block {
    type_index: u32,
    size: u64,
    // (request index, offset)
    members: Vec<(usize, u64)>,
}

/// Two-phase memory allocator.
///
/// During the traversal nodes create buffers and images through
/// [`create_buffer`](Self::create_buffer) and
/// [`create_image`](Self::create_image); those are registered unbound. Once
/// the traversal is over, [`end`](Self::end) finds a memory type for each
/// resource, allocates memory and binds it. Handles created during the walk
/// must not be used as bound until `end` has returned successfully.
#[derive(Debug)]
pub struct Allocator<'a> {
    table: &'a mut ResourceTable,
    image_loaders: &'a ImageLoaderFactory,
    strategy: AllocationStrategy,
    extent: Extent2D,
    pending: Vec<Pending>,
    finished: bool,
    /// The current state of the traversal.
    pub state: AllocState,
}

phase_context!(Allocator, AllocState);

impl<'a> Allocator<'a> {
    /// Starts an allocation pass.
    pub fn begin(
        table: &'a mut ResourceTable,
        image_loaders: &'a ImageLoaderFactory,
        strategy: AllocationStrategy,
        extent: Extent2D,
    ) -> Self {
        Self {
            table,
            image_loaders,
            strategy,
            extent,
            pending: Vec::new(),
            finished: false,
            state: AllocState::default(),
        }
    }

    /// Current size of the render surface.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn image_loaders(&self) -> &ImageLoaderFactory {
        self.image_loaders
    }

    pub fn resources(&mut self) -> &mut ResourceTable {
        &mut *self.table
    }

    /// Number of resources waiting for memory.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Creates a buffer whose memory will be bound by [`end`](Self::end).
    pub fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        properties: MemoryProperty,
    ) -> Result<BufferId, SceneError> {
        let id = self.table.create_buffer(descriptor, properties)?;
        self.pending.push(Pending::Buffer(id));
        Ok(id)
    }

    /// Creates an image whose memory will be bound by [`end`](Self::end).
    pub fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
        properties: MemoryProperty,
    ) -> Result<ImageId, SceneError> {
        let id = self.table.create_image(descriptor, properties)?;
        self.pending.push(Pending::Image(id));
        Ok(id)
    }

    /// Allocates memory for every resource created during the pass and binds it.
    ///
    /// On failure every block allocated by this call is freed and no binding
    /// is published: the resources stay registered but unbound.
    /// ## Errors
    /// * `DeviceError::NoMemoryType` - If no memory type satisfies a resource.
    /// * `DeviceError::Api` - If allocation or binding fails.
    pub fn end(mut self) -> Result<AllocationReport, SceneError> {
        self.finished = true;
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(AllocationReport::default());
        }

        let device = self.table.device().clone();
        let requests = self.collect_requests(device.as_ref(), &pending)?;
        let blocks = match self.strategy {
            AllocationStrategy::Pooled => pooled_blocks(&requests),
            AllocationStrategy::Dedicated => dedicated_blocks(&requests),
        };

        let mut allocated = Vec::with_capacity(blocks.len());
        if let Err(e) = bind_blocks(device.as_ref(), &requests, &blocks, &mut allocated) {
            for memory in allocated {
                if let Err(free_err) = device.free_memory(memory) {
                    log::error!("Failed to free {memory:?} while unwinding allocation: {free_err}");
                }
            }
            log::error!("Allocation of {} resources failed: {e}", requests.len());
            return Err(e.into());
        }

        let mut report = AllocationReport {
            resources: requests.len(),
            blocks: blocks.len(),
            ..Default::default()
        };
        for (block, memory) in blocks.iter().zip(allocated) {
            self.table
                .register_memory(memory, block.size, block.members.len() as u32);
            report.block_bytes += block.size;
            for &(index, offset) in &block.members {
                let request = &requests[index];
                let binding = MemoryBinding {
                    memory,
                    offset,
                    size: request.requirements.size,
                };
                match request.resource {
                    Pending::Buffer(id) => self.table.publish_buffer_binding(id, binding)?,
                    Pending::Image(id) => self.table.publish_image_binding(id, binding)?,
                }
                report.requested_bytes += request.requested;
                report.bound_bytes += binding.size;
            }
        }

        log::debug!(
            "Bound {} resources ({} bytes) into {} memory blocks",
            report.resources,
            report.bound_bytes,
            report.blocks
        );
        Ok(report)
    }

    fn collect_requests(
        &self,
        device: &dyn GraphicsDevice,
        pending: &[Pending],
    ) -> Result<Vec<Request>, SceneError> {
        let memory_properties = device.memory_properties();
        pending
            .iter()
            .map(|&resource| {
                let (requirements, requested, wanted) = match resource {
                    Pending::Buffer(id) => {
                        let record = self
                            .table
                            .buffer(id)
                            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
                        let requirements = device.buffer_memory_requirements(id)?;
                        (requirements, record.size, record.properties)
                    }
                    Pending::Image(id) => {
                        let record = self
                            .table
                            .image(id)
                            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
                        let requirements = device.image_memory_requirements(id)?;
                        (requirements, requirements.size, record.properties)
                    }
                };
                let type_index = memory_properties
                    .find_type(requirements.type_bits, wanted)
                    .ok_or(DeviceError::NoMemoryType {
                        type_bits: requirements.type_bits,
                        required: wanted,
                    })?;
                Ok(Request {
                    resource,
                    requested,
                    requirements,
                    type_index,
                })
            })
            .collect()
    }
}

impl Drop for Allocator<'_> {
    fn drop(&mut self) {
        if !self.finished && !self.pending.is_empty() {
            log::warn!(
                "Allocation pass dropped without end(); {} resources left unbound",
                self.pending.len()
            );
        }
    }
}

/// One block per memory type, resources packed at aligned offsets.
fn pooled_blocks(requests: &[Request]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for (index, request) in requests.iter().enumerate() {
        let block = match blocks
            .iter_mut()
            .position(|block| block.type_index == request.type_index)
        {
            Some(position) => &mut blocks[position],
            None => {
                blocks.push(Block {
                    type_index: request.type_index,
                    size: 0,
                    members: Vec::new(),
                });
                let last = blocks.len() - 1;
                &mut blocks[last]
            }
        };
        let offset = align_up(block.size, request.requirements.alignment);
        block.members.push((index, offset));
        block.size = offset + request.requirements.size;
    }
    blocks
}

/// One block per resource.
fn dedicated_blocks(requests: &[Request]) -> Vec<Block> {
    requests
        .iter()
        .enumerate()
        .map(|(index, request)| Block {
            type_index: request.type_index,
            size: request.requirements.size,
            members: vec![(index, 0)],
        })
        .collect()
}

fn bind_blocks(
    device: &dyn GraphicsDevice,
    requests: &[Request],
    blocks: &[Block],
    allocated: &mut Vec<MemoryId>,
) -> Result<(), DeviceError> {
    for block in blocks {
        let memory = device.allocate_memory(block.size, block.type_index)?;
        allocated.push(memory);
        for &(index, offset) in &block.members {
            match requests[index].resource {
                Pending::Buffer(id) => device.bind_buffer_memory(id, memory, offset)?,
                Pending::Image(id) => device.bind_image_memory(id, memory, offset)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(type_index: u32, size: u64, alignment: u64) -> Request {
        Request {
            resource: Pending::Buffer(BufferId(0)),
            requested: size,
            requirements: MemoryRequirements {
                size,
                alignment,
                type_bits: !0,
            },
            type_index,
        }
    }

    #[test]
    fn test_pooled_blocks_pack_per_memory_type() {
        let requests = [request(0, 100, 64), request(1, 16, 16), request(0, 50, 64)];
        let blocks = pooled_blocks(&requests);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].type_index, 0);
        assert_eq!(blocks[0].members, vec![(0, 0), (2, 128)]);
        assert_eq!(blocks[0].size, 178);
        assert_eq!(blocks[1].members, vec![(1, 0)]);
        assert_eq!(blocks[1].size, 16);
    }

    #[test]
    fn test_dedicated_blocks_one_per_resource() {
        let requests = [request(0, 100, 64), request(0, 50, 64)];
        let blocks = dedicated_blocks(&requests);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|block| block.members.len() == 1));
        assert_eq!(blocks[1].size, 50);
    }
}
