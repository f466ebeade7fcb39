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

//! The resource table: sole owner of every device object a scene creates.
//!
//! Nodes hold copyable handle IDs only. Creating a device object through a
//! phase context registers it here, and the orchestrator releases the whole
//! table at teardown, so handles outlive nothing they reference.

use crate::error::SceneError;
use canopy_core::renderer::api::*;
use canopy_core::math::Extent3D;
use canopy_core::{DeviceError, GraphicsDevice};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A device object without a memory binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceObject {
    ImageView(ImageViewId),
    Sampler(SamplerId),
    ShaderModule(ShaderModuleId),
    DescriptorSetLayout(DescriptorSetLayoutId),
    DescriptorPool(DescriptorPoolId),
    PipelineLayout(PipelineLayoutId),
    Pipeline(PipelineId),
    CommandBuffer(CommandBufferId),
}

impl DeviceObject {
    /// Teardown order: dependents before what they depend on.
    fn release_rank(&self) -> u8 {
        match self {
            DeviceObject::CommandBuffer(_) => 0,
            DeviceObject::Pipeline(_) => 1,
            DeviceObject::PipelineLayout(_) => 2,
            DeviceObject::DescriptorPool(_) => 3,
            DeviceObject::DescriptorSetLayout(_) => 4,
            DeviceObject::ShaderModule(_) => 5,
            DeviceObject::ImageView(_) => 6,
            DeviceObject::Sampler(_) => 7,
        }
    }
}

/// A buffer and what was asked of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRecord {
    pub size: u64,
    pub usage: BufferUsage,
    pub properties: MemoryProperty,
    pub binding: Option<MemoryBinding>,
}

/// An image and what was asked of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecord {
    pub format: ImageFormat,
    pub extent: Extent3D,
    pub usage: ImageUsage,
    pub properties: MemoryProperty,
    pub binding: Option<MemoryBinding>,
}

#[derive(Debug, Clone, Copy)]
struct MemoryRecord {
    size: u64,
    // Resources still bound into the block.
    users: u32,
}

/// Counts of live device objects, for leak checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveHandles {
    pub buffers: usize,
    pub images: usize,
    pub memory_blocks: usize,
    pub objects: usize,
}

impl LiveHandles {
    pub fn total(&self) -> usize {
        self.buffers + self.images + self.memory_blocks + self.objects
    }
}

/// Registry of every device object owned by a scene.
#[derive(Debug)]
pub struct ResourceTable {
    device: Arc<dyn GraphicsDevice>,
    buffers: HashMap<BufferId, BufferRecord>,
    images: HashMap<ImageId, ImageRecord>,
    memory: HashMap<MemoryId, MemoryRecord>,
    objects: HashSet<DeviceObject>,
}

impl ResourceTable {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            device,
            buffers: HashMap::new(),
            images: HashMap::new(),
            memory: HashMap::new(),
            objects: HashSet::new(),
        }
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    // --- Buffers and images ---

    /// Creates an unbound buffer. Memory is bound by the allocator.
    pub(crate) fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        properties: MemoryProperty,
    ) -> Result<BufferId, SceneError> {
        let id = self.device.create_buffer(descriptor)?;
        self.buffers.insert(
            id,
            BufferRecord {
                size: descriptor.size,
                usage: descriptor.usage,
                properties,
                binding: None,
            },
        );
        Ok(id)
    }

    /// Creates an unbound image. Memory is bound by the allocator.
    pub(crate) fn create_image(
        &mut self,
        descriptor: &ImageDescriptor,
        properties: MemoryProperty,
    ) -> Result<ImageId, SceneError> {
        let id = self.device.create_image(descriptor)?;
        self.images.insert(
            id,
            ImageRecord {
                format: descriptor.format,
                extent: descriptor.extent,
                usage: descriptor.usage,
                properties,
                binding: None,
            },
        );
        Ok(id)
    }

    pub fn buffer(&self, id: BufferId) -> Option<&BufferRecord> {
        self.buffers.get(&id)
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.get(&id)
    }

    /// Returns `true` if the buffer exists and has memory bound.
    pub fn is_buffer_bound(&self, id: BufferId) -> bool {
        self.buffers
            .get(&id)
            .is_some_and(|record| record.binding.is_some())
    }

    /// Returns `true` if the image exists and has memory bound.
    pub fn is_image_bound(&self, id: ImageId) -> bool {
        self.images
            .get(&id)
            .is_some_and(|record| record.binding.is_some())
    }

    /// Returns the binding of a buffer, failing if it is unknown or unbound.
    pub fn require_bound_buffer(&self, id: BufferId) -> Result<MemoryBinding, SceneError> {
        self.buffers
            .get(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?
            .binding
            .ok_or_else(|| SceneError::Unbound(format!("{id:?}")))
    }

    /// Returns the binding of an image, failing if it is unknown or unbound.
    pub fn require_bound_image(&self, id: ImageId) -> Result<MemoryBinding, SceneError> {
        self.images
            .get(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?
            .binding
            .ok_or_else(|| SceneError::Unbound(format!("{id:?}")))
    }

    /// Writes host data into a bound, host-visible buffer.
    pub fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), SceneError> {
        let record = self
            .buffers
            .get(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
        let binding = record
            .binding
            .ok_or_else(|| SceneError::Unbound(format!("{id:?}")))?;
        if !record.properties.contains(MemoryProperty::HOST_VISIBLE) {
            return Err(DeviceError::NotHostVisible(binding.memory).into());
        }
        let len = data.len() as u64;
        if offset + len > record.size {
            return Err(DeviceError::OutOfBounds {
                offset,
                len,
                size: record.size,
            }
            .into());
        }
        self.device
            .write_memory(binding.memory, binding.offset + offset, data)?;
        Ok(())
    }

    pub(crate) fn register_memory(&mut self, id: MemoryId, size: u64, users: u32) {
        self.memory.insert(id, MemoryRecord { size, users });
    }

    pub(crate) fn publish_buffer_binding(
        &mut self,
        id: BufferId,
        binding: MemoryBinding,
    ) -> Result<(), SceneError> {
        let record = self
            .buffers
            .get_mut(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
        if record.binding.is_some() {
            return Err(DeviceError::AlreadyBound(format!("{id:?}")).into());
        }
        record.binding = Some(binding);
        Ok(())
    }

    pub(crate) fn publish_image_binding(
        &mut self,
        id: ImageId,
        binding: MemoryBinding,
    ) -> Result<(), SceneError> {
        let record = self
            .images
            .get_mut(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
        if record.binding.is_some() {
            return Err(DeviceError::AlreadyBound(format!("{id:?}")).into());
        }
        record.binding = Some(binding);
        Ok(())
    }

    /// Destroys a buffer and drops its share of the memory block it was bound to.
    pub fn destroy_buffer(&mut self, id: BufferId) -> Result<(), SceneError> {
        let record = self
            .buffers
            .remove(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
        self.device.destroy_buffer(id)?;
        if let Some(binding) = record.binding {
            self.release_memory(binding.memory)?;
        }
        Ok(())
    }

    /// Destroys an image and drops its share of the memory block it was bound to.
    pub fn destroy_image(&mut self, id: ImageId) -> Result<(), SceneError> {
        let record = self
            .images
            .remove(&id)
            .ok_or_else(|| SceneError::Untracked(format!("{id:?}")))?;
        self.device.destroy_image(id)?;
        if let Some(binding) = record.binding {
            self.release_memory(binding.memory)?;
        }
        Ok(())
    }

    fn release_memory(&mut self, id: MemoryId) -> Result<(), SceneError> {
        let Some(record) = self.memory.get_mut(&id) else {
            return Err(SceneError::Untracked(format!("{id:?}")));
        };
        record.users = record.users.saturating_sub(1);
        if record.users == 0 {
            self.memory.remove(&id);
            log::trace!("Freeing memory block {id:?}");
            self.device.free_memory(id)?;
        }
        Ok(())
    }

    // --- Everything else ---

    pub fn create_image_view(
        &mut self,
        descriptor: &ImageViewDescriptor,
    ) -> Result<ImageViewId, SceneError> {
        self.require_bound_image(descriptor.image)?;
        let id = self.device.create_image_view(descriptor)?;
        self.objects.insert(DeviceObject::ImageView(id));
        Ok(id)
    }

    pub fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> Result<SamplerId, SceneError> {
        let id = self.device.create_sampler(descriptor)?;
        self.objects.insert(DeviceObject::Sampler(id));
        Ok(id)
    }

    pub fn create_shader_module(
        &mut self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, SceneError> {
        let id = self.device.create_shader_module(descriptor)?;
        self.objects.insert(DeviceObject::ShaderModule(id));
        Ok(id)
    }

    pub fn create_descriptor_set_layout(
        &mut self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutId, SceneError> {
        let id = self.device.create_descriptor_set_layout(descriptor)?;
        self.objects.insert(DeviceObject::DescriptorSetLayout(id));
        Ok(id)
    }

    /// Creates a descriptor pool. Sets allocated from it die with it.
    pub fn create_descriptor_pool(
        &mut self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, SceneError> {
        let id = self.device.create_descriptor_pool(descriptor)?;
        self.objects.insert(DeviceObject::DescriptorPool(id));
        Ok(id)
    }

    pub fn create_pipeline_layout(
        &mut self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, SceneError> {
        let id = self.device.create_pipeline_layout(descriptor)?;
        self.objects.insert(DeviceObject::PipelineLayout(id));
        Ok(id)
    }

    pub fn create_graphics_pipeline(
        &mut self,
        cache: Option<PipelineCacheId>,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, SceneError> {
        let id = self.device.create_graphics_pipeline(cache, descriptor)?;
        self.objects.insert(DeviceObject::Pipeline(id));
        Ok(id)
    }

    pub fn create_compute_pipeline(
        &mut self,
        cache: Option<PipelineCacheId>,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, SceneError> {
        let id = self.device.create_compute_pipeline(cache, descriptor)?;
        self.objects.insert(DeviceObject::Pipeline(id));
        Ok(id)
    }

    pub fn allocate_command_buffer(
        &mut self,
        level: CommandBufferLevel,
    ) -> Result<CommandBufferId, SceneError> {
        let id = self.device.allocate_command_buffer(level)?;
        self.objects.insert(DeviceObject::CommandBuffer(id));
        Ok(id)
    }

    /// Destroys a tracked object.
    pub fn destroy(&mut self, object: DeviceObject) -> Result<(), SceneError> {
        if !self.objects.remove(&object) {
            return Err(SceneError::Untracked(format!("{object:?}")));
        }
        destroy_object(self.device.as_ref(), object)?;
        Ok(())
    }

    pub fn contains(&self, object: DeviceObject) -> bool {
        self.objects.contains(&object)
    }

    /// Counts the live objects.
    pub fn live_handles(&self) -> LiveHandles {
        LiveHandles {
            buffers: self.buffers.len(),
            images: self.images.len(),
            memory_blocks: self.memory.len(),
            objects: self.objects.len(),
        }
    }

    /// Sum of the sizes requested for bound buffers and images.
    pub fn requested_bytes(&self) -> u64 {
        let buffers = self
            .buffers
            .values()
            .filter(|record| record.binding.is_some())
            .map(|record| record.size);
        let images = self
            .images
            .values()
            .filter_map(|record| record.binding.map(|binding| binding.size));
        buffers.chain(images).sum()
    }

    /// Sum of the sizes of every memory binding.
    pub fn bound_bytes(&self) -> u64 {
        let buffers = self.buffers.values().filter_map(|record| record.binding);
        let images = self.images.values().filter_map(|record| record.binding);
        buffers.chain(images).map(|binding| binding.size).sum()
    }

    /// Sum of the sizes of every live memory block.
    pub fn allocated_bytes(&self) -> u64 {
        self.memory.values().map(|record| record.size).sum()
    }

    /// Destroys everything. Errors are logged and swallowed.
    ///
    /// The caller must make sure the device is idle first.
    pub fn release_all(&mut self) {
        let mut objects: Vec<DeviceObject> = self.objects.drain().collect();
        objects.sort_by_key(DeviceObject::release_rank);
        for object in objects {
            if let Err(e) = destroy_object(self.device.as_ref(), object) {
                log::error!("Failed to destroy {object:?}: {e}");
            }
        }

        for (id, _) in self.buffers.drain() {
            if let Err(e) = self.device.destroy_buffer(id) {
                log::error!("Failed to destroy {id:?}: {e}");
            }
        }
        for (id, _) in self.images.drain() {
            if let Err(e) = self.device.destroy_image(id) {
                log::error!("Failed to destroy {id:?}: {e}");
            }
        }
        for (id, _) in self.memory.drain() {
            if let Err(e) = self.device.free_memory(id) {
                log::error!("Failed to free {id:?}: {e}");
            }
        }
        log::debug!("Resource table released");
    }
}

fn destroy_object(device: &dyn GraphicsDevice, object: DeviceObject) -> Result<(), DeviceError> {
    match object {
        DeviceObject::ImageView(id) => device.destroy_image_view(id),
        DeviceObject::Sampler(id) => device.destroy_sampler(id),
        DeviceObject::ShaderModule(id) => device.destroy_shader_module(id),
        DeviceObject::DescriptorSetLayout(id) => device.destroy_descriptor_set_layout(id),
        DeviceObject::DescriptorPool(id) => device.destroy_descriptor_pool(id),
        DeviceObject::PipelineLayout(id) => device.destroy_pipeline_layout(id),
        DeviceObject::Pipeline(id) => device.destroy_pipeline(id),
        DeviceObject::CommandBuffer(id) => device.free_command_buffer(id),
    }
}
