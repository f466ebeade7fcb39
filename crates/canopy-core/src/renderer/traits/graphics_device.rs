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

use crate::renderer::api::*;
use crate::renderer::error::DeviceError;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// A logical device and its default queue.
///
/// The contract is explicit in the way modern graphics APIs are: buffers and
/// images are created without memory, memory is allocated and bound
/// separately, command buffers are recorded ahead of time and submitted later,
/// and the host waits on fences for the device to finish.
///
/// Methods take `&self`; implementations use interior mutability so that the
/// device can be shared behind an `Arc` by the orchestrator and its surface.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Creates a buffer without backing memory.
    /// ## Arguments
    /// * `descriptor` - Size, usage and label of the buffer.
    /// ## Returns
    /// The handle of the new, unbound buffer.
    /// ## Errors
    /// * `DeviceError::Api` - If the backend rejects the request.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, DeviceError>;

    /// Destroys a buffer. Its memory binding, if any, is not freed.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), DeviceError>;

    /// Returns the memory requirements of a buffer.
    fn buffer_memory_requirements(&self, id: BufferId) -> Result<MemoryRequirements, DeviceError>;

    /// Creates an image without backing memory.
    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageId, DeviceError>;

    /// Destroys an image. Its memory binding, if any, is not freed.
    fn destroy_image(&self, id: ImageId) -> Result<(), DeviceError>;

    /// Returns the memory requirements of an image.
    fn image_memory_requirements(&self, id: ImageId) -> Result<MemoryRequirements, DeviceError>;

    /// Returns the memory types of the device.
    fn memory_properties(&self) -> MemoryProperties;

    /// Allocates a block of device memory.
    /// ## Arguments
    /// * `size` - Number of bytes.
    /// * `memory_type_index` - Index into [`MemoryProperties::types`].
    /// ## Errors
    /// * `DeviceError::Api` with `OutOfDeviceMemory` or `OutOfHostMemory` when the heap is exhausted.
    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<MemoryId, DeviceError>;

    /// Frees a block of device memory.
    fn free_memory(&self, id: MemoryId) -> Result<(), DeviceError>;

    /// Binds a buffer to a range of a memory block. A buffer can be bound once.
    fn bind_buffer_memory(
        &self,
        buffer: BufferId,
        memory: MemoryId,
        offset: u64,
    ) -> Result<(), DeviceError>;

    /// Binds an image to a range of a memory block. An image can be bound once.
    fn bind_image_memory(
        &self,
        image: ImageId,
        memory: MemoryId,
        offset: u64,
    ) -> Result<(), DeviceError>;

    /// Copies `data` into host-visible memory at `offset` (map, copy, unmap).
    /// ## Errors
    /// * `DeviceError::NotHostVisible` - If the memory type cannot be mapped.
    /// * `DeviceError::OutOfBounds` - If the write exceeds the block.
    fn write_memory(&self, memory: MemoryId, offset: u64, data: &[u8]) -> Result<(), DeviceError>;

    /// Creates a view of an image.
    fn create_image_view(&self, descriptor: &ImageViewDescriptor)
        -> Result<ImageViewId, DeviceError>;

    /// Destroys an image view.
    fn destroy_image_view(&self, id: ImageViewId) -> Result<(), DeviceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, DeviceError>;

    /// Destroys a sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), DeviceError>;

    /// Creates a shader module.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, DeviceError>;

    /// Destroys a shader module.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), DeviceError>;

    /// Creates a descriptor set layout.
    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutId, DeviceError>;

    /// Destroys a descriptor set layout.
    fn destroy_descriptor_set_layout(&self, id: DescriptorSetLayoutId) -> Result<(), DeviceError>;

    /// Creates a descriptor pool.
    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, DeviceError>;

    /// Destroys a descriptor pool and every set allocated from it.
    fn destroy_descriptor_pool(&self, id: DescriptorPoolId) -> Result<(), DeviceError>;

    /// Allocates one descriptor set with the given layout from a pool.
    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolId,
        layout: DescriptorSetLayoutId,
    ) -> Result<DescriptorSetId, DeviceError>;

    /// Points bindings of a descriptor set at resources.
    fn update_descriptor_set(
        &self,
        set: DescriptorSetId,
        writes: &[WriteDescriptor],
    ) -> Result<(), DeviceError>;

    /// Creates a pipeline layout.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, DeviceError>;

    /// Destroys a pipeline layout.
    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), DeviceError>;

    /// Creates a pipeline cache.
    fn create_pipeline_cache(&self) -> Result<PipelineCacheId, DeviceError>;

    /// Destroys a pipeline cache.
    fn destroy_pipeline_cache(&self, id: PipelineCacheId) -> Result<(), DeviceError>;

    /// Creates a graphics pipeline.
    /// ## Arguments
    /// * `cache` - Optional pipeline cache consulted and filled by the build.
    /// * `descriptor` - Stages, vertex layout and fixed-function state.
    fn create_graphics_pipeline(
        &self,
        cache: Option<PipelineCacheId>,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, DeviceError>;

    /// Creates a compute pipeline.
    fn create_compute_pipeline(
        &self,
        cache: Option<PipelineCacheId>,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, DeviceError>;

    /// Destroys a graphics or compute pipeline.
    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), DeviceError>;

    /// Allocates a command buffer.
    fn allocate_command_buffer(
        &self,
        level: CommandBufferLevel,
    ) -> Result<CommandBufferId, DeviceError>;

    /// Frees a command buffer.
    fn free_command_buffer(&self, id: CommandBufferId) -> Result<(), DeviceError>;

    /// Resets a command buffer and starts recording into it.
    ///
    /// The returned encoder records until [`CommandEncoder::finish`] is called.
    /// ## Errors
    /// * `DeviceError::InvalidHandle` - If the buffer does not exist.
    fn begin_command_buffer(
        &self,
        id: CommandBufferId,
        info: &CommandBufferBeginInfo,
    ) -> Result<Box<dyn CommandEncoder>, DeviceError>;

    /// Creates a fence, optionally already signaled.
    fn create_fence(&self, signaled: bool) -> Result<FenceId, DeviceError>;

    /// Destroys a fence.
    fn destroy_fence(&self, id: FenceId) -> Result<(), DeviceError>;

    /// Blocks until every fence is signaled or `timeout_ns` elapses.
    /// ## Errors
    /// * `DeviceError::Api` with `Timeout` if the wait expires.
    fn wait_for_fences(&self, fences: &[FenceId], timeout_ns: u64) -> Result<(), DeviceError>;

    /// Returns fences to the unsignaled state.
    fn reset_fences(&self, fences: &[FenceId]) -> Result<(), DeviceError>;

    /// Creates a semaphore.
    fn create_semaphore(&self) -> Result<SemaphoreId, DeviceError>;

    /// Destroys a semaphore.
    fn destroy_semaphore(&self, id: SemaphoreId) -> Result<(), DeviceError>;

    /// Submits work to the default queue; `fence` is signaled when it completes.
    fn queue_submit(&self, submit: &SubmitInfo, fence: Option<FenceId>) -> Result<(), DeviceError>;

    /// Blocks until the device has finished all submitted work.
    fn device_wait_idle(&self) -> Result<(), DeviceError>;
}
