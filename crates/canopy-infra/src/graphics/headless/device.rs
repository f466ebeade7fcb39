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

use crate::graphics::recording::{CommandSink, RecordedCommand, RecordingEncoder};
use canopy_core::renderer::api::*;
use canopy_core::renderer::{CommandEncoder, DeviceError, GraphicsDevice, ResultCode};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const BUFFER_ALIGNMENT: u64 = 16;
const IMAGE_ALIGNMENT: u64 = 256;
// VK_ERROR_OUT_OF_POOL_MEMORY
const OUT_OF_POOL_MEMORY: i32 = -1_000_069_000;

fn invalid(handle: impl Debug) -> DeviceError {
    DeviceError::InvalidHandle(format!("{handle:?}"))
}

#[derive(Debug)]
struct BufferEntry {
    size: u64,
    binding: Option<(MemoryId, u64)>,
}

#[derive(Debug)]
struct ImageEntry {
    size: u64,
    binding: Option<(MemoryId, u64)>,
}

#[derive(Debug)]
struct MemoryBlock {
    type_index: u32,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct PoolEntry {
    max_sets: u32,
    sets: Vec<DescriptorSetId>,
}

#[derive(Debug)]
struct CommandBufferEntry {
    level: CommandBufferLevel,
    commands: Vec<RecordedCommand>,
    recording: bool,
    recordings: u32,
    executions: u32,
}

/// Everything a [`HeadlessDevice`] knows about.
#[derive(Debug, Default)]
struct HeadlessState {
    next_id: u64,
    buffers: HashMap<BufferId, BufferEntry>,
    images: HashMap<ImageId, ImageEntry>,
    memory: HashMap<MemoryId, MemoryBlock>,
    image_views: HashMap<ImageViewId, ImageId>,
    samplers: HashSet<SamplerId>,
    shader_modules: HashSet<ShaderModuleId>,
    set_layouts: HashSet<DescriptorSetLayoutId>,
    pools: HashMap<DescriptorPoolId, PoolEntry>,
    sets: HashMap<DescriptorSetId, Vec<WriteDescriptor>>,
    pipeline_layouts: HashSet<PipelineLayoutId>,
    pipeline_caches: HashSet<PipelineCacheId>,
    pipelines: HashMap<PipelineId, PipelineBindPoint>,
    command_buffers: HashMap<CommandBufferId, CommandBufferEntry>,
    fences: HashMap<FenceId, bool>,
    semaphores: HashSet<SemaphoreId>,
    render_passes: HashSet<RenderPassId>,
    framebuffers: HashSet<FramebufferId>,
    submissions: usize,
    last_submitted: Vec<CommandBufferId>,
    // Number of upcoming memory allocations that fail.
    failing_allocations: u32,
}

impl HeadlessState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn buffer_memory(&self, id: BufferId) -> Result<(MemoryId, u64, u64), DeviceError> {
        let entry = self.buffers.get(&id).ok_or_else(|| invalid(id))?;
        let (memory, offset) = entry.binding.ok_or_else(|| invalid(id))?;
        Ok((memory, offset, entry.size))
    }

    fn copy_buffer(
        &mut self,
        source: BufferId,
        destination: BufferId,
        regions: &[BufferCopy],
    ) -> Result<(), DeviceError> {
        let (src_memory, src_base, src_size) = self.buffer_memory(source)?;
        let (dst_memory, dst_base, dst_size) = self.buffer_memory(destination)?;
        for region in regions {
            if region.src_offset + region.size > src_size {
                return Err(DeviceError::OutOfBounds {
                    offset: region.src_offset,
                    len: region.size,
                    size: src_size,
                });
            }
            if region.dst_offset + region.size > dst_size {
                return Err(DeviceError::OutOfBounds {
                    offset: region.dst_offset,
                    len: region.size,
                    size: dst_size,
                });
            }
            let start = (src_base + region.src_offset) as usize;
            let bytes = self
                .memory
                .get(&src_memory)
                .ok_or_else(|| invalid(src_memory))?
                .bytes[start..start + region.size as usize]
                .to_vec();
            let start = (dst_base + region.dst_offset) as usize;
            let block = self
                .memory
                .get_mut(&dst_memory)
                .ok_or_else(|| invalid(dst_memory))?;
            block.bytes[start..start + bytes.len()].copy_from_slice(&bytes);
        }
        Ok(())
    }

    fn execute(&mut self, id: CommandBufferId) -> Result<(), DeviceError> {
        let entry = self.command_buffers.get(&id).ok_or_else(|| invalid(id))?;
        if entry.recording {
            return Err(DeviceError::api("vkQueueSubmit", ResultCode::Unknown(-1)));
        }
        for command in entry.commands.clone() {
            match command {
                RecordedCommand::CopyBuffer {
                    source,
                    destination,
                    regions,
                } => self.copy_buffer(source, destination, &regions)?,
                RecordedCommand::ExecuteCommands(secondaries) => {
                    for secondary in secondaries {
                        let entry = self
                            .command_buffers
                            .get_mut(&secondary)
                            .ok_or_else(|| invalid(secondary))?;
                        if entry.level != CommandBufferLevel::Secondary {
                            return Err(invalid(secondary));
                        }
                        entry.executions += 1;
                        self.execute(secondary)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Live object counts of a [`HeadlessDevice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessCounts {
    pub buffers: usize,
    pub images: usize,
    pub memory_blocks: usize,
    pub image_views: usize,
    pub samplers: usize,
    pub shader_modules: usize,
    pub descriptor_set_layouts: usize,
    pub descriptor_pools: usize,
    pub descriptor_sets: usize,
    pub pipeline_layouts: usize,
    pub pipeline_caches: usize,
    pub pipelines: usize,
    pub command_buffers: usize,
    pub fences: usize,
    pub semaphores: usize,
    pub render_passes: usize,
    pub framebuffers: usize,
}

impl HeadlessCounts {
    pub fn total(&self) -> usize {
        self.buffers
            + self.images
            + self.memory_blocks
            + self.image_views
            + self.samplers
            + self.shader_modules
            + self.descriptor_set_layouts
            + self.descriptor_pools
            + self.descriptor_sets
            + self.pipeline_layouts
            + self.pipeline_caches
            + self.pipelines
            + self.command_buffers
            + self.fences
            + self.semaphores
            + self.render_passes
            + self.framebuffers
    }
}

/// A [`GraphicsDevice`] backed by host memory.
///
/// Cloning yields another handle to the same device, so a test can keep one
/// for inspection while the orchestrator owns another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDevice {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Memory types: device-local, host-visible, and both.
    fn memory_types() -> Vec<MemoryType> {
        vec![
            MemoryType {
                properties: MemoryProperty::DEVICE_LOCAL,
                heap_index: 0,
            },
            MemoryType {
                properties: MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
                heap_index: 1,
            },
            MemoryType {
                properties: MemoryProperty::DEVICE_LOCAL
                    | MemoryProperty::HOST_VISIBLE
                    | MemoryProperty::HOST_COHERENT,
                heap_index: 0,
            },
        ]
    }

    /// Makes the next `count` calls to `allocate_memory` fail with `OutOfDeviceMemory`.
    pub fn fail_next_allocations(&self, count: u32) {
        self.lock().failing_allocations = count;
    }

    pub fn counts(&self) -> HeadlessCounts {
        let state = self.lock();
        HeadlessCounts {
            buffers: state.buffers.len(),
            images: state.images.len(),
            memory_blocks: state.memory.len(),
            image_views: state.image_views.len(),
            samplers: state.samplers.len(),
            shader_modules: state.shader_modules.len(),
            descriptor_set_layouts: state.set_layouts.len(),
            descriptor_pools: state.pools.len(),
            descriptor_sets: state.sets.len(),
            pipeline_layouts: state.pipeline_layouts.len(),
            pipeline_caches: state.pipeline_caches.len(),
            pipelines: state.pipelines.len(),
            command_buffers: state.command_buffers.len(),
            fences: state.fences.len(),
            semaphores: state.semaphores.len(),
            render_passes: state.render_passes.len(),
            framebuffers: state.framebuffers.len(),
        }
    }

    /// Commands last recorded into a command buffer.
    pub fn commands(&self, id: CommandBufferId) -> Vec<RecordedCommand> {
        self.lock()
            .command_buffers
            .get(&id)
            .map(|entry| entry.commands.clone())
            .unwrap_or_default()
    }

    /// How many times a command buffer was recorded.
    pub fn recordings(&self, id: CommandBufferId) -> u32 {
        self.lock()
            .command_buffers
            .get(&id)
            .map_or(0, |entry| entry.recordings)
    }

    /// How many times a secondary command buffer was executed by a submission.
    pub fn executions(&self, id: CommandBufferId) -> u32 {
        self.lock()
            .command_buffers
            .get(&id)
            .map_or(0, |entry| entry.executions)
    }

    /// The writes last applied to a descriptor set.
    pub fn descriptor_writes(&self, set: DescriptorSetId) -> Vec<WriteDescriptor> {
        self.lock().sets.get(&set).cloned().unwrap_or_default()
    }

    /// Every descriptor set currently allocated.
    pub fn descriptor_sets(&self) -> Vec<DescriptorSetId> {
        let mut sets: Vec<_> = self.lock().sets.keys().copied().collect();
        sets.sort();
        sets
    }

    /// Contents of a bound buffer.
    pub fn read_buffer(&self, id: BufferId) -> Option<Vec<u8>> {
        let state = self.lock();
        let (memory, offset, size) = state.buffer_memory(id).ok()?;
        let block = state.memory.get(&memory)?;
        let start = offset as usize;
        block.bytes.get(start..start + size as usize).map(<[u8]>::to_vec)
    }

    /// Number of `queue_submit` calls that succeeded.
    pub fn submissions(&self) -> usize {
        self.lock().submissions
    }

    /// Primary command buffers of the last successful `queue_submit`.
    pub fn last_submitted(&self) -> Vec<CommandBufferId> {
        self.lock().last_submitted.clone()
    }

    pub(super) fn create_render_pass(&self) -> RenderPassId {
        let mut state = self.lock();
        let id = RenderPassId(state.next_id());
        state.render_passes.insert(id);
        id
    }

    pub(super) fn destroy_render_pass(&self, id: RenderPassId) -> Result<(), DeviceError> {
        if self.lock().render_passes.remove(&id) {
            Ok(())
        } else {
            Err(invalid(id))
        }
    }

    pub(super) fn create_framebuffer(&self, render_pass: RenderPassId) -> Result<FramebufferId, DeviceError> {
        let mut state = self.lock();
        if !state.render_passes.contains(&render_pass) {
            return Err(invalid(render_pass));
        }
        let id = FramebufferId(state.next_id());
        state.framebuffers.insert(id);
        Ok(id)
    }

    pub(super) fn destroy_framebuffer(&self, id: FramebufferId) -> Result<(), DeviceError> {
        if self.lock().framebuffers.remove(&id) {
            Ok(())
        } else {
            Err(invalid(id))
        }
    }
}

impl CommandSink for HeadlessDevice {
    fn store_recording(
        &self,
        id: CommandBufferId,
        commands: Vec<RecordedCommand>,
    ) -> Result<(), DeviceError> {
        let mut state = self.lock();
        let entry = state.command_buffers.get_mut(&id).ok_or_else(|| invalid(id))?;
        entry.commands = commands;
        entry.recording = false;
        entry.recordings += 1;
        Ok(())
    }
}

/// Removes `id` from `set`, failing if it was not there.
fn remove<T: std::hash::Hash + Eq + Debug + Copy>(set: &mut HashSet<T>, id: T) -> Result<(), DeviceError> {
    if set.remove(&id) {
        Ok(())
    } else {
        Err(invalid(id))
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, DeviceError> {
        let mut state = self.lock();
        let id = BufferId(state.next_id());
        state.buffers.insert(
            id,
            BufferEntry {
                size: descriptor.size,
                binding: None,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), DeviceError> {
        self.lock()
            .buffers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn buffer_memory_requirements(&self, id: BufferId) -> Result<MemoryRequirements, DeviceError> {
        let state = self.lock();
        let entry = state.buffers.get(&id).ok_or_else(|| invalid(id))?;
        Ok(MemoryRequirements {
            size: entry.size,
            alignment: BUFFER_ALIGNMENT,
            type_bits: 0b111,
        })
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageId, DeviceError> {
        let size = descriptor.extent.texel_count()
            * u64::from(descriptor.format.texel_size())
            * u64::from(descriptor.array_layers.max(1));
        let mut state = self.lock();
        let id = ImageId(state.next_id());
        state.images.insert(id, ImageEntry { size, binding: None });
        Ok(id)
    }

    fn destroy_image(&self, id: ImageId) -> Result<(), DeviceError> {
        let mut state = self.lock();
        state.images.remove(&id).ok_or_else(|| invalid(id))?;
        Ok(())
    }

    fn image_memory_requirements(&self, id: ImageId) -> Result<MemoryRequirements, DeviceError> {
        let state = self.lock();
        let entry = state.images.get(&id).ok_or_else(|| invalid(id))?;
        Ok(MemoryRequirements {
            size: entry.size,
            alignment: IMAGE_ALIGNMENT,
            // Images only live in device-local memory.
            type_bits: 0b101,
        })
    }

    fn memory_properties(&self) -> MemoryProperties {
        MemoryProperties {
            types: Self::memory_types(),
        }
    }

    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<MemoryId, DeviceError> {
        let mut state = self.lock();
        if state.failing_allocations > 0 {
            state.failing_allocations -= 1;
            return Err(DeviceError::api(
                "vkAllocateMemory",
                ResultCode::OutOfDeviceMemory,
            ));
        }
        if memory_type_index as usize >= Self::memory_types().len() {
            return Err(DeviceError::api(
                "vkAllocateMemory",
                ResultCode::Unknown(-1),
            ));
        }
        let id = MemoryId(state.next_id());
        state.memory.insert(
            id,
            MemoryBlock {
                type_index: memory_type_index,
                bytes: vec![0; size as usize],
            },
        );
        Ok(id)
    }

    fn free_memory(&self, id: MemoryId) -> Result<(), DeviceError> {
        self.lock()
            .memory
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn bind_buffer_memory(
        &self,
        buffer: BufferId,
        memory: MemoryId,
        offset: u64,
    ) -> Result<(), DeviceError> {
        let mut state = self.lock();
        let block_size = state
            .memory
            .get(&memory)
            .ok_or_else(|| invalid(memory))?
            .bytes
            .len() as u64;
        let entry = state.buffers.get_mut(&buffer).ok_or_else(|| invalid(buffer))?;
        if entry.binding.is_some() {
            return Err(DeviceError::AlreadyBound(format!("{buffer:?}")));
        }
        if offset % BUFFER_ALIGNMENT != 0 || offset + entry.size > block_size {
            return Err(DeviceError::OutOfBounds {
                offset,
                len: entry.size,
                size: block_size,
            });
        }
        entry.binding = Some((memory, offset));
        Ok(())
    }

    fn bind_image_memory(
        &self,
        image: ImageId,
        memory: MemoryId,
        offset: u64,
    ) -> Result<(), DeviceError> {
        let mut state = self.lock();
        let block_size = state
            .memory
            .get(&memory)
            .ok_or_else(|| invalid(memory))?
            .bytes
            .len() as u64;
        let entry = state.images.get_mut(&image).ok_or_else(|| invalid(image))?;
        if entry.binding.is_some() {
            return Err(DeviceError::AlreadyBound(format!("{image:?}")));
        }
        if offset % IMAGE_ALIGNMENT != 0 || offset + entry.size > block_size {
            return Err(DeviceError::OutOfBounds {
                offset,
                len: entry.size,
                size: block_size,
            });
        }
        entry.binding = Some((memory, offset));
        Ok(())
    }

    fn write_memory(&self, memory: MemoryId, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.lock();
        let block = state.memory.get_mut(&memory).ok_or_else(|| invalid(memory))?;
        let properties = Self::memory_types()[block.type_index as usize].properties;
        if !properties.contains(MemoryProperty::HOST_VISIBLE) {
            return Err(DeviceError::NotHostVisible(memory));
        }
        let size = block.bytes.len() as u64;
        let len = data.len() as u64;
        if offset + len > size {
            return Err(DeviceError::OutOfBounds { offset, len, size });
        }
        let start = offset as usize;
        block.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_image_view(&self, descriptor: &ImageViewDescriptor) -> Result<ImageViewId, DeviceError> {
        let mut state = self.lock();
        let image = state
            .images
            .get(&descriptor.image)
            .ok_or_else(|| invalid(descriptor.image))?;
        if image.binding.is_none() {
            return Err(invalid(descriptor.image));
        }
        let id = ImageViewId(state.next_id());
        state.image_views.insert(id, descriptor.image);
        Ok(id)
    }

    fn destroy_image_view(&self, id: ImageViewId) -> Result<(), DeviceError> {
        self.lock()
            .image_views
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn create_sampler(&self, _descriptor: &SamplerDescriptor) -> Result<SamplerId, DeviceError> {
        let mut state = self.lock();
        let id = SamplerId(state.next_id());
        state.samplers.insert(id);
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), DeviceError> {
        remove(&mut self.lock().samplers, id)
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, DeviceError> {
        let empty = match &descriptor.source {
            ShaderSource::SpirV(words) => words.is_empty(),
            ShaderSource::Wgsl(text) => text.is_empty(),
        };
        if empty {
            return Err(DeviceError::api(
                "vkCreateShaderModule",
                ResultCode::InitializationFailed,
            ));
        }
        let mut state = self.lock();
        let id = ShaderModuleId(state.next_id());
        state.shader_modules.insert(id);
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), DeviceError> {
        remove(&mut self.lock().shader_modules, id)
    }

    fn create_descriptor_set_layout(
        &self,
        _descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutId, DeviceError> {
        let mut state = self.lock();
        let id = DescriptorSetLayoutId(state.next_id());
        state.set_layouts.insert(id);
        Ok(id)
    }

    fn destroy_descriptor_set_layout(&self, id: DescriptorSetLayoutId) -> Result<(), DeviceError> {
        remove(&mut self.lock().set_layouts, id)
    }

    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor,
    ) -> Result<DescriptorPoolId, DeviceError> {
        let mut state = self.lock();
        let id = DescriptorPoolId(state.next_id());
        state.pools.insert(
            id,
            PoolEntry {
                max_sets: descriptor.max_sets,
                sets: Vec::new(),
            },
        );
        Ok(id)
    }

    fn destroy_descriptor_pool(&self, id: DescriptorPoolId) -> Result<(), DeviceError> {
        let mut state = self.lock();
        let pool = state.pools.remove(&id).ok_or_else(|| invalid(id))?;
        for set in pool.sets {
            state.sets.remove(&set);
        }
        Ok(())
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolId,
        layout: DescriptorSetLayoutId,
    ) -> Result<DescriptorSetId, DeviceError> {
        let mut state = self.lock();
        if !state.set_layouts.contains(&layout) {
            return Err(invalid(layout));
        }
        let id = DescriptorSetId(state.next_id());
        let entry = state.pools.get_mut(&pool).ok_or_else(|| invalid(pool))?;
        if entry.sets.len() as u32 >= entry.max_sets {
            return Err(DeviceError::api(
                "vkAllocateDescriptorSets",
                ResultCode::Unknown(OUT_OF_POOL_MEMORY),
            ));
        }
        entry.sets.push(id);
        state.sets.insert(id, Vec::new());
        Ok(id)
    }

    fn update_descriptor_set(
        &self,
        set: DescriptorSetId,
        writes: &[WriteDescriptor],
    ) -> Result<(), DeviceError> {
        let mut state = self.lock();
        for write in writes {
            match write.resource {
                DescriptorResource::Buffer { buffer, .. } if !state.buffers.contains_key(&buffer) => {
                    return Err(invalid(buffer));
                }
                DescriptorResource::Image { view, .. }
                | DescriptorResource::CombinedImageSampler { view, .. }
                    if !state.image_views.contains_key(&view) =>
                {
                    return Err(invalid(view));
                }
                DescriptorResource::CombinedImageSampler { sampler, .. }
                | DescriptorResource::Sampler(sampler)
                    if !state.samplers.contains(&sampler) =>
                {
                    return Err(invalid(sampler));
                }
                _ => {}
            }
        }
        let entry = state.sets.get_mut(&set).ok_or_else(|| invalid(set))?;
        for write in writes {
            entry.retain(|existing| {
                existing.binding != write.binding || existing.array_element != write.array_element
            });
            entry.push(*write);
        }
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, DeviceError> {
        let mut state = self.lock();
        if let Some(missing) = descriptor
            .set_layouts
            .iter()
            .find(|layout| !state.set_layouts.contains(*layout))
        {
            return Err(invalid(*missing));
        }
        let id = PipelineLayoutId(state.next_id());
        state.pipeline_layouts.insert(id);
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), DeviceError> {
        remove(&mut self.lock().pipeline_layouts, id)
    }

    fn create_pipeline_cache(&self) -> Result<PipelineCacheId, DeviceError> {
        let mut state = self.lock();
        let id = PipelineCacheId(state.next_id());
        state.pipeline_caches.insert(id);
        Ok(id)
    }

    fn destroy_pipeline_cache(&self, id: PipelineCacheId) -> Result<(), DeviceError> {
        remove(&mut self.lock().pipeline_caches, id)
    }

    fn create_graphics_pipeline(
        &self,
        cache: Option<PipelineCacheId>,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, DeviceError> {
        let mut state = self.lock();
        if let Some(cache) = cache.filter(|cache| !state.pipeline_caches.contains(cache)) {
            return Err(invalid(cache));
        }
        if !state.pipeline_layouts.contains(&descriptor.layout) {
            return Err(invalid(descriptor.layout));
        }
        if !state.render_passes.contains(&descriptor.render_pass) {
            return Err(invalid(descriptor.render_pass));
        }
        if let Some(stage) = descriptor
            .stages
            .iter()
            .find(|stage| !state.shader_modules.contains(&stage.module))
        {
            return Err(invalid(stage.module));
        }
        let id = PipelineId(state.next_id());
        state.pipelines.insert(id, PipelineBindPoint::Graphics);
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        cache: Option<PipelineCacheId>,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, DeviceError> {
        let mut state = self.lock();
        if let Some(cache) = cache.filter(|cache| !state.pipeline_caches.contains(cache)) {
            return Err(invalid(cache));
        }
        if !state.pipeline_layouts.contains(&descriptor.layout) {
            return Err(invalid(descriptor.layout));
        }
        if !state.shader_modules.contains(&descriptor.stage.module) {
            return Err(invalid(descriptor.stage.module));
        }
        let id = PipelineId(state.next_id());
        state.pipelines.insert(id, PipelineBindPoint::Compute);
        Ok(id)
    }

    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), DeviceError> {
        self.lock()
            .pipelines
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn allocate_command_buffer(
        &self,
        level: CommandBufferLevel,
    ) -> Result<CommandBufferId, DeviceError> {
        let mut state = self.lock();
        let id = CommandBufferId(state.next_id());
        state.command_buffers.insert(
            id,
            CommandBufferEntry {
                level,
                commands: Vec::new(),
                recording: false,
                recordings: 0,
                executions: 0,
            },
        );
        Ok(id)
    }

    fn free_command_buffer(&self, id: CommandBufferId) -> Result<(), DeviceError> {
        self.lock()
            .command_buffers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn begin_command_buffer(
        &self,
        id: CommandBufferId,
        info: &CommandBufferBeginInfo,
    ) -> Result<Box<dyn CommandEncoder>, DeviceError> {
        let mut state = self.lock();
        if let Some(render_pass) = info.render_pass_continue {
            if !state.render_passes.contains(&render_pass) {
                return Err(invalid(render_pass));
            }
        }
        let entry = state.command_buffers.get_mut(&id).ok_or_else(|| invalid(id))?;
        entry.recording = true;
        entry.commands.clear();
        Ok(Box::new(RecordingEncoder::new(self.clone(), id)))
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceId, DeviceError> {
        let mut state = self.lock();
        let id = FenceId(state.next_id());
        state.fences.insert(id, signaled);
        Ok(id)
    }

    fn destroy_fence(&self, id: FenceId) -> Result<(), DeviceError> {
        self.lock()
            .fences
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn wait_for_fences(&self, fences: &[FenceId], _timeout_ns: u64) -> Result<(), DeviceError> {
        let state = self.lock();
        for fence in fences {
            // Work completes at submission, so an unsignaled fence never will be.
            if !*state.fences.get(fence).ok_or_else(|| invalid(*fence))? {
                return Err(DeviceError::api("vkWaitForFences", ResultCode::Timeout));
            }
        }
        Ok(())
    }

    fn reset_fences(&self, fences: &[FenceId]) -> Result<(), DeviceError> {
        let mut state = self.lock();
        for fence in fences {
            *state.fences.get_mut(fence).ok_or_else(|| invalid(*fence))? = false;
        }
        Ok(())
    }

    fn create_semaphore(&self) -> Result<SemaphoreId, DeviceError> {
        let mut state = self.lock();
        let id = SemaphoreId(state.next_id());
        state.semaphores.insert(id);
        Ok(id)
    }

    fn destroy_semaphore(&self, id: SemaphoreId) -> Result<(), DeviceError> {
        remove(&mut self.lock().semaphores, id)
    }

    fn queue_submit(&self, submit: &SubmitInfo, fence: Option<FenceId>) -> Result<(), DeviceError> {
        let mut state = self.lock();
        if let Some(semaphore) = submit
            .wait_semaphores
            .iter()
            .chain(submit.signal_semaphores)
            .find(|semaphore| !state.semaphores.contains(*semaphore))
        {
            return Err(invalid(*semaphore));
        }
        if let Some(fence) = fence {
            if !state.fences.contains_key(&fence) {
                return Err(invalid(fence));
            }
        }
        for &id in submit.command_buffers {
            let level = state
                .command_buffers
                .get(&id)
                .ok_or_else(|| invalid(id))?
                .level;
            if level != CommandBufferLevel::Primary {
                return Err(invalid(id));
            }
            state.execute(id)?;
        }
        if let Some(fence) = fence {
            state.fences.insert(fence, true);
        }
        state.submissions += 1;
        state.last_submitted = submit.command_buffers.to_vec();
        Ok(())
    }

    fn device_wait_idle(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn buffer(device: &HeadlessDevice, size: u64) -> BufferId {
        device
            .create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed("test")),
                size,
                usage: BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
            })
            .unwrap()
    }

    #[test]
    fn test_copy_moves_bytes_on_submit() {
        let device = HeadlessDevice::new();
        let src = buffer(&device, 4);
        let dst = buffer(&device, 4);
        let host = device.allocate_memory(16, 1).unwrap();
        let local = device.allocate_memory(16, 0).unwrap();
        device.bind_buffer_memory(src, host, 0).unwrap();
        device.bind_buffer_memory(dst, local, 0).unwrap();
        device.write_memory(host, 0, &[1, 2, 3, 4]).unwrap();

        let commands = device.allocate_command_buffer(CommandBufferLevel::Primary).unwrap();
        let mut encoder = device
            .begin_command_buffer(commands, &CommandBufferBeginInfo::default())
            .unwrap();
        encoder.copy_buffer(
            src,
            dst,
            &[BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: 4,
            }],
        );
        encoder.finish().unwrap();
        let fence = device.create_fence(false).unwrap();
        device
            .queue_submit(
                &SubmitInfo {
                    command_buffers: &[commands],
                    ..Default::default()
                },
                Some(fence),
            )
            .unwrap();

        device.wait_for_fences(&[fence], 0).unwrap();
        assert_eq!(device.read_buffer(dst), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_device_local_memory_is_not_mappable() {
        let device = HeadlessDevice::new();
        let local = device.allocate_memory(16, 0).unwrap();
        assert_eq!(
            device.write_memory(local, 0, &[0]),
            Err(DeviceError::NotHostVisible(local))
        );
    }

    #[test]
    fn test_double_bind_is_rejected() {
        let device = HeadlessDevice::new();
        let id = buffer(&device, 16);
        let memory = device.allocate_memory(32, 1).unwrap();
        device.bind_buffer_memory(id, memory, 0).unwrap();
        assert!(matches!(
            device.bind_buffer_memory(id, memory, 16),
            Err(DeviceError::AlreadyBound(_))
        ));
    }

    #[test]
    fn test_unsignaled_fence_times_out() {
        let device = HeadlessDevice::new();
        let fence = device.create_fence(false).unwrap();
        let err = device.wait_for_fences(&[fence], 1_000).unwrap_err();
        assert_eq!(err, DeviceError::api("vkWaitForFences", ResultCode::Timeout));
    }

    #[test]
    fn test_failure_injection_consumes_one_allocation() {
        let device = HeadlessDevice::new();
        device.fail_next_allocations(1);
        assert!(device.allocate_memory(16, 0).is_err());
        assert!(device.allocate_memory(16, 0).is_ok());
    }

    #[test]
    fn test_destroying_a_pool_frees_its_sets() {
        let device = HeadlessDevice::new();
        let layout = device
            .create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
                label: None,
                bindings: &[],
            })
            .unwrap();
        let pool = device
            .create_descriptor_pool(&DescriptorPoolDescriptor {
                label: None,
                max_sets: 1,
                pool_sizes: &[],
            })
            .unwrap();
        device.allocate_descriptor_set(pool, layout).unwrap();
        assert!(device.allocate_descriptor_set(pool, layout).is_err());
        device.destroy_descriptor_pool(pool).unwrap();
        assert_eq!(device.counts().descriptor_sets, 0);
    }
}
