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
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::conversions::IntoWgpu;
use super::replay;

const HOST_VISIBLE_TYPE: u32 = 1;

pub(super) fn invalid(handle: impl Debug) -> DeviceError {
    DeviceError::InvalidHandle(format!("{handle:?}"))
}

#[derive(Debug)]
pub(super) struct BufferEntry {
    label: Option<String>,
    size: u64,
    usage: BufferUsage,
    binding: Option<(MemoryId, u64)>,
    pub(super) raw: Option<wgpu::Buffer>,
}

#[derive(Debug)]
pub(super) struct ImageEntry {
    descriptor: ImageDescriptor<'static>,
    size: u64,
    pub(super) raw: Option<wgpu::Texture>,
}

#[derive(Debug)]
struct MemoryEntry {
    size: u64,
    // Host copy of host-visible memory; device-local memory has none.
    shadow: Option<Vec<u8>>,
}

#[derive(Debug)]
struct SetLayoutEntry {
    raw: wgpu::BindGroupLayout,
    bindings: Vec<DescriptorSetLayoutBinding>,
}

#[derive(Debug)]
struct PoolEntry {
    max_sets: u32,
    sets: Vec<DescriptorSetId>,
}

#[derive(Debug)]
pub(super) struct SetEntry {
    layout: DescriptorSetLayoutId,
    writes: Vec<WriteDescriptor>,
    pub(super) bind_group: Option<wgpu::BindGroup>,
}

#[derive(Debug)]
pub(super) enum PipelineEntry {
    Render(wgpu::RenderPipeline),
    Compute(wgpu::ComputePipeline),
}

#[derive(Debug)]
pub(super) struct CommandBufferEntry {
    level: CommandBufferLevel,
    pub(super) commands: Vec<RecordedCommand>,
}

/// Every object a [`WgpuDevice`] has handed out an ID for.
#[derive(Debug, Default)]
pub(super) struct WgpuState {
    next_id: u64,
    pub(super) buffers: HashMap<BufferId, BufferEntry>,
    pub(super) images: HashMap<ImageId, ImageEntry>,
    memory: HashMap<MemoryId, MemoryEntry>,
    views: HashMap<ImageViewId, wgpu::TextureView>,
    samplers: HashMap<SamplerId, wgpu::Sampler>,
    shader_modules: HashMap<ShaderModuleId, wgpu::ShaderModule>,
    set_layouts: HashMap<DescriptorSetLayoutId, SetLayoutEntry>,
    pools: HashMap<DescriptorPoolId, PoolEntry>,
    pub(super) sets: HashMap<DescriptorSetId, SetEntry>,
    pipeline_layouts: HashMap<PipelineLayoutId, wgpu::PipelineLayout>,
    pipeline_caches: HashSet<PipelineCacheId>,
    pub(super) pipelines: HashMap<PipelineId, PipelineEntry>,
    pub(super) command_buffers: HashMap<CommandBufferId, CommandBufferEntry>,
    fences: HashMap<FenceId, bool>,
    semaphores: HashSet<SemaphoreId>,
    render_passes: HashMap<RenderPassId, wgpu::TextureFormat>,
    pub(super) framebuffers: HashMap<FramebufferId, Option<wgpu::TextureView>>,
}

impl WgpuState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Host copy of the bytes a buffer is bound to.
    pub(super) fn buffer_contents(&self, id: BufferId) -> Result<&[u8], DeviceError> {
        let entry = self.buffers.get(&id).ok_or_else(|| invalid(id))?;
        let (memory, offset) = entry.binding.ok_or_else(|| invalid(id))?;
        let shadow = self
            .memory
            .get(&memory)
            .and_then(|memory| memory.shadow.as_deref())
            .ok_or(DeviceError::NotHostVisible(memory))?;
        let start = offset as usize;
        Ok(&shadow[start..start + entry.size as usize])
    }
}

#[derive(Debug)]
struct WgpuShared {
    device: wgpu::Device,
    queue: wgpu::Queue,
    state: Mutex<WgpuState>,
}

/// A [`GraphicsDevice`] on top of `wgpu`.
///
/// `wgpu` has no separate memory objects, so memory blocks are bookkeeping:
/// the `wgpu` buffer or texture is created when a resource is bound, and
/// host-visible blocks keep a host copy that writes are forwarded from.
/// Command buffers are recorded as data and replayed into a `wgpu` encoder at
/// submission. Fences and semaphores are tracked on the host; the queue orders
/// submissions and presentation by itself.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    shared: Arc<WgpuShared>,
}

impl WgpuDevice {
    pub(super) fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            shared: Arc::new(WgpuShared {
                device,
                queue,
                state: Mutex::new(WgpuState::default()),
            }),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, WgpuState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn raw_device(&self) -> &wgpu::Device {
        &self.shared.device
    }

    pub(super) fn register_render_pass(&self, format: wgpu::TextureFormat) -> RenderPassId {
        let mut state = self.lock();
        let id = RenderPassId(state.next_id());
        state.render_passes.insert(id, format);
        id
    }

    pub(super) fn update_render_pass(&self, id: RenderPassId, format: wgpu::TextureFormat) {
        self.lock().render_passes.insert(id, format);
    }

    pub(super) fn unregister_render_pass(&self, id: RenderPassId) {
        self.lock().render_passes.remove(&id);
    }

    pub(super) fn register_framebuffer(&self) -> FramebufferId {
        let mut state = self.lock();
        let id = FramebufferId(state.next_id());
        state.framebuffers.insert(id, None);
        id
    }

    /// Points a framebuffer at the swapchain texture acquired for this frame.
    pub(super) fn set_framebuffer_view(&self, id: FramebufferId, view: Option<wgpu::TextureView>) {
        self.lock().framebuffers.insert(id, view);
    }

    pub(super) fn unregister_framebuffer(&self, id: FramebufferId) {
        self.lock().framebuffers.remove(&id);
    }

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
        ]
    }

    fn wait_idle(&self, call: &'static str) -> Result<(), DeviceError> {
        self.shared
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| {
                log::error!("WgpuDevice: poll failed: {e:?}");
                DeviceError::api(call, ResultCode::DeviceLost)
            })
    }
}

/// Layout entries for one Canopy binding.
///
/// A combined image sampler becomes a texture at `binding` and a sampler at
/// `binding + 1`; WGSL shaders declare them that way.
fn layout_entries(binding: &DescriptorSetLayoutBinding) -> Vec<wgpu::BindGroupLayoutEntry> {
    let visibility = binding.stages.into_wgpu();
    let entry = |index: u32, ty: wgpu::BindingType| wgpu::BindGroupLayoutEntry {
        binding: index,
        visibility,
        ty,
        count: None,
    };
    let texture = wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    };
    let sampler = wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering);
    match binding.ty {
        DescriptorType::UniformBuffer => vec![entry(
            binding.binding,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        )],
        DescriptorType::StorageBuffer => vec![entry(
            binding.binding,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        )],
        DescriptorType::SampledImage => vec![entry(binding.binding, texture)],
        DescriptorType::StorageImage => vec![entry(
            binding.binding,
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba8Unorm,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
        )],
        DescriptorType::Sampler => vec![entry(binding.binding, sampler)],
        DescriptorType::CombinedImageSampler => vec![
            entry(binding.binding, texture),
            entry(binding.binding + 1, sampler),
        ],
    }
}

impl CommandSink for WgpuDevice {
    fn store_recording(
        &self,
        id: CommandBufferId,
        commands: Vec<RecordedCommand>,
    ) -> Result<(), DeviceError> {
        let mut state = self.lock();
        let entry = state.command_buffers.get_mut(&id).ok_or_else(|| invalid(id))?;
        entry.commands = commands;
        Ok(())
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Buffers and images ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, DeviceError> {
        let mut state = self.lock();
        let id = BufferId(state.next_id());
        state.buffers.insert(
            id,
            BufferEntry {
                label: descriptor.label.as_deref().map(str::to_owned),
                size: descriptor.size,
                usage: descriptor.usage,
                binding: None,
                raw: None,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), DeviceError> {
        let entry = self.lock().buffers.remove(&id).ok_or_else(|| invalid(id))?;
        if let Some(raw) = entry.raw {
            raw.destroy();
        }
        Ok(())
    }

    fn buffer_memory_requirements(&self, id: BufferId) -> Result<MemoryRequirements, DeviceError> {
        let state = self.lock();
        let entry = state.buffers.get(&id).ok_or_else(|| invalid(id))?;
        Ok(MemoryRequirements {
            size: align_up(entry.size, wgpu::COPY_BUFFER_ALIGNMENT),
            alignment: wgpu::COPY_BUFFER_ALIGNMENT,
            type_bits: 0b11,
        })
    }

    fn create_image(&self, descriptor: &ImageDescriptor) -> Result<ImageId, DeviceError> {
        let size = descriptor.extent.texel_count()
            * u64::from(descriptor.format.texel_size())
            * u64::from(descriptor.array_layers.max(1));
        let owned = ImageDescriptor {
            label: descriptor.label.as_deref().map(|l| Cow::Owned(l.to_owned())),
            dimension: descriptor.dimension,
            format: descriptor.format,
            extent: descriptor.extent,
            mip_levels: descriptor.mip_levels,
            array_layers: descriptor.array_layers,
            usage: descriptor.usage,
        };
        let mut state = self.lock();
        let id = ImageId(state.next_id());
        state.images.insert(
            id,
            ImageEntry {
                descriptor: owned,
                size,
                raw: None,
            },
        );
        Ok(id)
    }

    fn destroy_image(&self, id: ImageId) -> Result<(), DeviceError> {
        let entry = self.lock().images.remove(&id).ok_or_else(|| invalid(id))?;
        if let Some(raw) = entry.raw {
            raw.destroy();
        }
        Ok(())
    }

    fn image_memory_requirements(&self, id: ImageId) -> Result<MemoryRequirements, DeviceError> {
        let state = self.lock();
        let entry = state.images.get(&id).ok_or_else(|| invalid(id))?;
        Ok(MemoryRequirements {
            size: align_up(entry.size, wgpu::COPY_BUFFER_ALIGNMENT),
            alignment: wgpu::COPY_BUFFER_ALIGNMENT,
            type_bits: 0b01,
        })
    }

    // --- Memory ---

    fn memory_properties(&self) -> MemoryProperties {
        MemoryProperties {
            types: Self::memory_types(),
        }
    }

    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<MemoryId, DeviceError> {
        if memory_type_index as usize >= Self::memory_types().len() {
            return Err(DeviceError::api(
                "vkAllocateMemory",
                ResultCode::Unknown(-1),
            ));
        }
        let shadow = (memory_type_index == HOST_VISIBLE_TYPE).then(|| vec![0; size as usize]);
        let mut state = self.lock();
        let id = MemoryId(state.next_id());
        state.memory.insert(id, MemoryEntry { size, shadow });
        log::debug!("WgpuDevice: allocated {size} bytes of type {memory_type_index} as {id:?}");
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
        let block_size = state.memory.get(&memory).ok_or_else(|| invalid(memory))?.size;
        let entry = state.buffers.get_mut(&buffer).ok_or_else(|| invalid(buffer))?;
        if entry.binding.is_some() {
            return Err(DeviceError::AlreadyBound(format!("{buffer:?}")));
        }
        let padded = align_up(entry.size, wgpu::COPY_BUFFER_ALIGNMENT);
        if offset + padded > block_size {
            return Err(DeviceError::OutOfBounds {
                offset,
                len: padded,
                size: block_size,
            });
        }
        entry.raw = Some(self.shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: entry.label.as_deref(),
            size: padded,
            usage: entry.usage.into_wgpu(),
            mapped_at_creation: false,
        }));
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
        let block_size = state.memory.get(&memory).ok_or_else(|| invalid(memory))?.size;
        let entry = state.images.get_mut(&image).ok_or_else(|| invalid(image))?;
        if entry.raw.is_some() {
            return Err(DeviceError::AlreadyBound(format!("{image:?}")));
        }
        if offset + entry.size > block_size {
            return Err(DeviceError::OutOfBounds {
                offset,
                len: entry.size,
                size: block_size,
            });
        }
        let descriptor = &entry.descriptor;
        entry.raw = Some(self.shared.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.extent.into_wgpu(),
            mip_level_count: descriptor.mip_levels.max(1),
            sample_count: 1,
            dimension: descriptor.dimension.into_wgpu(),
            format: descriptor.format.into_wgpu(),
            usage: descriptor.usage.into_wgpu(),
            view_formats: &[],
        }));
        Ok(())
    }

    fn write_memory(&self, memory: MemoryId, offset: u64, data: &[u8]) -> Result<(), DeviceError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let entry = state.memory.get_mut(&memory).ok_or_else(|| invalid(memory))?;
        let size = entry.size;
        let shadow = entry
            .shadow
            .as_mut()
            .ok_or(DeviceError::NotHostVisible(memory))?;
        let len = data.len() as u64;
        if offset + len > size {
            return Err(DeviceError::OutOfBounds { offset, len, size });
        }
        shadow[offset as usize..(offset + len) as usize].copy_from_slice(data);

        // Forward the written range to every buffer bound inside it, widened to
        // the copy alignment wgpu requires.
        let shadow: &[u8] = shadow;
        for entry in state.buffers.values() {
            let (Some((bound, base)), Some(raw)) = (entry.binding, entry.raw.as_ref()) else {
                continue;
            };
            let end = base + entry.size;
            if bound != memory || offset >= end || offset + len <= base {
                continue;
            }
            let align = wgpu::COPY_BUFFER_ALIGNMENT;
            let start = (offset.max(base) - base) / align * align;
            let stop = align_up(
                (offset + len).min(end) - base,
                align,
            );
            let bytes = &shadow[(base + start) as usize..(base + stop) as usize];
            self.shared.queue.write_buffer(raw, start, bytes);
        }
        Ok(())
    }

    // --- Views, samplers, shaders ---

    fn create_image_view(&self, descriptor: &ImageViewDescriptor) -> Result<ImageViewId, DeviceError> {
        let mut state = self.lock();
        let image = state
            .images
            .get(&descriptor.image)
            .ok_or_else(|| invalid(descriptor.image))?;
        let raw = image.raw.as_ref().ok_or_else(|| invalid(descriptor.image))?;
        let view = raw.create_view(&wgpu::TextureViewDescriptor {
            label: descriptor.label.as_deref(),
            format: Some(descriptor.format.into_wgpu()),
            dimension: Some(descriptor.dimension.into_wgpu()),
            aspect: wgpu::TextureAspect::All,
            base_mip_level: descriptor.base_mip_level,
            mip_level_count: Some(descriptor.mip_level_count.max(1)),
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: Some(descriptor.array_layer_count.max(1)),
            ..Default::default()
        });
        let id = ImageViewId(state.next_id());
        state.views.insert(id, view);
        Ok(id)
    }

    fn destroy_image_view(&self, id: ImageViewId) -> Result<(), DeviceError> {
        self.lock()
            .views
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, DeviceError> {
        let sampler = self.shared.device.create_sampler(&wgpu::SamplerDescriptor {
            label: descriptor.label.as_deref(),
            address_mode_u: descriptor.address_mode_u.into_wgpu(),
            address_mode_v: descriptor.address_mode_v.into_wgpu(),
            address_mode_w: descriptor.address_mode_w.into_wgpu(),
            mag_filter: descriptor.mag_filter.into_wgpu(),
            min_filter: descriptor.min_filter.into_wgpu(),
            mipmap_filter: descriptor.mipmap_filter.into_wgpu(),
            ..Default::default()
        });
        let mut state = self.lock();
        let id = SamplerId(state.next_id());
        state.samplers.insert(id, sampler);
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), DeviceError> {
        self.lock()
            .samplers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, DeviceError> {
        let source = match &descriptor.source {
            ShaderSource::Wgsl(text) => wgpu::ShaderSource::Wgsl(text.clone()),
            ShaderSource::SpirV(_) => {
                log::error!(
                    "WgpuDevice: SPIR-V shader {:?} is not supported; provide WGSL",
                    descriptor.label
                );
                return Err(DeviceError::api(
                    "vkCreateShaderModule",
                    ResultCode::FormatNotSupported,
                ));
            }
        };
        let module = self
            .shared
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: descriptor.label.as_deref(),
                source,
            });
        let mut state = self.lock();
        let id = ShaderModuleId(state.next_id());
        state.shader_modules.insert(id, module);
        log::debug!("WgpuDevice: created shader module {:?} as {id:?}", descriptor.label);
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), DeviceError> {
        self.lock()
            .shader_modules
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    // --- Descriptors ---

    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutId, DeviceError> {
        let entries: Vec<_> = descriptor.bindings.iter().flat_map(layout_entries).collect();
        let raw = self
            .shared
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: descriptor.label.as_deref(),
                entries: &entries,
            });
        let mut state = self.lock();
        let id = DescriptorSetLayoutId(state.next_id());
        state.set_layouts.insert(
            id,
            SetLayoutEntry {
                raw,
                bindings: descriptor.bindings.to_vec(),
            },
        );
        Ok(id)
    }

    fn destroy_descriptor_set_layout(&self, id: DescriptorSetLayoutId) -> Result<(), DeviceError> {
        self.lock()
            .set_layouts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
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
        if !state.set_layouts.contains_key(&layout) {
            return Err(invalid(layout));
        }
        let id = DescriptorSetId(state.next_id());
        let entry = state.pools.get_mut(&pool).ok_or_else(|| invalid(pool))?;
        if entry.sets.len() as u32 >= entry.max_sets {
            return Err(DeviceError::api(
                "vkAllocateDescriptorSets",
                ResultCode::OutOfDeviceMemory,
            ));
        }
        entry.sets.push(id);
        state.sets.insert(
            id,
            SetEntry {
                layout,
                writes: Vec::new(),
                bind_group: None,
            },
        );
        Ok(id)
    }

    fn update_descriptor_set(
        &self,
        set: DescriptorSetId,
        writes: &[WriteDescriptor],
    ) -> Result<(), DeviceError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let entry = state.sets.get_mut(&set).ok_or_else(|| invalid(set))?;
        for write in writes {
            entry.writes.retain(|existing| {
                existing.binding != write.binding || existing.array_element != write.array_element
            });
            entry.writes.push(*write);
        }

        // A bind group can only be built once every binding has a resource.
        let entry = &state.sets[&set];
        let layout = state
            .set_layouts
            .get(&entry.layout)
            .ok_or_else(|| invalid(entry.layout))?;
        let complete = layout
            .bindings
            .iter()
            .all(|binding| entry.writes.iter().any(|w| w.binding == binding.binding));
        if !complete {
            return Ok(());
        }

        let mut entries = Vec::with_capacity(entry.writes.len() + 1);
        for write in &entry.writes {
            match write.resource {
                DescriptorResource::Buffer {
                    buffer,
                    offset,
                    range,
                } => {
                    let raw = state
                        .buffers
                        .get(&buffer)
                        .and_then(|b| b.raw.as_ref())
                        .ok_or_else(|| invalid(buffer))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: write.binding,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: raw,
                            offset,
                            size: NonZeroU64::new(range),
                        }),
                    });
                }
                DescriptorResource::Image { view, .. } => {
                    let view = state.views.get(&view).ok_or_else(|| invalid(view))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: write.binding,
                        resource: wgpu::BindingResource::TextureView(view),
                    });
                }
                DescriptorResource::CombinedImageSampler { view, sampler, .. } => {
                    let view = state.views.get(&view).ok_or_else(|| invalid(view))?;
                    let sampler = state.samplers.get(&sampler).ok_or_else(|| invalid(sampler))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: write.binding,
                        resource: wgpu::BindingResource::TextureView(view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: write.binding + 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    });
                }
                DescriptorResource::Sampler(sampler) => {
                    let sampler = state.samplers.get(&sampler).ok_or_else(|| invalid(sampler))?;
                    entries.push(wgpu::BindGroupEntry {
                        binding: write.binding,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    });
                }
            }
        }
        let bind_group = self
            .shared
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &layout.raw,
                entries: &entries,
            });
        drop(entries);
        if let Some(entry) = state.sets.get_mut(&set) {
            entry.bind_group = Some(bind_group);
        }
        Ok(())
    }

    // --- Pipelines ---

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, DeviceError> {
        let mut state = self.lock();
        let layouts = descriptor
            .set_layouts
            .iter()
            .map(|id| {
                state
                    .set_layouts
                    .get(id)
                    .map(|layout| &layout.raw)
                    .ok_or_else(|| invalid(*id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let raw = self
            .shared
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: descriptor.label.as_deref(),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            });
        drop(layouts);
        let id = PipelineLayoutId(state.next_id());
        state.pipeline_layouts.insert(id, raw);
        Ok(id)
    }

    fn destroy_pipeline_layout(&self, id: PipelineLayoutId) -> Result<(), DeviceError> {
        self.lock()
            .pipeline_layouts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    fn create_pipeline_cache(&self) -> Result<PipelineCacheId, DeviceError> {
        // wgpu caches pipelines internally; the handle only scopes the request.
        let mut state = self.lock();
        let id = PipelineCacheId(state.next_id());
        state.pipeline_caches.insert(id);
        Ok(id)
    }

    fn destroy_pipeline_cache(&self, id: PipelineCacheId) -> Result<(), DeviceError> {
        if self.lock().pipeline_caches.remove(&id) {
            Ok(())
        } else {
            Err(invalid(id))
        }
    }

    fn create_graphics_pipeline(
        &self,
        _cache: Option<PipelineCacheId>,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<PipelineId, DeviceError> {
        let mut state = self.lock();
        let layout = state
            .pipeline_layouts
            .get(&descriptor.layout)
            .ok_or_else(|| invalid(descriptor.layout))?;
        let format = *state
            .render_passes
            .get(&descriptor.render_pass)
            .ok_or_else(|| invalid(descriptor.render_pass))?;
        let stage = |wanted: ShaderStage| {
            descriptor
                .stages
                .iter()
                .find(|info| info.stage.contains(wanted))
                .map(|info| {
                    state
                        .shader_modules
                        .get(&info.module)
                        .map(|module| (module, info.entry_point.as_ref()))
                        .ok_or_else(|| invalid(info.module))
                })
                .transpose()
        };
        let (vertex_module, vertex_entry) = stage(ShaderStage::VERTEX)?.ok_or_else(|| {
            DeviceError::api("vkCreateGraphicsPipelines", ResultCode::InitializationFailed)
        })?;
        let fragment = stage(ShaderStage::FRAGMENT)?;

        // wgpu addresses vertex buffers by slot, so the layouts are indexed by binding.
        let slots = descriptor
            .vertex_bindings
            .iter()
            .map(|b| b.binding + 1)
            .max()
            .unwrap_or(0) as usize;
        let mut attributes = vec![Vec::new(); slots];
        for attribute in descriptor.vertex_attributes {
            if let Some(list) = attributes.get_mut(attribute.binding as usize) {
                list.push(wgpu::VertexAttribute {
                    format: attribute.format.into_wgpu(),
                    offset: u64::from(attribute.offset),
                    shader_location: attribute.location,
                });
            }
        }
        let mut buffers: Vec<wgpu::VertexBufferLayout> = attributes
            .iter()
            .map(|attributes| wgpu::VertexBufferLayout {
                array_stride: 0,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();
        for binding in descriptor.vertex_bindings {
            let layout = &mut buffers[binding.binding as usize];
            layout.array_stride = u64::from(binding.stride);
            layout.step_mode = binding.input_rate.into_wgpu();
        }

        let raster = descriptor.rasterization;
        let targets = [Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::REPLACE),
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let raw = self
            .shared
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some(vertex_entry),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: fragment.map(|(module, entry_point)| wgpu::FragmentState {
                    module,
                    entry_point: Some(entry_point),
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: descriptor.topology.into_wgpu(),
                    strip_index_format: None,
                    front_face: raster.front_face.into_wgpu(),
                    cull_mode: raster.cull_mode.into_wgpu(),
                    polygon_mode: raster.polygon_mode.into_wgpu(),
                    unclipped_depth: false,
                    conservative: false,
                },
                // The window surface carries no depth attachment.
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
        drop(buffers);
        let id = PipelineId(state.next_id());
        state.pipelines.insert(id, PipelineEntry::Render(raw));
        log::debug!("WgpuDevice: created graphics pipeline {:?} as {id:?}", descriptor.label);
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        _cache: Option<PipelineCacheId>,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, DeviceError> {
        let mut state = self.lock();
        let layout = state
            .pipeline_layouts
            .get(&descriptor.layout)
            .ok_or_else(|| invalid(descriptor.layout))?;
        let module = state
            .shader_modules
            .get(&descriptor.stage.module)
            .ok_or_else(|| invalid(descriptor.stage.module))?;
        let raw = self
            .shared
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: Some(layout),
                module,
                entry_point: Some(descriptor.stage.entry_point.as_ref()),
                compilation_options: Default::default(),
                cache: None,
            });
        let id = PipelineId(state.next_id());
        state.pipelines.insert(id, PipelineEntry::Compute(raw));
        Ok(id)
    }

    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), DeviceError> {
        self.lock()
            .pipelines
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| invalid(id))
    }

    // --- Commands ---

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
        _info: &CommandBufferBeginInfo,
    ) -> Result<Box<dyn CommandEncoder>, DeviceError> {
        if !self.lock().command_buffers.contains_key(&id) {
            return Err(invalid(id));
        }
        Ok(Box::new(RecordingEncoder::new(self.clone(), id)))
    }

    // --- Synchronization ---

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
        {
            let state = self.lock();
            for fence in fences {
                // Nothing was submitted against it, so it can never signal.
                if !*state.fences.get(fence).ok_or_else(|| invalid(*fence))? {
                    return Err(DeviceError::api("vkWaitForFences", ResultCode::Timeout));
                }
            }
        }
        self.wait_idle("vkWaitForFences")
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
        if self.lock().semaphores.remove(&id) {
            Ok(())
        } else {
            Err(invalid(id))
        }
    }

    fn queue_submit(&self, submit: &SubmitInfo, fence: Option<FenceId>) -> Result<(), DeviceError> {
        let mut state = self.lock();
        for &id in submit.command_buffers {
            let level = state
                .command_buffers
                .get(&id)
                .ok_or_else(|| invalid(id))?
                .level;
            if level != CommandBufferLevel::Primary {
                return Err(invalid(id));
            }
        }
        let commands = replay::encode_submission(
            &self.shared.device,
            &self.shared.queue,
            &state,
            submit.command_buffers,
        )?;
        self.shared.queue.submit([commands]);
        if let Some(fence) = fence {
            *state.fences.get_mut(&fence).ok_or_else(|| invalid(fence))? = true;
        }
        Ok(())
    }

    fn device_wait_idle(&self) -> Result<(), DeviceError> {
        self.wait_idle("vkDeviceWaitIdle")
    }
}
