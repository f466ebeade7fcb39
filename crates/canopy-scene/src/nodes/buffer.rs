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

//! Host data and the buffers it flows through.
//!
//! The usual chain is `BufferData -> HostBuffer -> DeviceBuffer`: the data
//! node describes the bytes, the host buffer holds them in mappable memory,
//! and the device buffer receives a copy in device-local memory.

use crate::context::{Allocator, BoundingBoxQuery, CommandRecorder, PipelineCreator, Stager};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use crate::state::{BufferRef, HostData};
use canopy_core::math::{Aabb, Vec3};
use canopy_core::renderer::api::*;
use std::borrow::Cow;
use std::sync::Arc;

/// Host-side contents for a buffer.
///
/// Publishes its description during Allocate and Stage; a following
/// [`HostBuffer`] sizes itself from it and uploads it.
#[derive(Debug, Clone)]
pub struct BufferData {
    data: HostData,
}

impl BufferData {
    /// Wraps a slice of plain-old-data elements.
    pub fn new<T: bytemuck::Pod>(values: &[T]) -> Self {
        let bytes: Arc<[u8]> = Arc::from(bytemuck::cast_slice::<T, u8>(values));
        Self {
            data: HostData {
                bytes,
                element_size: std::mem::size_of::<T>() as u32,
                count: values.len() as u32,
                bounds: None,
            },
        }
    }

    /// Wraps vertex positions and remembers their bounds.
    pub fn positions(points: &[Vec3]) -> Self {
        let flat: Vec<[f32; 3]> = points.iter().map(|p| p.to_array()).collect();
        let mut node = Self::new(&flat);
        node.data.bounds = Aabb::from_points(points);
        node
    }

    pub fn data(&self) -> &HostData {
        &self.data
    }

    pub fn len(&self) -> u32 {
        self.data.count
    }

    pub fn is_empty(&self) -> bool {
        self.data.count == 0
    }
}

impl Node for BufferData {
    fn kind(&self) -> NodeKind {
        NodeKind::BufferData
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        allocator.state.buffer_data = Some(self.data.clone());
        Ok(())
    }

    fn stage(&mut self, stager: &mut Stager<'_>) -> Result<(), SceneError> {
        stager.state.buffer_data = Some(self.data.clone());
        Ok(())
    }

    fn bounding_box(&self, query: &mut BoundingBoxQuery) {
        if let Some(bounds) = &self.data.bounds {
            query.extend_by(bounds);
        }
    }
}

typed_node!(BufferData, BufferData);

/// A buffer in host-visible, host-coherent memory.
///
/// Sized from the current buffer data during Allocate, filled from it during
/// Stage. Publishes itself as the current buffer in every build phase, so it
/// can feed a [`DeviceBuffer`] or be bound directly.
#[derive(Debug)]
pub struct HostBuffer {
    usage: BufferUsage,
    buffer: Option<BufferRef>,
}

impl HostBuffer {
    pub fn new(usage: BufferUsage) -> Self {
        Self {
            usage,
            buffer: None,
        }
    }

    pub fn buffer(&self) -> Option<BufferRef> {
        self.buffer
    }

    fn require_buffer(&self) -> Result<BufferRef, SceneError> {
        self.buffer
            .ok_or_else(|| SceneError::protocol("HostBuffer", "used before it was allocated"))
    }
}

impl Node for HostBuffer {
    fn kind(&self) -> NodeKind {
        NodeKind::HostBuffer
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        let data = allocator
            .state
            .buffer_data
            .clone()
            .ok_or_else(|| SceneError::missing("HostBuffer", "buffer data"))?;

        let reusable = self.buffer.filter(|current| {
            current.size == data.size() && allocator.resources().is_buffer_bound(current.buffer)
        });
        let buffer = match reusable {
            Some(current) => current,
            None => {
                if let Some(stale) = self.buffer.take() {
                    allocator.resources().destroy_buffer(stale.buffer)?;
                }
                let id = allocator.create_buffer(
                    &BufferDescriptor {
                        label: Some(Cow::Borrowed("host buffer")),
                        size: data.size(),
                        usage: self.usage | BufferUsage::COPY_SRC,
                    },
                    MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
                )?;
                BufferRef {
                    buffer: id,
                    size: data.size(),
                }
            }
        };
        self.buffer = Some(buffer);
        allocator.state.buffer = Some(buffer);
        Ok(())
    }

    fn stage(&mut self, stager: &mut Stager<'_>) -> Result<(), SceneError> {
        let buffer = self.require_buffer()?;
        let data = stager
            .state
            .buffer_data
            .clone()
            .ok_or_else(|| SceneError::missing("HostBuffer", "buffer data"))?;
        if data.size() != buffer.size {
            return Err(SceneError::protocol(
                "HostBuffer",
                format!(
                    "staged {} bytes into a buffer allocated for {}",
                    data.size(),
                    buffer.size
                ),
            ));
        }
        stager.write_buffer(buffer.buffer, 0, &data.bytes)?;
        stager.state.buffer = Some(buffer);
        Ok(())
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        creator.state.buffer = Some(self.require_buffer()?);
        Ok(())
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        recorder.state.buffer = Some(self.require_buffer()?);
        Ok(())
    }
}

typed_node!(HostBuffer, HostBuffer);

/// A buffer in device-local memory, filled by copying the current buffer.
#[derive(Debug)]
pub struct DeviceBuffer {
    usage: BufferUsage,
    buffer: Option<BufferRef>,
}

impl DeviceBuffer {
    pub fn new(usage: BufferUsage) -> Self {
        Self {
            usage,
            buffer: None,
        }
    }

    pub fn buffer(&self) -> Option<BufferRef> {
        self.buffer
    }

    fn require_buffer(&self) -> Result<BufferRef, SceneError> {
        self.buffer
            .ok_or_else(|| SceneError::protocol("DeviceBuffer", "used before it was allocated"))
    }
}

impl Node for DeviceBuffer {
    fn kind(&self) -> NodeKind {
        NodeKind::DeviceBuffer
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        let source = allocator
            .state
            .buffer
            .ok_or_else(|| SceneError::missing("DeviceBuffer", "a source buffer"))?;

        let reusable = self.buffer.filter(|current| {
            current.size == source.size && allocator.resources().is_buffer_bound(current.buffer)
        });
        let buffer = match reusable {
            Some(current) => current,
            None => {
                if let Some(stale) = self.buffer.take() {
                    allocator.resources().destroy_buffer(stale.buffer)?;
                }
                let id = allocator.create_buffer(
                    &BufferDescriptor {
                        label: Some(Cow::Borrowed("device buffer")),
                        size: source.size,
                        usage: self.usage | BufferUsage::COPY_DST,
                    },
                    MemoryProperty::DEVICE_LOCAL,
                )?;
                BufferRef {
                    buffer: id,
                    size: source.size,
                }
            }
        };
        self.buffer = Some(buffer);
        allocator.state.buffer = Some(buffer);
        Ok(())
    }

    fn stage(&mut self, stager: &mut Stager<'_>) -> Result<(), SceneError> {
        let buffer = self.require_buffer()?;
        let source = stager
            .state
            .buffer
            .ok_or_else(|| SceneError::missing("DeviceBuffer", "a source buffer"))?;
        stager.copy_buffer(source.buffer, buffer.buffer, source.size.min(buffer.size))?;
        stager.state.buffer = Some(buffer);
        Ok(())
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        creator.state.buffer = Some(self.require_buffer()?);
        Ok(())
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        recorder.state.buffer = Some(self.require_buffer()?);
        Ok(())
    }
}

typed_node!(DeviceBuffer, DeviceBuffer);
