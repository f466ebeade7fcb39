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

//! The per-phase state records nodes communicate through.
//!
//! Each phase context carries one of these as its public `state` field.
//! Producer nodes write a field, consumer nodes later in the traversal read
//! it. A [`Separator`](crate::Separator) clones the record on entry and puts
//! the clone back on exit, so every record is cheap to clone: host data is
//! shared through `Arc`, everything else is handles and small vectors.

use canopy_core::math::{Aabb, Mat4};
use canopy_core::renderer::api::*;
use std::sync::Arc;

/// A buffer and its requested size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRef {
    pub buffer: BufferId,
    pub size: u64,
}

/// Host-side contents destined for a buffer.
#[derive(Debug, Clone)]
pub struct HostData {
    pub bytes: Arc<[u8]>,
    /// Size in bytes of one element.
    pub element_size: u32,
    /// Number of elements.
    pub count: u32,
    /// Bounds of the elements, if they are positions.
    pub bounds: Option<Aabb>,
}

impl HostData {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// An image view ready to be bound, and the layout it will be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub view: ImageViewId,
    pub layout: ImageLayout,
}

/// State of the Allocate and Resize phases.
#[derive(Debug, Clone, Default)]
pub struct AllocState {
    /// Latest host data description.
    pub buffer_data: Option<HostData>,
    /// Latest buffer created.
    pub buffer: Option<BufferRef>,
}

/// State of the Stage phase.
#[derive(Debug, Clone, Default)]
pub struct StageState {
    pub buffer_data: Option<HostData>,
    pub buffer: Option<BufferRef>,
}

/// State of the BuildPipeline phase.
///
/// Accumulates everything a pipeline-building command node consumes.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub buffer: Option<BufferRef>,
    pub image: Option<ImageRef>,
    pub sampler: Option<SamplerId>,
    pub shader_stages: Vec<ShaderStageInfo>,
    pub vertex_bindings: Vec<VertexInputBinding>,
    pub vertex_attributes: Vec<VertexInputAttribute>,
    pub layout_bindings: Vec<DescriptorSetLayoutBinding>,
    pub pool_sizes: Vec<DescriptorPoolSize>,
    pub writes: Vec<WriteDescriptor>,
    pub rasterization: RasterizationState,
}

/// A vertex buffer bound at a binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub binding: u32,
    pub buffer: BufferId,
    pub offset: u64,
}

/// The index buffer of the next draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBinding {
    pub buffer: BufferId,
    pub format: IndexFormat,
    /// Number of indices in the buffer.
    pub count: u32,
}

/// State of the Record phase.
#[derive(Debug, Clone, Default)]
pub struct RecordState {
    pub buffer: Option<BufferRef>,
    pub vertex_buffers: Vec<VertexBufferBinding>,
    /// Vertex count derived from the first per-vertex binding.
    pub vertex_count: Option<u32>,
    pub index: Option<IndexBinding>,
}

/// State of the Render phase: the current transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub model_matrix: Mat4,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            model_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
        }
    }
}

/// State of a bounding box query: the accumulated model transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsState {
    pub model_matrix: Mat4,
}

impl Default for BoundsState {
    fn default() -> Self {
        Self {
            model_matrix: Mat4::IDENTITY,
        }
    }
}
