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

//! Pipeline objects and the fixed-function state that goes into them.

use crate::renderer::api::{DescriptorSetLayoutId, ShaderModuleId, ShaderStage};
use std::borrow::Cow;

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a point.
    PointList,
    /// Each pair of vertices is a line.
    LineList,
    /// Consecutive vertices form a connected line.
    LineStrip,
    /// Each triple of vertices is a triangle.
    #[default]
    TriangleList,
    /// Consecutive vertices form connected triangles.
    TriangleStrip,
}

/// Format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One `f32`.
    Float32,
    /// Two `f32`.
    Float32x2,
    /// Three `f32`.
    Float32x3,
    /// Four `f32`.
    Float32x4,
    /// One `u32`.
    Uint32,
    /// Four normalized `u8`.
    Unorm8x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Unorm8x4 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// Whether a vertex binding advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexInputRate {
    /// Advance once per vertex.
    #[default]
    Vertex,
    /// Advance once per instance.
    Instance,
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub fn size(&self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// A vertex buffer binding slot of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInputBinding {
    /// Binding slot number.
    pub binding: u32,
    /// Distance in bytes between consecutive elements.
    pub stride: u32,
    /// Per-vertex or per-instance stepping.
    pub input_rate: VertexInputRate,
}

/// A vertex attribute read from a binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInputAttribute {
    /// Shader input location.
    pub location: u32,
    /// Binding slot the attribute reads from.
    pub binding: u32,
    /// Attribute format.
    pub format: VertexFormat,
    /// Offset inside one element.
    pub offset: u32,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    #[default]
    Back,
    /// Cull everything.
    FrontAndBack,
}

/// Winding order of front faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise triangles face the viewer.
    #[default]
    CounterClockwise,
    /// Clockwise triangles face the viewer.
    Clockwise,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    /// Filled polygons.
    #[default]
    Fill,
    /// Polygon edges only.
    Line,
    /// Polygon vertices only.
    Point,
}

/// Fixed-function rasterization and depth state of a graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizationState {
    /// Face culling.
    pub cull_mode: CullMode,
    /// Front-face winding.
    pub front_face: FrontFace,
    /// Polygon fill mode.
    pub polygon_mode: PolygonMode,
    /// Whether fragments are depth tested.
    pub depth_test: bool,
    /// Whether passing fragments write depth.
    pub depth_write: bool,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            depth_test: true,
            depth_write: true,
        }
    }
}

/// One shader stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStageInfo {
    /// The stage the module runs in.
    pub stage: ShaderStage,
    /// The module.
    pub module: ShaderModuleId,
    /// Entry point name.
    pub entry_point: Cow<'static, str>,
}

/// Whether a pipeline or descriptor set is used for drawing or dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    /// Graphics pipelines.
    Graphics,
    /// Compute pipelines.
    Compute,
}

/// A descriptor used to create a [`PipelineLayoutId`].
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Descriptor set layouts, by set index.
    pub set_layouts: &'a [DescriptorSetLayoutId],
}

/// A descriptor used to create a graphics [`PipelineId`].
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The pipeline layout.
    pub layout: PipelineLayoutId,
    /// Render pass the pipeline is used inside.
    pub render_pass: RenderPassId,
    /// Shader stages.
    pub stages: &'a [ShaderStageInfo],
    /// Vertex buffer binding slots.
    pub vertex_bindings: &'a [VertexInputBinding],
    /// Vertex attributes.
    pub vertex_attributes: &'a [VertexInputAttribute],
    /// Primitive assembly.
    pub topology: PrimitiveTopology,
    /// Rasterization and depth state.
    pub rasterization: RasterizationState,
}

/// A descriptor used to create a compute [`PipelineId`].
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The pipeline layout.
    pub layout: PipelineLayoutId,
    /// The compute stage.
    pub stage: &'a ShaderStageInfo,
}

define_handle!(
    /// An opaque handle to a graphics or compute pipeline.
    PipelineId
);
define_handle!(
    /// An opaque handle to a pipeline layout.
    PipelineLayoutId
);
define_handle!(
    /// An opaque handle to a pipeline cache.
    PipelineCacheId
);
define_handle!(
    /// An opaque handle to a render pass, supplied by the surface.
    RenderPassId
);
