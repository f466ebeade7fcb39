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

//! Vertex input layout and index buffers.

use crate::context::{CommandRecorder, PipelineCreator};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use crate::state::{IndexBinding, VertexBufferBinding};
use canopy_core::renderer::api::*;

/// Declares a vertex buffer binding slot and binds the current buffer to it.
///
/// On Record, the first per-vertex binding also sets the vertex count of
/// the following draws to `buffer size / stride`.
#[derive(Debug, Clone, Copy)]
pub struct VertexBinding {
    description: VertexInputBinding,
}

impl VertexBinding {
    pub fn new(binding: u32, stride: u32) -> Self {
        Self::with_rate(binding, stride, VertexInputRate::Vertex)
    }

    pub fn with_rate(binding: u32, stride: u32, input_rate: VertexInputRate) -> Self {
        Self {
            description: VertexInputBinding {
                binding,
                stride,
                input_rate,
            },
        }
    }

    pub fn description(&self) -> &VertexInputBinding {
        &self.description
    }
}

impl Node for VertexBinding {
    fn kind(&self) -> NodeKind {
        NodeKind::VertexBinding
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        creator.state.vertex_bindings.push(self.description);
        Ok(())
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        let buffer = recorder
            .state
            .buffer
            .ok_or_else(|| SceneError::missing("VertexBinding", "a vertex buffer"))?;
        let state = &mut recorder.state;
        state.vertex_buffers.push(VertexBufferBinding {
            binding: self.description.binding,
            buffer: buffer.buffer,
            offset: 0,
        });
        if self.description.input_rate == VertexInputRate::Vertex
            && state.vertex_count.is_none()
            && self.description.stride > 0
        {
            state.vertex_count = Some((buffer.size / u64::from(self.description.stride)) as u32);
        }
        Ok(())
    }
}

typed_node!(VertexBinding, VertexBinding);

/// Declares one vertex attribute read from a binding slot.
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    description: VertexInputAttribute,
}

impl VertexAttribute {
    pub fn new(location: u32, binding: u32, format: VertexFormat, offset: u32) -> Self {
        Self {
            description: VertexInputAttribute {
                location,
                binding,
                format,
                offset,
            },
        }
    }
}

impl Node for VertexAttribute {
    fn kind(&self) -> NodeKind {
        NodeKind::VertexAttribute
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        creator.state.vertex_attributes.push(self.description);
        Ok(())
    }
}

typed_node!(VertexAttribute, VertexAttribute);

/// Marks the current buffer as the index buffer of the following draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBufferDescription {
    format: IndexFormat,
}

impl IndexBufferDescription {
    pub fn new(format: IndexFormat) -> Self {
        Self { format }
    }
}

impl Node for IndexBufferDescription {
    fn kind(&self) -> NodeKind {
        NodeKind::IndexBuffer
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        let buffer = recorder
            .state
            .buffer
            .ok_or_else(|| SceneError::missing("IndexBufferDescription", "an index buffer"))?;
        recorder.state.index = Some(IndexBinding {
            buffer: buffer.buffer,
            format: self.format,
            count: (buffer.size / self.format.size()) as u32,
        });
        Ok(())
    }
}

typed_node!(IndexBufferDescription, IndexBuffer);
