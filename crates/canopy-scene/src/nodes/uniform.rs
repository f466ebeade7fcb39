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

use crate::context::{Allocator, PipelineCreator, SceneRenderer};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use crate::state::BufferRef;
use bytemuck::{Pod, Zeroable};
use canopy_core::math::Mat4;
use canopy_core::renderer::api::*;
use std::borrow::Cow;

/// The uniform block written by [`TransformBuffer`], std140 compatible.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformUniforms {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl TransformUniforms {
    pub fn new(model_view: Mat4, projection: Mat4) -> Self {
        Self {
            model_view: model_view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }
}

/// A host-visible uniform buffer holding the current transforms.
///
/// Rewritten every frame from the Render state, so that it reflects the
/// camera and every [`Transform`](crate::nodes::Transform) above it. Publishes
/// itself as the current buffer during BuildPipeline; follow it with a
/// [`DescriptorBinding`](crate::nodes::DescriptorBinding) to expose it.
#[derive(Debug, Default)]
pub struct TransformBuffer {
    buffer: Option<BufferRef>,
    // Last contents written, for inspection.
    uniforms: Option<TransformUniforms>,
}

impl TransformBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> Option<BufferRef> {
        self.buffer
    }

    pub fn uniforms(&self) -> Option<&TransformUniforms> {
        self.uniforms.as_ref()
    }
}

impl Node for TransformBuffer {
    fn kind(&self) -> NodeKind {
        NodeKind::TransformBuffer
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        if let Some(current) = self.buffer {
            if allocator.resources().is_buffer_bound(current.buffer) {
                return Ok(());
            }
            allocator.resources().destroy_buffer(current.buffer)?;
        }
        let size = std::mem::size_of::<TransformUniforms>() as u64;
        let id = allocator.create_buffer(
            &BufferDescriptor {
                label: Some(Cow::Borrowed("transform uniforms")),
                size,
                usage: BufferUsage::UNIFORM,
            },
            MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
        )?;
        self.buffer = Some(BufferRef { buffer: id, size });
        Ok(())
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let buffer = self.buffer.ok_or_else(|| {
            SceneError::protocol("TransformBuffer", "used before it was allocated")
        })?;
        creator.state.buffer = Some(buffer);
        Ok(())
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        let buffer = self.buffer.ok_or_else(|| {
            SceneError::protocol("TransformBuffer", "rendered before it was allocated")
        })?;
        let state = &renderer.state;
        let uniforms = TransformUniforms::new(
            state.view_matrix * state.model_matrix,
            state.projection_matrix,
        );
        renderer.write_buffer(buffer.buffer, 0, bytemuck::bytes_of(&uniforms))?;
        self.uniforms = Some(uniforms);
        Ok(())
    }
}

typed_node!(TransformBuffer, TransformBuffer);
