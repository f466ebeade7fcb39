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

use crate::context::PipelineCreator;
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use canopy_core::renderer::api::*;

/// Exposes the current buffer, image or sampler to shaders at a binding slot.
///
/// During BuildPipeline it appends one layout binding, one pool size and one
/// write to the pipeline state. The resource written depends on the
/// descriptor type:
///
/// | Type | Reads |
/// |---|---|
/// | `UniformBuffer`, `StorageBuffer` | `state.buffer` |
/// | `CombinedImageSampler` | `state.image` and `state.sampler` |
/// | `SampledImage`, `StorageImage` | `state.image` |
/// | `Sampler` | `state.sampler` |
#[derive(Debug, Clone, Copy)]
pub struct DescriptorBinding {
    binding: u32,
    ty: DescriptorType,
    stages: ShaderStage,
}

impl DescriptorBinding {
    pub fn new(binding: u32, ty: DescriptorType, stages: ShaderStage) -> Self {
        Self { binding, ty, stages }
    }

    pub fn uniform_buffer(binding: u32, stages: ShaderStage) -> Self {
        Self::new(binding, DescriptorType::UniformBuffer, stages)
    }

    pub fn storage_buffer(binding: u32, stages: ShaderStage) -> Self {
        Self::new(binding, DescriptorType::StorageBuffer, stages)
    }

    pub fn combined_image_sampler(binding: u32, stages: ShaderStage) -> Self {
        Self::new(binding, DescriptorType::CombinedImageSampler, stages)
    }

    pub fn storage_image(binding: u32, stages: ShaderStage) -> Self {
        Self::new(binding, DescriptorType::StorageImage, stages)
    }
}

impl Node for DescriptorBinding {
    fn kind(&self) -> NodeKind {
        NodeKind::DescriptorBinding
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        const NODE: &str = "DescriptorBinding";
        let state = &mut creator.state;
        let resource = match self.ty {
            DescriptorType::UniformBuffer | DescriptorType::StorageBuffer => {
                let buffer = state.buffer.ok_or_else(|| SceneError::missing(NODE, "a buffer"))?;
                DescriptorResource::Buffer {
                    buffer: buffer.buffer,
                    offset: 0,
                    range: buffer.size,
                }
            }
            DescriptorType::CombinedImageSampler => {
                let image = state.image.ok_or_else(|| SceneError::missing(NODE, "an image"))?;
                let sampler = state
                    .sampler
                    .ok_or_else(|| SceneError::missing(NODE, "a sampler"))?;
                DescriptorResource::CombinedImageSampler {
                    view: image.view,
                    sampler,
                    layout: image.layout,
                }
            }
            DescriptorType::SampledImage | DescriptorType::StorageImage => {
                let image = state.image.ok_or_else(|| SceneError::missing(NODE, "an image"))?;
                DescriptorResource::Image {
                    view: image.view,
                    layout: image.layout,
                }
            }
            DescriptorType::Sampler => DescriptorResource::Sampler(
                state
                    .sampler
                    .ok_or_else(|| SceneError::missing(NODE, "a sampler"))?,
            ),
        };

        state.layout_bindings.push(DescriptorSetLayoutBinding {
            binding: self.binding,
            ty: self.ty,
            count: 1,
            stages: self.stages,
        });
        state.pool_sizes.push(DescriptorPoolSize {
            ty: self.ty,
            count: 1,
        });
        state.writes.push(WriteDescriptor {
            binding: self.binding,
            array_element: 0,
            ty: self.ty,
            resource,
        });
        Ok(())
    }
}

typed_node!(DescriptorBinding, DescriptorBinding);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PipelineCreator;
    use crate::resources::ResourceTable;
    use crate::state::BufferRef;
    use canopy_infra::graphics::headless::HeadlessDevice;
    use std::sync::Arc;

    #[test]
    fn test_uniform_binding_writes_current_buffer() {
        let mut table = ResourceTable::new(Arc::new(HeadlessDevice::new()));
        let mut creator = PipelineCreator::new(&mut table, RenderPassId(1), None);
        creator.state.buffer = Some(BufferRef {
            buffer: BufferId(42),
            size: 128,
        });

        DescriptorBinding::uniform_buffer(0, ShaderStage::VERTEX)
            .pipeline(&mut creator)
            .unwrap();

        assert_eq!(creator.state.layout_bindings.len(), 1);
        assert_eq!(creator.state.pool_sizes[0].ty, DescriptorType::UniformBuffer);
        assert_eq!(
            creator.state.writes[0].resource,
            DescriptorResource::Buffer {
                buffer: BufferId(42),
                offset: 0,
                range: 128
            }
        );
    }

    #[test]
    fn test_missing_resource_is_a_protocol_error() {
        let mut table = ResourceTable::new(Arc::new(HeadlessDevice::new()));
        let mut creator = PipelineCreator::new(&mut table, RenderPassId(1), None);

        let err = DescriptorBinding::combined_image_sampler(1, ShaderStage::FRAGMENT)
            .pipeline(&mut creator)
            .unwrap_err();

        assert!(matches!(err, SceneError::MissingState { missing: "an image", .. }));
        assert!(creator.state.writes.is_empty());
    }
}
