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

//! Command recording shared by the backends.

use canopy_core::renderer::api::*;
use canopy_core::renderer::{CommandEncoder, DeviceError, ResultCode};
use std::fmt::Debug;

/// A command captured by a [`RecordingEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    CopyBuffer {
        source: BufferId,
        destination: BufferId,
        regions: Vec<BufferCopy>,
    },
    CopyBufferToImage {
        source: BufferId,
        destination: ImageId,
        layout: ImageLayout,
        regions: Vec<BufferImageCopy>,
    },
    TransitionImageLayout {
        image: ImageId,
        old: ImageLayout,
        new: ImageLayout,
    },
    BeginRenderPass {
        info: RenderPassBeginInfo,
        contents: SubpassContents,
    },
    EndRenderPass,
    BindPipeline {
        bind_point: PipelineBindPoint,
        pipeline: PipelineId,
    },
    BindDescriptorSets {
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: Vec<DescriptorSetId>,
    },
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<BufferId>,
        offsets: Vec<u64>,
    },
    BindIndexBuffer {
        buffer: BufferId,
        offset: u64,
        format: IndexFormat,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    ExecuteCommands(Vec<CommandBufferId>),
}

/// Where a [`RecordingEncoder`] delivers its commands on `finish`.
pub(crate) trait CommandSink: Debug + Send + 'static {
    fn store_recording(
        &self,
        id: CommandBufferId,
        commands: Vec<RecordedCommand>,
    ) -> Result<(), DeviceError>;
}

/// Records commands into a list, handed to its sink on `finish`.
///
/// Backends replay the list at submission time, which is what lets a
/// secondary command buffer be recorded once and executed every frame.
#[derive(Debug)]
pub(crate) struct RecordingEncoder<S: CommandSink> {
    sink: S,
    id: CommandBufferId,
    commands: Vec<RecordedCommand>,
}

impl<S: CommandSink> RecordingEncoder<S> {
    pub(crate) fn new(sink: S, id: CommandBufferId) -> Self {
        Self {
            sink,
            id,
            commands: Vec::new(),
        }
    }
}

/// Checks that every render pass begun in `commands` is ended, without nesting.
fn render_passes_balanced(commands: &[RecordedCommand]) -> bool {
    let mut open = false;
    for command in commands {
        match command {
            RecordedCommand::BeginRenderPass { .. } if open => return false,
            RecordedCommand::BeginRenderPass { .. } => open = true,
            RecordedCommand::EndRenderPass if !open => return false,
            RecordedCommand::EndRenderPass => open = false,
            _ => {}
        }
    }
    !open
}

impl<S: CommandSink> CommandEncoder for RecordingEncoder<S> {
    fn copy_buffer(&mut self, source: BufferId, destination: BufferId, regions: &[BufferCopy]) {
        self.commands.push(RecordedCommand::CopyBuffer {
            source,
            destination,
            regions: regions.to_vec(),
        });
    }

    fn copy_buffer_to_image(
        &mut self,
        source: BufferId,
        destination: ImageId,
        layout: ImageLayout,
        regions: &[BufferImageCopy],
    ) {
        self.commands.push(RecordedCommand::CopyBufferToImage {
            source,
            destination,
            layout,
            regions: regions.to_vec(),
        });
    }

    fn transition_image_layout(&mut self, image: ImageId, old: ImageLayout, new: ImageLayout) {
        self.commands
            .push(RecordedCommand::TransitionImageLayout { image, old, new });
    }

    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo, contents: SubpassContents) {
        self.commands.push(RecordedCommand::BeginRenderPass {
            info: *info,
            contents,
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineId) {
        self.commands.push(RecordedCommand::BindPipeline {
            bind_point,
            pipeline,
        });
    }

    fn bind_descriptor_sets(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: &[DescriptorSetId],
    ) {
        self.commands.push(RecordedCommand::BindDescriptorSets {
            bind_point,
            layout,
            first_set,
            sets: sets.to_vec(),
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.commands.push(RecordedCommand::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, scissor: &Rect2D) {
        self.commands.push(RecordedCommand::SetScissor(*scissor));
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[BufferId], offsets: &[u64]) {
        self.commands.push(RecordedCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
            offsets: offsets.to_vec(),
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64, format: IndexFormat) {
        self.commands.push(RecordedCommand::BindIndexBuffer {
            buffer,
            offset,
            format,
        });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn execute_commands(&mut self, buffers: &[CommandBufferId]) {
        self.commands
            .push(RecordedCommand::ExecuteCommands(buffers.to_vec()));
    }

    fn finish(self: Box<Self>) -> Result<(), DeviceError> {
        let RecordingEncoder { sink, id, commands } = *self;
        if !render_passes_balanced(&commands) {
            return Err(DeviceError::api(
                "vkEndCommandBuffer",
                ResultCode::Unknown(-1),
            ));
        }
        sink.store_recording(id, commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbalanced_render_pass_is_rejected() {
        let begin = RecordedCommand::BeginRenderPass {
            info: RenderPassBeginInfo {
                render_pass: RenderPassId(1),
                framebuffer: FramebufferId(2),
                render_area: Rect2D::default(),
                clear_color: [0.0; 4],
                clear_depth: 1.0,
            },
            contents: SubpassContents::Inline,
        };
        assert!(render_passes_balanced(&[]));
        assert!(render_passes_balanced(&[begin.clone(), RecordedCommand::EndRenderPass]));
        assert!(!render_passes_balanced(&[begin.clone()]));
        assert!(!render_passes_balanced(&[begin.clone(), begin]));
        assert!(!render_passes_balanced(&[RecordedCommand::EndRenderPass]));
    }
}
