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
use std::fmt::Debug;

/// Records commands into a command buffer opened by
/// [`GraphicsDevice::begin_command_buffer`](crate::renderer::GraphicsDevice::begin_command_buffer).
///
/// Recording calls do not fail individually; invalid usage is reported by
/// [`finish`](CommandEncoder::finish).
pub trait CommandEncoder: Debug + Send {
    /// Copies regions between buffers.
    fn copy_buffer(&mut self, source: BufferId, destination: BufferId, regions: &[BufferCopy]);

    /// Copies regions of a buffer into an image in `layout`.
    fn copy_buffer_to_image(
        &mut self,
        source: BufferId,
        destination: ImageId,
        layout: ImageLayout,
        regions: &[BufferImageCopy],
    );

    /// Transitions every subresource of an image between layouts.
    fn transition_image_layout(&mut self, image: ImageId, old: ImageLayout, new: ImageLayout);

    /// Begins a render pass instance.
    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo, contents: SubpassContents);

    /// Ends the current render pass instance.
    fn end_render_pass(&mut self);

    /// Binds a pipeline.
    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineId);

    /// Binds descriptor sets starting at `first_set`.
    fn bind_descriptor_sets(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutId,
        first_set: u32,
        sets: &[DescriptorSetId],
    );

    /// Sets the dynamic viewport.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets the dynamic scissor rectangle.
    fn set_scissor(&mut self, scissor: &Rect2D);

    /// Binds vertex buffers to consecutive slots starting at `first_binding`.
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[BufferId], offsets: &[u64]);

    /// Binds an index buffer.
    fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64, format: IndexFormat);

    /// Draws non-indexed primitives.
    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    /// Draws indexed primitives.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    /// Dispatches compute work groups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Executes pre-recorded secondary command buffers.
    fn execute_commands(&mut self, buffers: &[CommandBufferId]);

    /// Ends recording.
    fn finish(self: Box<Self>) -> Result<(), DeviceError>;
}
