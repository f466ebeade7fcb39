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

//! Command buffers and the parameters of recorded commands.

use crate::math::{Extent2D, Extent3D};
use crate::renderer::api::RenderPassId;

define_handle!(
    /// An opaque handle to a command buffer.
    CommandBufferId
);
define_handle!(
    /// An opaque handle to a framebuffer, supplied by the surface.
    FramebufferId
);

/// Whether a command buffer is submitted to a queue or executed from another buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferLevel {
    /// Submitted directly to a queue.
    Primary,
    /// Executed from a primary command buffer.
    Secondary,
}

/// How a command buffer is about to be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandBufferBeginInfo {
    /// The buffer is submitted once and then re-recorded.
    pub one_time_submit: bool,
    /// For secondary buffers executed inside a render pass: that render pass.
    pub render_pass_continue: Option<RenderPassId>,
}

/// Whether the commands of a subpass are recorded inline or come from secondary buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubpassContents {
    /// Commands are recorded in the primary buffer.
    Inline,
    /// Commands come from executed secondary buffers.
    SecondaryCommandBuffers,
}

/// A viewport transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Depth mapped from NDC 0.
    pub min_depth: f32,
    /// Depth mapped from NDC 1.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering `extent` with the full depth range.
    pub fn from_extent(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// An integer rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect2D {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Size.
    pub extent: Extent2D,
}

impl Rect2D {
    /// A rectangle at the origin covering `extent`.
    pub fn from_extent(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, extent }
    }
}

/// Parameters of a render pass instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassBeginInfo {
    /// The render pass.
    pub render_pass: RenderPassId,
    /// The framebuffer rendered into.
    pub framebuffer: FramebufferId,
    /// Area affected by the pass.
    pub render_area: Rect2D,
    /// Clear value of the color attachment.
    pub clear_color: [f32; 4],
    /// Clear value of the depth attachment.
    pub clear_depth: f32,
}

/// One region of a buffer-to-buffer copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferCopy {
    /// Offset in the source buffer.
    pub src_offset: u64,
    /// Offset in the destination buffer.
    pub dst_offset: u64,
    /// Number of bytes.
    pub size: u64,
}

/// One region of a buffer-to-image copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferImageCopy {
    /// Offset of the first texel in the buffer.
    pub buffer_offset: u64,
    /// Mip level written.
    pub mip_level: u32,
    /// Array layer written.
    pub array_layer: u32,
    /// Size of the region.
    pub image_extent: Extent3D,
}
