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

use crate::math::Extent2D;
use crate::renderer::api::{FramebufferId, RenderPassId, SemaphoreId};
use crate::renderer::error::DeviceError;
use std::fmt::Debug;

/// The image a frame renders into, as returned by [`Surface::acquire_next_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainImage {
    /// Index of the swapchain image.
    pub index: u32,
    /// Framebuffer wrapping the image (and the shared depth attachment).
    pub framebuffer: FramebufferId,
    /// Semaphore signaled when the image is ready to be written, if the
    /// backend synchronizes acquisition on the device timeline.
    pub acquire_semaphore: Option<SemaphoreId>,
}

/// A presentation target: a swapchain, its render pass and framebuffers.
///
/// Acquisition and presentation report [`DeviceError::OutOfDate`] when the
/// surface no longer matches its window; the caller recreates it and retries.
pub trait Surface: Send + Debug {
    /// Current size of the swapchain images.
    fn extent(&self) -> Extent2D;

    /// Render pass compatible with every framebuffer of the surface.
    fn render_pass(&self) -> RenderPassId;

    /// Rebuilds the swapchain and framebuffers at a new size.
    fn recreate(&mut self, extent: Extent2D) -> Result<(), DeviceError>;

    /// Acquires the next image to render into.
    fn acquire_next_image(&mut self) -> Result<SwapchainImage, DeviceError>;

    /// Queues an image for presentation once `wait_semaphores` are signaled.
    fn present(
        &mut self,
        image: &SwapchainImage,
        wait_semaphores: &[SemaphoreId],
    ) -> Result<(), DeviceError>;
}
