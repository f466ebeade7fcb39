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

use super::device::WgpuDevice;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::{FramebufferId, RenderPassId, SemaphoreId};
use canopy_core::renderer::{DeviceError, ResultCode, Surface, SwapchainImage};

/// A window surface presented through `wgpu`.
///
/// `wgpu` hands out one swapchain texture at a time, so the surface exposes a
/// single framebuffer that is pointed at the acquired texture until it is presented.
#[derive(Debug)]
pub struct WgpuSurface {
    device: WgpuDevice,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    render_pass: RenderPassId,
    framebuffer: FramebufferId,
    current: Option<wgpu::SurfaceTexture>,
}

impl WgpuSurface {
    pub(super) fn new(
        device: WgpuDevice,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        surface.configure(device.raw_device(), &config);
        let render_pass = device.register_render_pass(config.format);
        let framebuffer = device.register_framebuffer();
        Self {
            device,
            surface,
            config,
            render_pass,
            framebuffer,
            current: None,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

impl Surface for WgpuSurface {
    fn extent(&self) -> Extent2D {
        Extent2D::new(self.config.width, self.config.height)
    }

    fn render_pass(&self) -> RenderPassId {
        self.render_pass
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<(), DeviceError> {
        if extent.is_empty() {
            log::warn!(
                "WgpuSurface: Ignoring resize request to zero dimensions: {}x{}",
                extent.width,
                extent.height
            );
            return Ok(());
        }
        self.current = None;
        self.device.set_framebuffer_view(self.framebuffer, None);
        log::info!(
            "WgpuSurface: Resizing surface configuration to {}x{}",
            extent.width,
            extent.height
        );
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.surface.configure(self.device.raw_device(), &self.config);
        self.device.update_render_pass(self.render_pass, self.config.format);
        Ok(())
    }

    fn acquire_next_image(&mut self) -> Result<SwapchainImage, DeviceError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("WgpuSurface: Swapchain surface lost or outdated ({e:?})");
                return Err(DeviceError::OutOfDate);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return Err(DeviceError::api(
                    "vkAcquireNextImageKHR",
                    ResultCode::Timeout,
                ));
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(DeviceError::api(
                    "vkAcquireNextImageKHR",
                    ResultCode::OutOfDeviceMemory,
                ));
            }
            Err(e) => {
                log::error!("WgpuSurface: Unexpected SurfaceError: {e:?}");
                return Err(DeviceError::api(
                    "vkAcquireNextImageKHR",
                    ResultCode::Unknown(-1),
                ));
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                label: Some("Canopy Swapchain View"),
                ..Default::default()
            });
        self.device.set_framebuffer_view(self.framebuffer, Some(view));
        self.current = Some(frame);
        Ok(SwapchainImage {
            index: 0,
            framebuffer: self.framebuffer,
            acquire_semaphore: None,
        })
    }

    fn present(
        &mut self,
        image: &SwapchainImage,
        _wait_semaphores: &[SemaphoreId],
    ) -> Result<(), DeviceError> {
        if image.framebuffer != self.framebuffer {
            return Err(DeviceError::InvalidHandle(format!("{:?}", image.framebuffer)));
        }
        let frame = self
            .current
            .take()
            .ok_or_else(|| DeviceError::InvalidHandle("no acquired swapchain image".into()))?;
        self.device.set_framebuffer_view(self.framebuffer, None);
        let suboptimal = frame.suboptimal;
        frame.present();
        if suboptimal {
            // Presented, but the next frame should use a reconfigured surface.
            return Err(DeviceError::OutOfDate);
        }
        Ok(())
    }
}

impl Drop for WgpuSurface {
    fn drop(&mut self) {
        self.current = None;
        self.device.unregister_framebuffer(self.framebuffer);
        self.device.unregister_render_pass(self.render_pass);
    }
}
