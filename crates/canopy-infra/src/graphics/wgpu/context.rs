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
use super::surface::WgpuSurface;
use canopy_core::math::Extent2D;
use canopy_core::renderer::{DeviceError, ResultCode};
use std::sync::Arc;
use winit::window::Window;

fn init_failed(call: &'static str, message: impl std::fmt::Display) -> DeviceError {
    log::error!("{call} failed: {message}");
    DeviceError::api(call, ResultCode::InitializationFailed)
}

/// The objects a window needs to render through `wgpu`.
#[derive(Debug)]
pub struct WgpuContext {
    pub device: WgpuDevice,
    pub surface: WgpuSurface,
    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
}

impl WgpuContext {
    /// Creates the surface for `window`, picks an adapter able to present to
    /// it, and opens a logical device.
    ///
    /// ## Arguments
    /// * `window` - The window to render into. Shared with the surface, which must not outlive it.
    /// * `extent` - Initial size of the swapchain in physical pixels.
    pub fn new(window: Arc<Window>, extent: Extent2D) -> Result<Self, DeviceError> {
        log::info!("Initializing WGPU Graphics Context...");
        let instance = wgpu::Instance::default();

        // --- 1. Create Surface ---
        let surface = instance
            .create_surface(window)
            .map_err(|e| init_failed("wgpu::Instance::create_surface", e))?;

        // --- 2. Pick an adapter that can present to it ---
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            compatible_surface: Some(&surface),
            ..Default::default()
        }))
        .map_err(|e| init_failed("wgpu::Instance::request_adapter", e))?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // --- 3. Create Logical Device and Command Queue ---
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Canopy Logical Device"),
            ..Default::default()
        }))
        .map_err(|e| init_failed("wgpu::Adapter::request_device", e))?;
        log::info!("Logical device and command queue created.");

        // --- 4. Configure Surface ---
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| init_failed("wgpu::Surface::get_capabilities", "no surface format"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: extent.width.max(1),
            height: extent.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // Fifo is guaranteed to be supported
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let device = WgpuDevice::new(device, queue);
        let surface = WgpuSurface::new(device.clone(), surface, config);
        Ok(Self {
            device,
            surface,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
        })
    }
}
