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

use super::device::HeadlessDevice;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::{FramebufferId, RenderPassId, SemaphoreId};
use canopy_core::renderer::{DeviceError, Surface, SwapchainImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const IMAGE_COUNT: usize = 2;

#[derive(Debug, Default)]
struct ProbeState {
    acquire_out_of_date: AtomicBool,
    present_out_of_date: AtomicBool,
    acquires: AtomicUsize,
    presents: AtomicUsize,
    recreates: AtomicUsize,
    last_wait_semaphores: Mutex<Vec<SemaphoreId>>,
}

/// Observes and steers a [`HeadlessSurface`] after it has been handed away.
#[derive(Debug, Clone, Default)]
pub struct SurfaceProbe {
    state: Arc<ProbeState>,
}

impl SurfaceProbe {
    /// The next `present` reports the surface as out of date.
    pub fn fail_next_present_out_of_date(&self) {
        self.state.present_out_of_date.store(true, Ordering::SeqCst);
    }

    /// The next `acquire_next_image` reports the surface as out of date.
    pub fn fail_next_acquire_out_of_date(&self) {
        self.state.acquire_out_of_date.store(true, Ordering::SeqCst);
    }

    pub fn acquire_count(&self) -> usize {
        self.state.acquires.load(Ordering::SeqCst)
    }

    /// Presents that succeeded.
    pub fn present_count(&self) -> usize {
        self.state.presents.load(Ordering::SeqCst)
    }

    pub fn recreate_count(&self) -> usize {
        self.state.recreates.load(Ordering::SeqCst)
    }

    /// Semaphores the last `present` call was asked to wait on.
    pub fn last_wait_semaphores(&self) -> Vec<SemaphoreId> {
        self.state
            .last_wait_semaphores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A [`Surface`] with no window behind it.
///
/// Owns a render pass and one framebuffer per swapchain image on its
/// [`HeadlessDevice`]; both are destroyed when the surface is dropped.
#[derive(Debug)]
pub struct HeadlessSurface {
    device: HeadlessDevice,
    extent: Extent2D,
    render_pass: RenderPassId,
    framebuffers: Vec<FramebufferId>,
    next_image: usize,
    probe: SurfaceProbe,
}

impl HeadlessSurface {
    pub fn new(device: &HeadlessDevice, extent: Extent2D) -> Result<Self, DeviceError> {
        let render_pass = device.create_render_pass();
        let mut surface = Self {
            device: device.clone(),
            extent,
            render_pass,
            framebuffers: Vec::with_capacity(IMAGE_COUNT),
            next_image: 0,
            probe: SurfaceProbe::default(),
        };
        surface.create_framebuffers()?;
        Ok(surface)
    }

    pub fn probe(&self) -> SurfaceProbe {
        self.probe.clone()
    }

    fn create_framebuffers(&mut self) -> Result<(), DeviceError> {
        for _ in 0..IMAGE_COUNT {
            let framebuffer = self.device.create_framebuffer(self.render_pass)?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn destroy_framebuffers(&mut self) -> Result<(), DeviceError> {
        for framebuffer in self.framebuffers.drain(..) {
            self.device.destroy_framebuffer(framebuffer)?;
        }
        Ok(())
    }
}

impl Surface for HeadlessSurface {
    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn render_pass(&self) -> RenderPassId {
        self.render_pass
    }

    fn recreate(&mut self, extent: Extent2D) -> Result<(), DeviceError> {
        self.destroy_framebuffers()?;
        self.extent = extent;
        self.next_image = 0;
        self.create_framebuffers()?;
        self.probe.state.recreates.fetch_add(1, Ordering::SeqCst);
        log::debug!("Headless surface recreated at {}x{}", extent.width, extent.height);
        Ok(())
    }

    fn acquire_next_image(&mut self) -> Result<SwapchainImage, DeviceError> {
        if self.probe.state.acquire_out_of_date.swap(false, Ordering::SeqCst) {
            return Err(DeviceError::OutOfDate);
        }
        let index = self.next_image;
        let framebuffer = *self
            .framebuffers
            .get(index)
            .ok_or_else(|| DeviceError::InvalidHandle(format!("swapchain image {index}")))?;
        self.next_image = (index + 1) % self.framebuffers.len();
        self.probe.state.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(SwapchainImage {
            index: index as u32,
            framebuffer,
            acquire_semaphore: None,
        })
    }

    fn present(
        &mut self,
        image: &SwapchainImage,
        wait_semaphores: &[SemaphoreId],
    ) -> Result<(), DeviceError> {
        *self
            .probe
            .state
            .last_wait_semaphores
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = wait_semaphores.to_vec();
        if self.probe.state.present_out_of_date.swap(false, Ordering::SeqCst) {
            return Err(DeviceError::OutOfDate);
        }
        if !self.framebuffers.contains(&image.framebuffer) {
            return Err(DeviceError::InvalidHandle(format!("{:?}", image.framebuffer)));
        }
        self.probe.state.presents.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for HeadlessSurface {
    fn drop(&mut self) {
        if let Err(e) = self.destroy_framebuffers() {
            log::warn!("Failed to destroy headless framebuffers: {e}");
        }
        if let Err(e) = self.device.destroy_render_pass(self.render_pass) {
            log::warn!("Failed to destroy headless render pass: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_rotate() {
        let device = HeadlessDevice::new();
        let mut surface = HeadlessSurface::new(&device, Extent2D::new(4, 4)).unwrap();
        let first = surface.acquire_next_image().unwrap();
        let second = surface.acquire_next_image().unwrap();
        let third = surface.acquire_next_image().unwrap();
        assert_ne!(first.framebuffer, second.framebuffer);
        assert_eq!(first, third);
    }

    #[test]
    fn test_out_of_date_fires_once() {
        let device = HeadlessDevice::new();
        let mut surface = HeadlessSurface::new(&device, Extent2D::new(4, 4)).unwrap();
        let probe = surface.probe();
        probe.fail_next_present_out_of_date();

        let image = surface.acquire_next_image().unwrap();
        assert_eq!(surface.present(&image, &[]), Err(DeviceError::OutOfDate));
        assert!(surface.present(&image, &[]).is_ok());
        assert_eq!(probe.present_count(), 1);
    }

    #[test]
    fn test_recreate_replaces_framebuffers() {
        let device = HeadlessDevice::new();
        let mut surface = HeadlessSurface::new(&device, Extent2D::new(4, 4)).unwrap();
        let stale = surface.acquire_next_image().unwrap();
        surface.recreate(Extent2D::new(8, 2)).unwrap();

        assert_eq!(surface.extent(), Extent2D::new(8, 2));
        assert_eq!(device.counts().framebuffers, IMAGE_COUNT);
        assert!(surface.present(&stale, &[]).is_err());
    }

    #[test]
    fn test_drop_releases_everything() {
        let device = HeadlessDevice::new();
        drop(HeadlessSurface::new(&device, Extent2D::new(4, 4)).unwrap());
        assert_eq!(device.counts().total(), 0);
    }
}
