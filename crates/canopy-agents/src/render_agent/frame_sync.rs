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

//! Synchronization objects owned by the manager rather than by the scene.

use canopy_core::renderer::api::{
    CommandBufferId, CommandBufferLevel, FenceId, PipelineCacheId, SemaphoreId,
};
use canopy_core::{DeviceError, GraphicsDevice};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum SyncObject {
    CommandBuffer(CommandBufferId),
    Fence(FenceId),
    Semaphore(SemaphoreId),
    PipelineCache(PipelineCacheId),
}

impl SyncObject {
    fn destroy(self, device: &dyn GraphicsDevice) -> Result<(), DeviceError> {
        match self {
            SyncObject::CommandBuffer(id) => device.free_command_buffer(id),
            SyncObject::Fence(id) => device.destroy_fence(id),
            SyncObject::Semaphore(id) => device.destroy_semaphore(id),
            SyncObject::PipelineCache(id) => device.destroy_pipeline_cache(id),
        }
    }
}

/// The command buffers, fences and semaphore the build and frame loops use.
///
/// There is a single primary buffer per loop: the staging buffer is waited
/// on before the Stage phase returns, and the frame buffer is only
/// re-recorded once the frame fence says the previous frame is done with it.
#[derive(Debug)]
pub(crate) struct FrameSync {
    device: Arc<dyn GraphicsDevice>,
    pub staging_commands: CommandBufferId,
    pub staging_fence: FenceId,
    pub frame_commands: CommandBufferId,
    /// Created signaled so that the first frame does not wait.
    pub frame_fence: FenceId,
    pub render_finished: SemaphoreId,
    pub pipeline_cache: Option<PipelineCacheId>,
    released: bool,
}

impl FrameSync {
    /// Creates every object. On failure the ones already created are destroyed.
    pub fn new(device: Arc<dyn GraphicsDevice>, use_pipeline_cache: bool) -> Result<Self, DeviceError> {
        let mut created = Vec::new();
        let result = Self::create(&device, use_pipeline_cache, &mut created);
        if result.is_err() {
            for object in created.into_iter().rev() {
                if let Err(e) = object.destroy(device.as_ref()) {
                    log::error!("Failed to destroy {object:?} after a failed setup: {e}");
                }
            }
        }
        result
    }

    fn create(
        device: &Arc<dyn GraphicsDevice>,
        use_pipeline_cache: bool,
        created: &mut Vec<SyncObject>,
    ) -> Result<Self, DeviceError> {
        let staging_commands = device.allocate_command_buffer(CommandBufferLevel::Primary)?;
        created.push(SyncObject::CommandBuffer(staging_commands));
        let staging_fence = device.create_fence(false)?;
        created.push(SyncObject::Fence(staging_fence));
        let frame_commands = device.allocate_command_buffer(CommandBufferLevel::Primary)?;
        created.push(SyncObject::CommandBuffer(frame_commands));
        let frame_fence = device.create_fence(true)?;
        created.push(SyncObject::Fence(frame_fence));
        let render_finished = device.create_semaphore()?;
        created.push(SyncObject::Semaphore(render_finished));
        let pipeline_cache = if use_pipeline_cache {
            let cache = device.create_pipeline_cache()?;
            created.push(SyncObject::PipelineCache(cache));
            Some(cache)
        } else {
            None
        };

        Ok(Self {
            device: Arc::clone(device),
            staging_commands,
            staging_fence,
            frame_commands,
            frame_fence,
            render_finished,
            pipeline_cache,
            released: false,
        })
    }

    /// Replaces the frame fence with a new, signaled one.
    ///
    /// Needed when a submit failed after the fence was reset: no work will
    /// ever signal it, and the next frame would wait on it forever.
    pub fn renew_frame_fence(&mut self) -> Result<(), DeviceError> {
        let fence = self.device.create_fence(true)?;
        let stale = std::mem::replace(&mut self.frame_fence, fence);
        if let Err(e) = self.device.destroy_fence(stale) {
            log::error!("Failed to destroy stale frame fence {stale:?}: {e}");
        }
        Ok(())
    }

    /// Destroys every object. Errors are logged and swallowed.
    ///
    /// The caller must make sure the device is idle first.
    pub fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        let mut objects = vec![
            SyncObject::CommandBuffer(self.frame_commands),
            SyncObject::CommandBuffer(self.staging_commands),
            SyncObject::Fence(self.frame_fence),
            SyncObject::Fence(self.staging_fence),
            SyncObject::Semaphore(self.render_finished),
        ];
        objects.extend(self.pipeline_cache.map(SyncObject::PipelineCache));
        for object in objects {
            if let Err(e) = object.destroy(self.device.as_ref()) {
                log::error!("Failed to destroy {object:?}: {e}");
            }
        }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_infra::graphics::headless::HeadlessDevice;

    #[test]
    fn test_release_destroys_everything_once() {
        let device = HeadlessDevice::new();
        let mut sync = FrameSync::new(Arc::new(device.clone()), true).unwrap();
        let counts = device.counts();
        assert_eq!(counts.command_buffers, 2);
        assert_eq!(counts.fences, 2);
        assert_eq!(counts.semaphores, 1);
        assert_eq!(counts.pipeline_caches, 1);

        sync.release();
        assert_eq!(device.counts().total(), 0);
        drop(sync);
        assert_eq!(device.counts().total(), 0);
    }

    #[test]
    fn test_renewed_frame_fence_is_signaled() {
        let device = HeadlessDevice::new();
        let mut sync = FrameSync::new(Arc::new(device.clone()), false).unwrap();
        let old = sync.frame_fence;
        device.reset_fences(&[old]).unwrap();

        sync.renew_frame_fence().unwrap();

        assert_ne!(sync.frame_fence, old);
        assert!(device.wait_for_fences(&[sync.frame_fence], 0).is_ok());
        assert!(device.wait_for_fences(&[old], 0).is_err());
        assert_eq!(device.counts().fences, 2);
    }

    #[test]
    fn test_no_pipeline_cache_when_disabled() {
        let device = HeadlessDevice::new();
        let sync = FrameSync::new(Arc::new(device.clone()), false).unwrap();
        assert!(sync.pipeline_cache.is_none());
        assert_eq!(device.counts().pipeline_caches, 0);
    }
}
