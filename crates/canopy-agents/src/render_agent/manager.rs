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

//! Defines the RenderManager, the orchestrator of the traversal phases.

use super::error::ManagerError;
use super::frame_sync::FrameSync;
use super::stats::{FrameOutcome, FrameStats};
use canopy_core::image::ImageLoaderFactory;
use canopy_core::math::{Aabb, Extent2D};
use canopy_core::renderer::api::{
    CommandBufferBeginInfo, Rect2D, RenderPassBeginInfo, SubmitInfo, SubpassContents,
};
use canopy_core::renderer::{GraphicsDevice, RenderSettings, Surface, SwapchainImage};
use canopy_scene::nodes::Camera;
use canopy_scene::{
    search, AllocationReport, Allocator, CommandRecorder, EventHandler, InputEvent, LiveHandles,
    Node, Phase, PipelineCreator, Presenter, RenderBatches, ResourceTable, SceneRenderer,
    Separator, Stager, TypedNode,
};
use std::sync::Arc;

/// Where the manager stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerState {
    /// No complete build: either `init` was never called or the last build failed.
    Uninitialized,
    /// Every build phase has run; no frame has been presented yet.
    Built,
    /// Idle between frames.
    Ready,
    /// Inside `redraw`.
    Rendering,
    /// Inside `resize`.
    Resizing,
}

impl ManagerState {
    fn can_draw(self) -> bool {
        matches!(self, ManagerState::Built | ManagerState::Ready)
    }
}

/// Owns a scene and drives it through the traversal phases.
///
/// The manager owns the root node, the [`ResourceTable`] every device object
/// of the scene is registered in, and the synchronization objects of the
/// build and frame loops. Dropping it waits for the device to go idle and
/// releases all of them.
#[derive(Debug)]
pub struct RenderManager {
    device: Arc<dyn GraphicsDevice>,
    surface: Box<dyn Surface>,
    root: Box<dyn Node>,
    table: ResourceTable,
    sync: FrameSync,
    settings: RenderSettings,
    image_loaders: ImageLoaderFactory,
    extent: Extent2D,
    state: ManagerState,
    stats: FrameStats,
}

impl RenderManager {
    /// Takes ownership of a scene. Nothing is built until [`init`](Self::init).
    ///
    /// ## Errors
    /// * `ManagerError::Device` - If a synchronization object cannot be created.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        surface: Box<dyn Surface>,
        root: Box<dyn Node>,
        settings: RenderSettings,
        image_loaders: ImageLoaderFactory,
    ) -> Result<Self, ManagerError> {
        let sync = FrameSync::new(Arc::clone(&device), settings.use_pipeline_cache)?;
        let extent = surface.extent();
        Ok(Self {
            table: ResourceTable::new(Arc::clone(&device)),
            device,
            surface,
            root,
            sync,
            settings,
            image_loaders,
            extent,
            state: ManagerState::Uninitialized,
            stats: FrameStats::default(),
        })
    }

    /// Runs Allocate, Stage, BuildPipeline and Record, in that order.
    ///
    /// Calling it again rebuilds the scene; nodes whose inputs did not change
    /// keep their device objects.
    pub fn init(&mut self) -> Result<(), ManagerError> {
        if self.state != ManagerState::Uninitialized {
            self.device.device_wait_idle()?;
        }
        let report = self.build(Phase::Allocate)?;
        log::info!(
            "Scene built: {} resources in {} memory blocks ({} bytes)",
            report.resources,
            report.blocks,
            report.block_bytes
        );
        self.state = ManagerState::Built;
        Ok(())
    }

    /// Re-runs every build phase, after the tree was edited through
    /// [`root_mut`](Self::root_mut).
    pub fn rebuild(&mut self) -> Result<(), ManagerError> {
        self.init()
    }

    /// Re-runs only the Record phase.
    pub fn rerecord(&mut self) -> Result<(), ManagerError> {
        if self.state == ManagerState::Uninitialized {
            return Err(ManagerError::NotInitialized);
        }
        self.device.device_wait_idle()?;
        self.run_record().inspect_err(|e| {
            log::error!("{e}");
            self.state = ManagerState::Uninitialized;
        })
    }

    /// Recreates the surface at `extent`, rebuilds what depends on its size
    /// and draws one frame.
    ///
    /// An empty extent (a minimized window) is skipped.
    pub fn resize(&mut self, extent: Extent2D) -> Result<FrameOutcome, ManagerError> {
        self.resize_inner(extent, true)
    }

    /// Draws and presents one frame.
    ///
    /// Errors never reach the caller. A stale surface triggers one resize at
    /// the current extent; anything else is logged and the frame is dropped.
    pub fn redraw(&mut self) -> FrameOutcome {
        self.redraw_inner(true)
    }

    /// Dispatches an input event through the tree.
    ///
    /// Returns `true` if a node asked for a redraw. A resize event resizes
    /// the manager instead, which already draws a frame.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        if let InputEvent::Resized(extent) = event {
            if let Err(e) = self.resize(*extent) {
                log::error!("Resize to {}x{} failed: {e}", extent.width, extent.height);
            }
            return false;
        }

        let mut handler = EventHandler::new(event);
        match self.root.handle_event(&mut handler) {
            Ok(()) => handler.redraw_requested(),
            Err(e) => {
                log::error!("Event {event:?} failed: {e}");
                false
            }
        }
    }

    pub fn find_first_of_type<T: TypedNode>(&self) -> Option<&T> {
        search::find_first_of_type(self.root.as_ref())
    }

    pub fn find_first_of_type_mut<T: TypedNode>(&mut self) -> Option<&mut T> {
        search::find_first_of_type_mut(self.root.as_mut())
    }

    /// Bounds of the whole scene.
    pub fn bounding_box(&self) -> Aabb {
        search::bounding_box(self.root.as_ref())
    }

    /// Points the first camera of the scene at everything in it.
    ///
    /// A scene without a camera gets one, inserted with the old root under
    /// a new root [`Separator`]. Returns `false` if the scene has no bounds.
    pub fn view_all(&mut self) -> bool {
        self.ensure_camera();
        let bounds = self.bounding_box();
        if !bounds.is_valid() {
            log::warn!("view_all: the scene has no geometry");
            return false;
        }
        match self.find_first_of_type_mut::<Camera>() {
            Some(camera) => {
                camera.view_all(&bounds);
                true
            }
            None => false,
        }
    }

    /// Makes sure the scene has a camera. Returns `true` if one was inserted.
    pub fn ensure_camera(&mut self) -> bool {
        if self.find_first_of_type::<Camera>().is_some() {
            return false;
        }
        let mut camera = Camera::new();
        if !self.extent.is_empty() {
            camera.aspect_ratio = self.extent.aspect_ratio();
        }
        let previous = std::mem::replace(&mut self.root, Box::new(Separator::new()));
        let mut root = Separator::new();
        root.push(camera);
        root.push_boxed(previous);
        self.root = Box::new(root);
        log::debug!("Inserted a camera above the scene root");
        true
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Counts of the device objects the scene currently owns.
    pub fn live_handles(&self) -> LiveHandles {
        self.table.live_handles()
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.table
    }

    pub fn root(&self) -> &dyn Node {
        self.root.as_ref()
    }

    /// Mutable access to the tree. Structural edits take effect at the next
    /// [`rebuild`](Self::rebuild) or [`rerecord`](Self::rerecord).
    pub fn root_mut(&mut self) -> &mut dyn Node {
        self.root.as_mut()
    }

    fn build(&mut self, first: Phase) -> Result<AllocationReport, ManagerError> {
        let result = self.run_build(first);
        if let Err(e) = &result {
            log::error!("Build failed: {e}");
            self.state = ManagerState::Uninitialized;
        }
        result
    }

    fn run_build(&mut self, first: Phase) -> Result<AllocationReport, ManagerError> {
        let report = self.run_allocate(first)?;
        self.run_stage()?;
        self.run_pipeline()?;
        self.run_record()?;
        Ok(report)
    }

    /// Runs Allocate or Resize, then binds memory for what the walk created.
    fn run_allocate(&mut self, phase: Phase) -> Result<AllocationReport, ManagerError> {
        let mut allocator = Allocator::begin(
            &mut self.table,
            &self.image_loaders,
            self.settings.allocation,
            self.extent,
        );
        let walked = match phase {
            Phase::Resize => self.root.resize(&mut allocator),
            _ => self.root.alloc(&mut allocator),
        };
        walked
            .and_then(|()| allocator.end())
            .map_err(ManagerError::phase(phase))
    }

    /// Records the transfers of the Stage walk, submits them and waits.
    fn run_stage(&mut self) -> Result<(), ManagerError> {
        let encoder = self.device.begin_command_buffer(
            self.sync.staging_commands,
            &CommandBufferBeginInfo {
                one_time_submit: true,
                render_pass_continue: None,
            },
        )?;
        let mut stager = Stager::new(&mut self.table, encoder);
        self.root
            .stage(&mut stager)
            .and_then(|()| stager.finish())
            .map_err(ManagerError::phase(Phase::Stage))?;

        self.device.reset_fences(&[self.sync.staging_fence])?;
        self.device.queue_submit(
            &SubmitInfo {
                command_buffers: &[self.sync.staging_commands],
                ..Default::default()
            },
            Some(self.sync.staging_fence),
        )?;
        self.device
            .wait_for_fences(&[self.sync.staging_fence], self.settings.fence_timeout_ns())?;
        Ok(())
    }

    fn run_pipeline(&mut self) -> Result<(), ManagerError> {
        let mut creator = PipelineCreator::new(
            &mut self.table,
            self.surface.render_pass(),
            self.sync.pipeline_cache,
        );
        self.root
            .pipeline(&mut creator)
            .map_err(ManagerError::phase(Phase::BuildPipeline))
    }

    fn run_record(&mut self) -> Result<(), ManagerError> {
        let mut recorder =
            CommandRecorder::new(&mut self.table, self.surface.render_pass(), self.extent);
        self.root
            .record(&mut recorder)
            .map_err(ManagerError::phase(Phase::Record))
    }

    fn resize_inner(
        &mut self,
        extent: Extent2D,
        allow_recovery: bool,
    ) -> Result<FrameOutcome, ManagerError> {
        if self.state == ManagerState::Uninitialized {
            return Err(ManagerError::NotInitialized);
        }
        if extent.is_empty() {
            log::warn!("Ignoring resize to an empty extent");
            return Ok(FrameOutcome::Dropped);
        }

        log::debug!("Resizing to {}x{}", extent.width, extent.height);
        self.state = ManagerState::Resizing;
        let result = self.run_resize(extent);
        if let Err(e) = &result {
            log::error!("Resize failed: {e}");
            self.state = ManagerState::Uninitialized;
        }
        result?;

        self.state = ManagerState::Ready;
        self.stats.resizes += 1;
        Ok(self.redraw_inner(allow_recovery))
    }

    fn run_resize(&mut self, extent: Extent2D) -> Result<(), ManagerError> {
        self.device.device_wait_idle()?;
        self.surface.recreate(extent)?;
        self.extent = extent;
        self.run_build(Phase::Resize)?;
        Ok(())
    }

    fn redraw_inner(&mut self, allow_recovery: bool) -> FrameOutcome {
        if !self.state.can_draw() {
            log::warn!("Frame dropped: the manager is {:?}", self.state);
            self.stats.frames_dropped += 1;
            return FrameOutcome::Dropped;
        }

        self.state = ManagerState::Rendering;
        let result = self.draw_frame();
        self.state = ManagerState::Ready;

        let outcome = match result {
            Ok(()) => FrameOutcome::Presented,
            Err(e) if e.is_out_of_date() && allow_recovery => {
                log::info!("Surface out of date, recreating it");
                self.stats.recoveries += 1;
                // The frame drawn by the resize is already counted.
                return match self.resize_inner(self.extent, false) {
                    Ok(FrameOutcome::Presented) => FrameOutcome::Recovered,
                    Ok(outcome) => outcome,
                    Err(e) => {
                        log::error!("Recovery failed: {e}");
                        self.stats.frames_dropped += 1;
                        FrameOutcome::Dropped
                    }
                };
            }
            Err(e) if e.is_out_of_date() => {
                log::warn!("Frame dropped, surface still out of date: {e}");
                FrameOutcome::Dropped
            }
            Err(e) => {
                log::error!("Frame dropped: {e}");
                FrameOutcome::Dropped
            }
        };
        self.stats.record(outcome);
        outcome
    }

    fn draw_frame(&mut self) -> Result<(), ManagerError> {
        let frame_fence = self.sync.frame_fence;
        let render_finished = self.sync.render_finished;
        self.device
            .wait_for_fences(&[frame_fence], self.settings.fence_timeout_ns())?;
        let image = self.surface.acquire_next_image()?;

        let mut renderer = SceneRenderer::new(&self.table, self.extent);
        self.root
            .render(&mut renderer)
            .map_err(ManagerError::phase(Phase::Render))?;
        let batches = renderer.into_batches();
        self.record_frame(&image, &batches)?;

        let acquired: Vec<_> = image.acquire_semaphore.into_iter().collect();
        self.device.reset_fences(&[frame_fence])?;
        let submitted = self.device.queue_submit(
            &SubmitInfo {
                command_buffers: &[self.sync.frame_commands],
                wait_semaphores: &acquired,
                signal_semaphores: &[render_finished],
            },
            Some(frame_fence),
        );
        if let Err(e) = submitted {
            // Nothing will signal the reset fence now.
            if let Err(renew_err) = self.sync.renew_frame_fence() {
                log::error!("Failed to renew the frame fence: {renew_err}");
            }
            return Err(e.into());
        }

        let mut presenter = Presenter::new(&self.table, image.index, self.extent, vec![render_finished]);
        self.root
            .present(&mut presenter)
            .map_err(ManagerError::phase(Phase::Present))?;
        let wait_semaphores = presenter.into_wait_semaphores();
        self.surface.present(&image, &wait_semaphores)?;
        Ok(())
    }

    /// Records the primary buffer: dispatches, then the draws inside the render pass.
    fn record_frame(
        &self,
        image: &SwapchainImage,
        batches: &RenderBatches,
    ) -> Result<(), ManagerError> {
        let mut encoder = self.device.begin_command_buffer(
            self.sync.frame_commands,
            &CommandBufferBeginInfo {
                one_time_submit: true,
                render_pass_continue: None,
            },
        )?;
        if !batches.dispatches.is_empty() {
            encoder.execute_commands(&batches.dispatches);
        }
        encoder.begin_render_pass(
            &RenderPassBeginInfo {
                render_pass: self.surface.render_pass(),
                framebuffer: image.framebuffer,
                render_area: Rect2D::from_extent(self.extent),
                clear_color: self.settings.clear_color,
                clear_depth: self.settings.clear_depth,
            },
            SubpassContents::SecondaryCommandBuffers,
        );
        if !batches.draws.is_empty() {
            encoder.execute_commands(&batches.draws);
        }
        encoder.end_render_pass();
        encoder.finish()?;
        Ok(())
    }
}

impl Drop for RenderManager {
    fn drop(&mut self) {
        if let Err(e) = self.device.device_wait_idle() {
            log::error!("Failed to wait for the device before teardown: {e}");
        }
        self.table.release_all();
        self.sync.release();
        log::debug!("RenderManager released its device objects");
    }
}
