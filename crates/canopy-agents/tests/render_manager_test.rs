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

//! Integration tests for the RenderManager lifecycle.
//!
//! Every test drives a real scene through the headless backend and inspects
//! what reached the device.

use canopy_agents::{FrameOutcome, ManagerError, ManagerState, RenderManager};
use canopy_core::image::ImageLoaderFactory;
use canopy_core::math::{Extent2D, Vec2};
use canopy_core::renderer::api::{
    CommandBufferId, DescriptorResource, PipelineBindPoint, PrimitiveTopology, ShaderStage,
};
use canopy_core::renderer::RenderSettings;
use canopy_infra::graphics::headless::{
    HeadlessDevice, HeadlessSurface, RecordedCommand, SurfaceProbe,
};
use canopy_scene::nodes::{
    Camera, DescriptorBinding, DispatchCommand, DrawCommand, Shader, TransformBuffer,
};
use canopy_scene::{
    shapes, Group, InputEvent, MouseButton, Node, NodeKind, Phase, SceneError, SceneRenderer,
    Separator,
};
use std::sync::Arc;

/// A camera and one separator holding a cube with a uniform buffer bound at 0.
fn cube_scene() -> Separator {
    Separator::new().with(Camera::new()).with(
        Separator::new()
            .with(shapes::cube(0, 0))
            .with(Shader::wgsl("vertex main", ShaderStage::VERTEX))
            .with(Shader::wgsl("fragment main", ShaderStage::FRAGMENT))
            .with(TransformBuffer::new())
            .with(DescriptorBinding::uniform_buffer(0, ShaderStage::VERTEX))
            .with(DrawCommand::new(PrimitiveTopology::TriangleList)),
    )
}

/// A compute pass in its own separator, followed by the cube scene.
fn compute_scene() -> Separator {
    Separator::new()
        .with(
            Separator::new()
                .with(Shader::wgsl("compute main", ShaderStage::COMPUTE))
                .with(DispatchCommand::new(4, 4, 1)),
        )
        .with(cube_scene())
}

/// Queues a command buffer the device never allocated, on its first frame only.
#[derive(Debug, Default)]
struct UnallocatedDrawOnce {
    queued: bool,
}

impl Node for UnallocatedDrawOnce {
    fn kind(&self) -> NodeKind {
        NodeKind::Custom("UnallocatedDrawOnce")
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        if !std::mem::replace(&mut self.queued, true) {
            renderer.execute_draw(CommandBufferId(987_654));
        }
        Ok(())
    }
}

/// Helper: a manager over `root`, plus handles for inspection.
fn manager_for(root: impl Node + 'static) -> (RenderManager, HeadlessDevice, SurfaceProbe) {
    let device = HeadlessDevice::new();
    let surface = HeadlessSurface::new(&device, Extent2D::new(640, 480)).unwrap();
    let probe = surface.probe();
    let manager = RenderManager::new(
        Arc::new(device.clone()),
        Box::new(surface),
        Box::new(root),
        RenderSettings::default(),
        ImageLoaderFactory::new(),
    )
    .unwrap();
    (manager, device, probe)
}

fn initialized(root: impl Node + 'static) -> (RenderManager, HeadlessDevice, SurfaceProbe) {
    let (mut manager, device, probe) = manager_for(root);
    manager.init().unwrap();
    (manager, device, probe)
}

// ─────────────────────────────────────────────────────────────────────────────
// Build phases
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_init_builds_and_stages_the_scene() {
    let (manager, device, _) = initialized(cube_scene());

    assert_eq!(manager.state(), ManagerState::Built);
    let draw = manager.find_first_of_type::<DrawCommand>().unwrap();
    assert!(draw.pipeline().is_some());
    assert_eq!(draw.recordings(), 1);
    // One staging submission, nothing drawn yet.
    assert_eq!(device.submissions(), 1);
    let handles = manager.live_handles();
    assert_eq!(handles.buffers, 5);
    assert!(handles.memory_blocks >= 1);
}

#[test]
fn test_rebuild_keeps_every_handle() {
    let (mut manager, device, _) = initialized(cube_scene());
    let draw = manager.find_first_of_type::<DrawCommand>().unwrap();
    let before = (
        draw.pipeline(),
        draw.descriptor_set(),
        draw.command_buffer(),
        manager.live_handles(),
        device.counts(),
    );

    manager.rebuild().unwrap();

    let draw = manager.find_first_of_type::<DrawCommand>().unwrap();
    let after = (
        draw.pipeline(),
        draw.descriptor_set(),
        draw.command_buffer(),
        manager.live_handles(),
        device.counts(),
    );
    assert_eq!(before, after);
    assert_eq!(draw.recordings(), 2);
}

#[test]
fn test_uniform_binding_writes_exactly_the_uniform_buffer() {
    let (manager, device, _) = initialized(cube_scene());

    let uniforms = manager
        .find_first_of_type::<TransformBuffer>()
        .and_then(TransformBuffer::buffer)
        .unwrap();
    let set = manager
        .find_first_of_type::<DrawCommand>()
        .and_then(DrawCommand::descriptor_set)
        .unwrap();

    let writes = device.descriptor_writes(set);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].binding, 0);
    assert_eq!(
        writes[0].resource,
        DescriptorResource::Buffer {
            buffer: uniforms.buffer,
            offset: 0,
            range: uniforms.size,
        }
    );
}

#[test]
fn test_failed_allocation_leaves_the_manager_unbuilt() {
    let (mut manager, device, _) = manager_for(cube_scene());
    device.fail_next_allocations(1);

    let err = manager.init().unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Phase {
            phase: Phase::Allocate,
            ..
        }
    ));
    assert_eq!(manager.state(), ManagerState::Uninitialized);
    assert_eq!(device.counts().memory_blocks, 0);
    assert_eq!(manager.redraw(), FrameOutcome::Dropped);

    // The next attempt starts over.
    manager.init().unwrap();
    assert_eq!(manager.redraw(), FrameOutcome::Presented);
}

#[test]
fn test_resize_before_init_is_rejected() {
    let (mut manager, _, probe) = manager_for(cube_scene());
    assert!(matches!(
        manager.resize(Extent2D::new(800, 600)),
        Err(ManagerError::NotInitialized)
    ));
    assert_eq!(probe.recreate_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_secondary_buffers_are_executed_not_rerecorded() {
    let (mut manager, device, probe) = initialized(cube_scene());
    let commands = manager
        .find_first_of_type::<DrawCommand>()
        .and_then(DrawCommand::command_buffer)
        .unwrap();

    for _ in 0..3 {
        assert_eq!(manager.redraw(), FrameOutcome::Presented);
    }

    assert_eq!(device.recordings(commands), 1);
    assert_eq!(device.executions(commands), 3);
    assert_eq!(probe.present_count(), 3);
    assert_eq!(manager.stats().frames_presented, 3);
    assert_eq!(manager.state(), ManagerState::Ready);
}

#[test]
fn test_present_waits_on_render_finished() {
    let (mut manager, _, probe) = initialized(cube_scene());
    manager.redraw();
    assert_eq!(probe.last_wait_semaphores().len(), 1);
}

#[test]
fn test_frame_writes_the_uniform_buffer() {
    let (mut manager, device, _) = initialized(cube_scene());
    manager.redraw();

    let uniforms = manager.find_first_of_type::<TransformBuffer>().unwrap();
    let written = uniforms.uniforms().copied().unwrap();
    let contents = device.read_buffer(uniforms.buffer().unwrap().buffer).unwrap();
    assert_eq!(contents.len(), std::mem::size_of_val(&written));
}

#[test]
fn test_failed_submit_does_not_stall_later_frames() {
    let (mut manager, device, probe) =
        initialized(cube_scene().with(UnallocatedDrawOnce::default()));
    let fences = device.counts().fences;

    assert_eq!(manager.redraw(), FrameOutcome::Dropped);
    assert_eq!(manager.redraw(), FrameOutcome::Presented);
    assert_eq!(manager.redraw(), FrameOutcome::Presented);

    assert_eq!(probe.present_count(), 2);
    let stats = manager.stats();
    assert_eq!(stats.frames_dropped, 1);
    assert_eq!(stats.frames_presented, 2);
    // The stale fence was replaced, not leaked.
    assert_eq!(device.counts().fences, fences);
}

#[test]
fn test_dispatch_is_executed_before_the_render_pass() {
    let (mut manager, device, _) = initialized(compute_scene());
    let dispatch = manager.find_first_of_type::<DispatchCommand>().unwrap();
    let pipeline = dispatch.pipeline().unwrap();
    let dispatch_commands = dispatch.command_buffer().unwrap();
    assert_eq!(dispatch.recordings(), 1);
    let draw_commands = manager
        .find_first_of_type::<DrawCommand>()
        .and_then(DrawCommand::command_buffer)
        .unwrap();

    assert_eq!(
        device.commands(dispatch_commands),
        vec![
            RecordedCommand::BindPipeline {
                bind_point: PipelineBindPoint::Compute,
                pipeline,
            },
            RecordedCommand::Dispatch { x: 4, y: 4, z: 1 },
        ]
    );

    assert_eq!(manager.redraw(), FrameOutcome::Presented);
    assert_eq!(device.executions(dispatch_commands), 1);
    assert_eq!(device.recordings(dispatch_commands), 1);

    let submitted = device.last_submitted();
    assert_eq!(submitted.len(), 1);
    let frame = device.commands(submitted[0]);
    assert_eq!(frame.len(), 4);
    assert_eq!(frame[0], RecordedCommand::ExecuteCommands(vec![dispatch_commands]));
    assert!(matches!(frame[1], RecordedCommand::BeginRenderPass { .. }));
    assert_eq!(frame[2], RecordedCommand::ExecuteCommands(vec![draw_commands]));
    assert_eq!(frame[3], RecordedCommand::EndRenderPass);
}

#[test]
fn test_identical_sibling_draws_build_separate_pipelines() {
    let triangle = || {
        Separator::new()
            .with(Shader::wgsl("vertex main", ShaderStage::VERTEX))
            .with(DrawCommand::new(PrimitiveTopology::TriangleList).with_vertex_count(3))
    };
    let (mut manager, device, _) = initialized(Group::new().with(triangle()).with(triangle()));

    let counts = device.counts();
    assert_eq!(counts.pipelines, 2);
    assert_eq!(counts.pipeline_layouts, 2);

    assert_eq!(manager.redraw(), FrameOutcome::Presented);
    let submitted = device.last_submitted();
    let frame = device.commands(submitted[0]);
    let draws = frame
        .iter()
        .find_map(|command| match command {
            RecordedCommand::ExecuteCommands(buffers) => Some(buffers.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(draws.len(), 2);
    assert_ne!(draws[0], draws[1]);
}

#[test]
fn test_out_of_date_present_recovers_with_one_resize() {
    let (mut manager, _, probe) = initialized(cube_scene());
    probe.fail_next_present_out_of_date();

    assert_eq!(manager.redraw(), FrameOutcome::Recovered);
    assert_eq!(probe.recreate_count(), 1);
    let stats = manager.stats();
    assert_eq!(stats.recoveries, 1);
    assert_eq!(stats.resizes, 1);

    assert_eq!(manager.redraw(), FrameOutcome::Presented);
    assert_eq!(probe.recreate_count(), 1);
    assert_eq!(probe.present_count(), 2);
    assert_eq!(manager.stats().frames_presented, 2);
}

#[test]
fn test_out_of_date_acquire_recovers() {
    let (mut manager, _, probe) = initialized(cube_scene());
    probe.fail_next_acquire_out_of_date();

    assert_eq!(manager.redraw(), FrameOutcome::Recovered);
    assert_eq!(probe.recreate_count(), 1);
    assert_eq!(manager.stats().frames_dropped, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Resize
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_repeated_resize_does_not_leak() {
    let (mut manager, device, _) = initialized(cube_scene());
    let extent = Extent2D::new(800, 600);

    assert_eq!(manager.resize(extent).unwrap(), FrameOutcome::Presented);
    let once = (manager.live_handles(), device.counts());
    assert_eq!(manager.resize(extent).unwrap(), FrameOutcome::Presented);
    let twice = (manager.live_handles(), device.counts());

    assert_eq!(once, twice);
    assert_eq!(manager.extent(), extent);
    assert_eq!(manager.stats().resizes, 2);
}

#[test]
fn test_empty_resize_is_skipped() {
    let (mut manager, _, probe) = initialized(cube_scene());
    assert_eq!(
        manager.resize(Extent2D::new(0, 600)).unwrap(),
        FrameOutcome::Dropped
    );
    assert_eq!(probe.recreate_count(), 0);
    assert_eq!(manager.extent(), Extent2D::new(640, 480));
}

#[test]
fn test_resize_updates_camera_aspect() {
    let (mut manager, _, _) = initialized(cube_scene());
    manager.resize(Extent2D::new(1000, 500)).unwrap();
    let camera = manager.find_first_of_type::<Camera>().unwrap();
    approx::assert_relative_eq!(camera.aspect_ratio, 2.0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Editing the tree
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_removing_a_child_then_rerecording() {
    let (mut manager, _, _) = initialized(cube_scene());
    let before = manager.live_handles();

    let children = manager.root_mut().children_mut().unwrap();
    let removed = children.pop();
    assert!(removed.is_some());
    drop(removed);

    manager.rerecord().unwrap();
    assert_eq!(manager.redraw(), FrameOutcome::Presented);
    // Handles of removed nodes stay with the table until teardown.
    assert_eq!(manager.live_handles(), before);
    assert!(manager.find_first_of_type::<DrawCommand>().is_none());
}

#[test]
fn test_emptied_scene_is_a_no_op() {
    let (mut manager, _, _) = initialized(cube_scene());
    manager.root_mut().children_mut().unwrap().clear();

    manager.rebuild().unwrap();
    assert_eq!(manager.redraw(), FrameOutcome::Presented);
}

#[test]
fn test_empty_group_root() {
    let (mut manager, _, probe) = initialized(Group::new());
    assert_eq!(manager.redraw(), FrameOutcome::Presented);
    assert_eq!(manager.live_handles().total(), 0);
    assert_eq!(probe.present_count(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries and events
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_view_all_inserts_a_camera() {
    let (mut manager, _, _) = manager_for(Separator::new().with(shapes::cube(0, 0)));
    assert!(manager.find_first_of_type::<Camera>().is_none());

    assert!(manager.view_all());

    let camera = manager.find_first_of_type::<Camera>().unwrap();
    let bounds = manager.bounding_box();
    approx::assert_relative_eq!(camera.focal_distance, bounds.diagonal(), epsilon = 1e-5);
    approx::assert_relative_eq!(camera.aspect_ratio, 640.0 / 480.0);
    assert!(!manager.ensure_camera());
}

#[test]
fn test_view_all_without_geometry() {
    let (mut manager, _, _) = manager_for(Group::new());
    assert!(!manager.view_all());
}

#[test]
fn test_drag_requests_redraw() {
    let (mut manager, _, _) = initialized(cube_scene());
    let press = InputEvent::MousePressed {
        button: MouseButton::Left,
        position: Vec2::ZERO,
    };
    let drag = InputEvent::MouseMoved {
        position: Vec2::new(10.0, 0.0),
    };

    assert!(!manager.handle_event(&press));
    assert!(manager.handle_event(&drag));
}

#[test]
fn test_resize_event_resizes() {
    let (mut manager, _, probe) = initialized(cube_scene());
    assert!(!manager.handle_event(&InputEvent::Resized(Extent2D::new(320, 240))));
    assert_eq!(probe.recreate_count(), 1);
    assert_eq!(manager.extent(), Extent2D::new(320, 240));
}

// ─────────────────────────────────────────────────────────────────────────────
// Teardown
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_drop_releases_every_device_object() {
    let (mut manager, device, _) = initialized(cube_scene());
    manager.redraw();
    manager.resize(Extent2D::new(800, 600)).unwrap();
    assert!(device.counts().total() > 0);

    drop(manager);

    assert_eq!(device.counts().total(), 0);
}

#[test]
fn test_drop_after_failed_build_releases_everything() {
    let (mut manager, device, _) = manager_for(cube_scene());
    device.fail_next_allocations(1);
    assert!(manager.init().is_err());

    drop(manager);

    assert_eq!(device.counts().total(), 0);
}
