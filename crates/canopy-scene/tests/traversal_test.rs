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

//! Integration tests for whole-tree traversals, driven by hand against the
//! headless backend.

use canopy_core::image::{ImageData, ImageLoaderFactory};
use canopy_core::math::{Extent2D, Extent3D};
use canopy_core::renderer::api::*;
use canopy_core::renderer::{AllocationStrategy, GraphicsDevice, Surface};
use canopy_infra::graphics::headless::{HeadlessDevice, HeadlessSurface, RecordedCommand};
use canopy_scene::nodes::{
    DescriptorBinding, DrawCommand, Image, Rasterization, Sampler, Shader,
};
use canopy_scene::{
    shapes, Allocator, CommandRecorder, Group, Node, NodeKind, PipelineCreator, ResourceTable,
    SceneError, SceneRenderer, Separator, Stager,
};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A device, a surface and the table a scene registers its objects in.
struct Harness {
    device: HeadlessDevice,
    surface: HeadlessSurface,
    table: ResourceTable,
    loaders: ImageLoaderFactory,
    staging: CommandBufferId,
}

impl Harness {
    fn new() -> Self {
        let device = HeadlessDevice::new();
        let surface = HeadlessSurface::new(&device, Extent2D::new(64, 64)).unwrap();
        let mut table = ResourceTable::new(Arc::new(device.clone()));
        let staging = table
            .allocate_command_buffer(CommandBufferLevel::Primary)
            .unwrap();
        Self {
            device,
            surface,
            table,
            loaders: ImageLoaderFactory::new(),
            staging,
        }
    }

    fn alloc(&mut self, root: &mut dyn Node) -> Result<(), SceneError> {
        let mut allocator = Allocator::begin(
            &mut self.table,
            &self.loaders,
            AllocationStrategy::Pooled,
            self.surface.extent(),
        );
        root.alloc(&mut allocator)?;
        allocator.end().map(|_| ())
    }

    fn resize(&mut self, root: &mut dyn Node, extent: Extent2D) -> Result<(), SceneError> {
        self.surface.recreate(extent)?;
        let mut allocator =
            Allocator::begin(&mut self.table, &self.loaders, AllocationStrategy::Pooled, extent);
        root.resize(&mut allocator)?;
        allocator.end().map(|_| ())
    }

    fn stage(&mut self, root: &mut dyn Node) -> Result<(), SceneError> {
        let encoder = self
            .device
            .begin_command_buffer(self.staging, &CommandBufferBeginInfo::default())?;
        let mut stager = Stager::new(&mut self.table, encoder);
        root.stage(&mut stager)?;
        stager.finish()?;
        self.device.queue_submit(
            &SubmitInfo {
                command_buffers: &[self.staging],
                ..Default::default()
            },
            None,
        )?;
        Ok(())
    }

    fn pipeline(&mut self, root: &mut dyn Node) -> Result<(), SceneError> {
        let mut creator = PipelineCreator::new(&mut self.table, self.surface.render_pass(), None);
        root.pipeline(&mut creator)
    }

    fn record(&mut self, root: &mut dyn Node) -> Result<(), SceneError> {
        let mut recorder =
            CommandRecorder::new(&mut self.table, self.surface.render_pass(), self.surface.extent());
        root.record(&mut recorder)
    }

    fn build(&mut self, root: &mut dyn Node) -> Result<(), SceneError> {
        self.alloc(root)?;
        self.stage(root)?;
        self.pipeline(root)?;
        self.record(root)
    }
}

fn vertex_shader() -> Shader {
    Shader::wgsl("vertex main", ShaderStage::VERTEX)
}

/// Adds a fragment stage whose module the device never created, while enabled.
#[derive(Debug)]
struct UnknownFragmentStage {
    enabled: Arc<AtomicBool>,
}

impl Node for UnknownFragmentStage {
    fn kind(&self) -> NodeKind {
        NodeKind::Custom("UnknownFragmentStage")
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        if self.enabled.load(Ordering::SeqCst) {
            creator.state.shader_stages.push(ShaderStageInfo {
                stage: ShaderStage::FRAGMENT,
                module: ShaderModuleId(424_242),
                entry_point: Cow::Borrowed("main"),
            });
        }
        Ok(())
    }
}

fn checkerboard() -> ImageData {
    let pixels = [[255u8, 255, 255, 255], [0, 0, 0, 255]]
        .iter()
        .cycle()
        .take(4)
        .flatten()
        .copied()
        .collect();
    ImageData::new_2d(2, 2, ImageFormat::Rgba8Unorm, pixels).unwrap()
}

#[test]
fn test_separator_hides_state_from_later_siblings() {
    let mut harness = Harness::new();
    let mut creator = PipelineCreator::new(&mut harness.table, harness.surface.render_pass(), None);
    let default_state = creator.state.rasterization;

    let mut scoped = Separator::new().with(Rasterization::cull_mode(CullMode::Front));
    scoped.pipeline(&mut creator).unwrap();
    assert_eq!(creator.state.rasterization, default_state);

    let mut unscoped = Group::new().with(Rasterization::cull_mode(CullMode::Front));
    unscoped.pipeline(&mut creator).unwrap();
    assert_eq!(creator.state.rasterization.cull_mode, CullMode::Front);
}

#[test]
fn test_separator_restores_state_after_a_failing_child() {
    let mut harness = Harness::new();
    let mut creator = PipelineCreator::new(&mut harness.table, harness.surface.render_pass(), None);

    let mut scoped = Separator::new()
        .with(Rasterization::cull_mode(CullMode::Front))
        .with(DescriptorBinding::uniform_buffer(0, ShaderStage::VERTEX));
    assert!(scoped.pipeline(&mut creator).is_err());
    assert_ne!(creator.state.rasterization.cull_mode, CullMode::Front);
}

#[test]
fn test_empty_group_is_a_no_op_at_every_phase() {
    let mut harness = Harness::new();
    let mut root = Group::new();
    harness.build(&mut root).unwrap();
    harness.resize(&mut root, Extent2D::new(32, 32)).unwrap();

    let mut renderer = SceneRenderer::new(&harness.table, Extent2D::new(32, 32));
    root.render(&mut renderer).unwrap();
    assert_eq!(renderer.into_batches(), Default::default());
    // Only the harness' own staging buffer.
    assert_eq!(harness.table.live_handles().total(), 1);
}

#[test]
fn test_draw_needs_a_vertex_shader() {
    let mut harness = Harness::new();
    let mut root = Separator::new()
        .with(shapes::cube(0, 0))
        .with(DrawCommand::default());

    let err = harness.build(&mut root).unwrap_err();
    assert!(matches!(
        err,
        SceneError::MissingState {
            node: "DrawCommand",
            missing: "a vertex shader"
        }
    ));
}

#[test]
fn test_recording_before_building_is_a_protocol_error() {
    let mut harness = Harness::new();
    let mut root = Separator::new()
        .with(vertex_shader())
        .with(DrawCommand::default().with_vertex_count(3));
    harness.alloc(&mut root).unwrap();

    let err = harness.record(&mut root).unwrap_err();
    assert!(matches!(err, SceneError::Protocol { node: "DrawCommand", .. }));
}

#[test]
fn test_draw_without_vertex_data_needs_a_count() {
    let mut harness = Harness::new();
    let mut root = Separator::new()
        .with(vertex_shader())
        .with(DrawCommand::default());
    harness.alloc(&mut root).unwrap();
    harness.pipeline(&mut root).unwrap();

    let err = harness.record(&mut root).unwrap_err();
    assert!(matches!(err, SceneError::MissingState { missing: "a vertex count", .. }));
}

#[test]
fn test_cube_draw_is_indexed() {
    let mut harness = Harness::new();
    let mut root = Separator::new()
        .with(shapes::cube(0, 0))
        .with(vertex_shader())
        .with(DrawCommand::default());
    harness.build(&mut root).unwrap();

    let draw = canopy_scene::find_first_of_type::<DrawCommand>(&root).unwrap();
    let commands = harness.device.commands(draw.command_buffer().unwrap());
    assert!(commands.contains(&RecordedCommand::DrawIndexed {
        index_count: 36,
        instance_count: 1,
        first_index: 0,
        vertex_offset: 0,
        first_instance: 0,
    }));
    assert!(commands
        .iter()
        .any(|command| matches!(command, RecordedCommand::BindIndexBuffer { .. })));
}

#[test]
fn test_staged_vertex_data_reaches_the_device_buffer() {
    let mut harness = Harness::new();
    let mut root = shapes::cube(0, 0);
    harness.build(&mut root).unwrap();

    let device_buffer = canopy_scene::find_first_of_type::<canopy_scene::nodes::DeviceBuffer>(&root)
        .and_then(|node| node.buffer())
        .unwrap();
    let contents = harness.device.read_buffer(device_buffer.buffer).unwrap();
    // Eight corners, three floats each; the first is (-0.5, -0.5, -0.5).
    assert_eq!(contents.len(), 8 * 12);
    assert_eq!(&contents[0..4], &(-0.5f32).to_le_bytes());
}

#[test]
fn test_textured_draw_binds_image_and_sampler() {
    let mut harness = Harness::new();
    let mut root = Separator::new()
        .with(Image::from_data(checkerboard()))
        .with(Sampler::default())
        .with(DescriptorBinding::combined_image_sampler(1, ShaderStage::FRAGMENT))
        .with(vertex_shader())
        .with(DrawCommand::default().with_vertex_count(6));
    harness.build(&mut root).unwrap();

    let image = canopy_scene::find_first_of_type::<Image>(&root).unwrap();
    assert_eq!(image.layout(), ImageLayout::ShaderReadOnly);
    let staged = harness.device.commands(harness.staging);
    assert!(staged
        .iter()
        .any(|command| matches!(command, RecordedCommand::CopyBufferToImage { .. })));
    assert!(staged.contains(&RecordedCommand::TransitionImageLayout {
        image: image.image().unwrap(),
        old: ImageLayout::TransferDst,
        new: ImageLayout::ShaderReadOnly,
    }));

    let set = canopy_scene::find_first_of_type::<DrawCommand>(&root)
        .and_then(DrawCommand::descriptor_set)
        .unwrap();
    let writes = harness.device.descriptor_writes(set);
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].ty, DescriptorType::CombinedImageSampler);
}

#[test]
fn test_surface_sized_image_follows_resize() {
    let mut harness = Harness::new();
    let mut root = Separator::new().with(Image::surface_sized(
        ImageFormat::Rgba8Unorm,
        ImageUsage::STORAGE,
    ));
    harness.build(&mut root).unwrap();
    let before = harness.table.live_handles();

    harness.resize(&mut root, Extent2D::new(128, 32)).unwrap();
    harness.stage(&mut root).unwrap();

    let image = canopy_scene::find_first_of_type::<Image>(&root).unwrap();
    assert_eq!(image.extent(), Extent3D::new(128, 32, 1));
    assert_eq!(image.layout(), ImageLayout::General);
    assert_eq!(harness.table.live_handles(), before);
}

#[test]
fn test_unchanged_pipeline_is_kept() {
    let mut harness = Harness::new();
    let mut root = Separator::new()
        .with(vertex_shader())
        .with(DrawCommand::default().with_vertex_count(3));
    harness.build(&mut root).unwrap();
    let first = canopy_scene::find_first_of_type::<DrawCommand>(&root)
        .and_then(DrawCommand::pipeline)
        .unwrap();

    harness.build(&mut root).unwrap();
    let draw = canopy_scene::find_first_of_type::<DrawCommand>(&root).unwrap();
    assert_eq!(draw.pipeline(), Some(first));
    assert_eq!(draw.recordings(), 2);
    assert_eq!(harness.device.counts().pipelines, 1);
}

#[test]
fn test_failed_pipeline_rebuild_keeps_the_previous_pipeline() {
    let mut harness = Harness::new();
    let enabled = Arc::new(AtomicBool::new(false));
    let mut root = Separator::new()
        .with(vertex_shader())
        .with(UnknownFragmentStage {
            enabled: Arc::clone(&enabled),
        })
        .with(DrawCommand::default().with_vertex_count(3));
    harness.build(&mut root).unwrap();
    let first = canopy_scene::find_first_of_type::<DrawCommand>(&root)
        .and_then(DrawCommand::pipeline)
        .unwrap();
    let handles = harness.table.live_handles();
    let counts = harness.device.counts();

    enabled.store(true, Ordering::SeqCst);
    assert!(harness.pipeline(&mut root).is_err());

    let draw = canopy_scene::find_first_of_type::<DrawCommand>(&root).unwrap();
    assert_eq!(draw.pipeline(), Some(first));
    assert_eq!(harness.table.live_handles(), handles);
    assert_eq!(harness.device.counts(), counts);
    // Still usable.
    harness.record(&mut root).unwrap();

    enabled.store(false, Ordering::SeqCst);
    harness.pipeline(&mut root).unwrap();
    let draw = canopy_scene::find_first_of_type::<DrawCommand>(&root).unwrap();
    assert_eq!(draw.pipeline(), Some(first));
}

#[test]
fn test_surface_sized_image_is_recreated_when_the_extent_changed() {
    let mut harness = Harness::new();
    let mut root = Separator::new().with(Image::surface_sized(
        ImageFormat::Rgba8Unorm,
        ImageUsage::STORAGE,
    ));
    harness.build(&mut root).unwrap();
    let first = canopy_scene::find_first_of_type::<Image>(&root)
        .and_then(Image::image)
        .unwrap();
    let handles = harness.table.live_handles();

    // The surface changed size but no Resize traversal reached the image.
    harness.surface.recreate(Extent2D::new(128, 32)).unwrap();
    harness.alloc(&mut root).unwrap();
    harness.stage(&mut root).unwrap();

    let image = canopy_scene::find_first_of_type::<Image>(&root).unwrap();
    assert_ne!(image.image(), Some(first));
    assert_eq!(image.extent(), Extent3D::new(128, 32, 1));
    assert!(image
        .image()
        .is_some_and(|id| harness.table.is_image_bound(id)));
    assert_eq!(harness.table.live_handles(), handles);
}
