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

//! Draw and dispatch commands.
//!
//! A command node turns the accumulated pipeline state into device objects
//! during BuildPipeline, records one secondary command buffer during Record,
//! and queues that buffer for execution every frame during Render. Building
//! again with unchanged state keeps the existing objects.

use crate::context::{CommandRecorder, PipelineCreator, SceneRenderer};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use crate::resources::{DeviceObject, ResourceTable};
use crate::state::PipelineState;
use canopy_core::renderer::api::*;
use std::borrow::Cow;

/// Everything a pipeline was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PipelineKey {
    bind_point: PipelineBindPoint,
    render_pass: Option<RenderPassId>,
    topology: Option<PrimitiveTopology>,
    stages: Vec<ShaderStageInfo>,
    vertex_bindings: Vec<VertexInputBinding>,
    vertex_attributes: Vec<VertexInputAttribute>,
    layout_bindings: Vec<DescriptorSetLayoutBinding>,
    pool_sizes: Vec<DescriptorPoolSize>,
    writes: Vec<WriteDescriptor>,
    rasterization: Option<RasterizationState>,
}

impl PipelineKey {
    fn graphics(state: &PipelineState, render_pass: RenderPassId, topology: PrimitiveTopology) -> Self {
        Self {
            bind_point: PipelineBindPoint::Graphics,
            render_pass: Some(render_pass),
            topology: Some(topology),
            stages: state.shader_stages.clone(),
            vertex_bindings: state.vertex_bindings.clone(),
            vertex_attributes: state.vertex_attributes.clone(),
            layout_bindings: state.layout_bindings.clone(),
            pool_sizes: state.pool_sizes.clone(),
            writes: state.writes.clone(),
            rasterization: Some(state.rasterization),
        }
    }

    fn compute(state: &PipelineState) -> Self {
        Self {
            bind_point: PipelineBindPoint::Compute,
            render_pass: None,
            topology: None,
            stages: state.shader_stages.clone(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            layout_bindings: state.layout_bindings.clone(),
            pool_sizes: state.pool_sizes.clone(),
            writes: state.writes.clone(),
            rasterization: None,
        }
    }
}

/// The device objects behind one command node.
#[derive(Debug, Default)]
struct PipelineObjects {
    key: Option<PipelineKey>,
    set_layout: Option<DescriptorSetLayoutId>,
    pool: Option<DescriptorPoolId>,
    // Freed together with the pool.
    set: Option<DescriptorSetId>,
    layout: Option<PipelineLayoutId>,
    pipeline: Option<PipelineId>,
}

impl PipelineObjects {
    fn is_current(&self, key: &PipelineKey) -> bool {
        self.pipeline.is_some() && self.key.as_ref() == Some(key)
    }

    fn release(&mut self, table: &mut ResourceTable) -> Result<(), SceneError> {
        self.key = None;
        self.set = None;
        if let Some(pipeline) = self.pipeline.take() {
            table.destroy(DeviceObject::Pipeline(pipeline))?;
        }
        if let Some(layout) = self.layout.take() {
            table.destroy(DeviceObject::PipelineLayout(layout))?;
        }
        if let Some(pool) = self.pool.take() {
            table.destroy(DeviceObject::DescriptorPool(pool))?;
        }
        if let Some(set_layout) = self.set_layout.take() {
            table.destroy(DeviceObject::DescriptorSetLayout(set_layout))?;
        }
        Ok(())
    }

    /// Builds a complete new set of objects for `key`.
    ///
    /// On failure the objects created so far are destroyed and the caller's
    /// current objects are left untouched.
    fn build(
        table: &mut ResourceTable,
        state: &PipelineState,
        key: PipelineKey,
        create_pipeline: impl FnOnce(&mut ResourceTable, PipelineLayoutId) -> Result<PipelineId, SceneError>,
    ) -> Result<Self, SceneError> {
        let mut fresh = Self::default();
        let built = match fresh.build_layout(table, state) {
            Ok(layout) => create_pipeline(table, layout),
            Err(e) => Err(e),
        };
        match built {
            Ok(pipeline) => {
                fresh.pipeline = Some(pipeline);
                fresh.key = Some(key);
                Ok(fresh)
            }
            Err(e) => {
                if let Err(release_err) = fresh.release(table) {
                    log::error!("Failed to release a partially built pipeline: {release_err}");
                }
                Err(e)
            }
        }
    }

    /// Installs `fresh` and releases the objects it replaces.
    fn replace(&mut self, fresh: Self, table: &mut ResourceTable) -> Result<(), SceneError> {
        let mut stale = std::mem::replace(self, fresh);
        stale.release(table)
    }

    /// Creates the set layout, pool, set and pipeline layout, and applies the writes.
    fn build_layout(
        &mut self,
        table: &mut ResourceTable,
        state: &PipelineState,
    ) -> Result<PipelineLayoutId, SceneError> {
        let set_layout = table.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
            label: None,
            bindings: &state.layout_bindings,
        })?;
        self.set_layout = Some(set_layout);

        if !state.layout_bindings.is_empty() {
            let pool_sizes = merge_pool_sizes(&state.pool_sizes);
            let pool = table.create_descriptor_pool(&DescriptorPoolDescriptor {
                label: None,
                max_sets: 1,
                pool_sizes: &pool_sizes,
            })?;
            self.pool = Some(pool);

            let device = table.device().clone();
            let set = device.allocate_descriptor_set(pool, set_layout)?;
            device.update_descriptor_set(set, &state.writes)?;
            self.set = Some(set);
        }

        let layout = table.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            set_layouts: &[set_layout],
        })?;
        self.layout = Some(layout);
        Ok(layout)
    }

    fn bound(&self, node: &'static str) -> Result<(PipelineId, PipelineLayoutId), SceneError> {
        match (self.pipeline, self.layout) {
            (Some(pipeline), Some(layout)) => Ok((pipeline, layout)),
            _ => Err(SceneError::protocol(node, "recorded before its pipeline was built")),
        }
    }
}

/// Sums the descriptor counts per type.
fn merge_pool_sizes(sizes: &[DescriptorPoolSize]) -> Vec<DescriptorPoolSize> {
    let mut merged: Vec<DescriptorPoolSize> = Vec::new();
    for size in sizes {
        match merged.iter_mut().find(|existing| existing.ty == size.ty) {
            Some(existing) => existing.count += size.count,
            None => merged.push(*size),
        }
    }
    merged
}

fn command_buffer(
    slot: &mut Option<CommandBufferId>,
    table: &mut ResourceTable,
) -> Result<CommandBufferId, SceneError> {
    match *slot {
        Some(id) => Ok(id),
        None => {
            let id = table.allocate_command_buffer(CommandBufferLevel::Secondary)?;
            *slot = Some(id);
            Ok(id)
        }
    }
}

/// Draws with everything accumulated in the pipeline and record state.
///
/// Indexed if an index buffer is current, otherwise non-indexed. The vertex
/// count defaults to the one derived from the first vertex binding.
#[derive(Debug)]
pub struct DrawCommand {
    topology: PrimitiveTopology,
    vertex_count: Option<u32>,
    instance_count: u32,
    objects: PipelineObjects,
    command: Option<CommandBufferId>,
    // Number of times the command buffer was recorded.
    recordings: u32,
}

impl DrawCommand {
    pub fn new(topology: PrimitiveTopology) -> Self {
        Self {
            topology,
            vertex_count: None,
            instance_count: 1,
            objects: PipelineObjects::default(),
            command: None,
            recordings: 0,
        }
    }

    /// Draws a fixed number of vertices (or indices) instead of deriving it.
    pub fn with_vertex_count(mut self, count: u32) -> Self {
        self.vertex_count = Some(count);
        self
    }

    pub fn with_instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    pub fn pipeline(&self) -> Option<PipelineId> {
        self.objects.pipeline
    }

    pub fn descriptor_set(&self) -> Option<DescriptorSetId> {
        self.objects.set
    }

    pub fn command_buffer(&self) -> Option<CommandBufferId> {
        self.command
    }

    pub fn recordings(&self) -> u32 {
        self.recordings
    }
}

impl Default for DrawCommand {
    fn default() -> Self {
        Self::new(PrimitiveTopology::TriangleList)
    }
}

impl Node for DrawCommand {
    fn kind(&self) -> NodeKind {
        NodeKind::DrawCommand
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let key = PipelineKey::graphics(&creator.state, creator.render_pass(), self.topology);
        if self.objects.is_current(&key) {
            log::trace!("DrawCommand pipeline unchanged, keeping it");
            return Ok(());
        }

        let stages: Vec<ShaderStageInfo> = creator
            .state
            .shader_stages
            .iter()
            .filter(|stage| !stage.stage.contains(ShaderStage::COMPUTE))
            .cloned()
            .collect();
        if !stages.iter().any(|stage| stage.stage.contains(ShaderStage::VERTEX)) {
            return Err(SceneError::missing("DrawCommand", "a vertex shader"));
        }

        let render_pass = creator.render_pass();
        let cache = creator.pipeline_cache();
        let state = creator.state.clone();
        let topology = self.topology;
        let table = creator.resources();
        let fresh = PipelineObjects::build(table, &state, key, |table, layout| {
            table.create_graphics_pipeline(
                cache,
                &GraphicsPipelineDescriptor {
                    label: Some(Cow::Borrowed("draw command")),
                    layout,
                    render_pass,
                    stages: &stages,
                    vertex_bindings: &state.vertex_bindings,
                    vertex_attributes: &state.vertex_attributes,
                    topology,
                    rasterization: state.rasterization,
                },
            )
        })?;
        log::debug!("DrawCommand built {:?}", fresh.pipeline);
        self.objects.replace(fresh, table)
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        let (pipeline, layout) = self.objects.bound("DrawCommand")?;
        let state = recorder.state.clone();
        let draw_count = match state.index {
            Some(index) => self.vertex_count.unwrap_or(index.count),
            None => self
                .vertex_count
                .or(state.vertex_count)
                .ok_or_else(|| SceneError::missing("DrawCommand", "a vertex count"))?,
        };

        let render_pass = recorder.render_pass();
        let extent = recorder.extent();
        let table = recorder.resources();
        let command = command_buffer(&mut self.command, table)?;
        let mut encoder = table.device().begin_command_buffer(
            command,
            &CommandBufferBeginInfo {
                one_time_submit: false,
                render_pass_continue: Some(render_pass),
            },
        )?;

        encoder.bind_pipeline(PipelineBindPoint::Graphics, pipeline);
        if let Some(set) = self.objects.set {
            encoder.bind_descriptor_sets(PipelineBindPoint::Graphics, layout, 0, &[set]);
        }
        encoder.set_viewport(&Viewport::from_extent(extent));
        encoder.set_scissor(&Rect2D::from_extent(extent));

        let mut vertex_buffers = state.vertex_buffers;
        vertex_buffers.sort_by_key(|binding| binding.binding);
        for binding in &vertex_buffers {
            encoder.bind_vertex_buffers(binding.binding, &[binding.buffer], &[binding.offset]);
        }
        match state.index {
            Some(index) => {
                encoder.bind_index_buffer(index.buffer, 0, index.format);
                encoder.draw_indexed(draw_count, self.instance_count, 0, 0, 0);
            }
            None => encoder.draw(draw_count, self.instance_count, 0, 0),
        }
        encoder.finish()?;
        self.recordings += 1;
        Ok(())
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        let command = self
            .command
            .ok_or_else(|| SceneError::protocol("DrawCommand", "rendered before it was recorded"))?;
        renderer.execute_draw(command);
        Ok(())
    }
}

typed_node!(DrawCommand, DrawCommand);

/// Dispatches a compute shader over a grid of work groups.
///
/// Executed every frame before the render pass begins.
#[derive(Debug)]
pub struct DispatchCommand {
    groups: [u32; 3],
    objects: PipelineObjects,
    command: Option<CommandBufferId>,
    recordings: u32,
}

impl DispatchCommand {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self {
            groups: [x, y, z],
            objects: PipelineObjects::default(),
            command: None,
            recordings: 0,
        }
    }

    pub fn groups(&self) -> [u32; 3] {
        self.groups
    }

    pub fn set_groups(&mut self, x: u32, y: u32, z: u32) {
        self.groups = [x, y, z];
    }

    pub fn pipeline(&self) -> Option<PipelineId> {
        self.objects.pipeline
    }

    pub fn command_buffer(&self) -> Option<CommandBufferId> {
        self.command
    }

    pub fn recordings(&self) -> u32 {
        self.recordings
    }
}

impl Node for DispatchCommand {
    fn kind(&self) -> NodeKind {
        NodeKind::DispatchCommand
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let key = PipelineKey::compute(&creator.state);
        if self.objects.is_current(&key) {
            return Ok(());
        }

        let stage = creator
            .state
            .shader_stages
            .iter()
            .find(|stage| stage.stage.contains(ShaderStage::COMPUTE))
            .cloned()
            .ok_or_else(|| SceneError::missing("DispatchCommand", "a compute shader"))?;

        let cache = creator.pipeline_cache();
        let state = creator.state.clone();
        let table = creator.resources();
        let fresh = PipelineObjects::build(table, &state, key, |table, layout| {
            table.create_compute_pipeline(
                cache,
                &ComputePipelineDescriptor {
                    label: Some(Cow::Borrowed("dispatch command")),
                    layout,
                    stage: &stage,
                },
            )
        })?;
        log::debug!("DispatchCommand built {:?}", fresh.pipeline);
        self.objects.replace(fresh, table)
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        let (pipeline, layout) = self.objects.bound("DispatchCommand")?;
        let table = recorder.resources();
        let command = command_buffer(&mut self.command, table)?;
        let mut encoder = table
            .device()
            .begin_command_buffer(command, &CommandBufferBeginInfo::default())?;
        encoder.bind_pipeline(PipelineBindPoint::Compute, pipeline);
        if let Some(set) = self.objects.set {
            encoder.bind_descriptor_sets(PipelineBindPoint::Compute, layout, 0, &[set]);
        }
        let [x, y, z] = self.groups;
        encoder.dispatch(x, y, z);
        encoder.finish()?;
        self.recordings += 1;
        Ok(())
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        let command = self.command.ok_or_else(|| {
            SceneError::protocol("DispatchCommand", "rendered before it was recorded")
        })?;
        renderer.execute_dispatch(command);
        Ok(())
    }
}

typed_node!(DispatchCommand, DispatchCommand);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_pool_sizes_sums_per_type() {
        let merged = merge_pool_sizes(&[
            DescriptorPoolSize {
                ty: DescriptorType::UniformBuffer,
                count: 1,
            },
            DescriptorPoolSize {
                ty: DescriptorType::CombinedImageSampler,
                count: 1,
            },
            DescriptorPoolSize {
                ty: DescriptorType::UniformBuffer,
                count: 2,
            },
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].count, 3);
        assert_eq!(merged[1].ty, DescriptorType::CombinedImageSampler);
    }

    #[test]
    fn test_key_tracks_descriptor_writes() {
        let mut state = PipelineState::default();
        let before = PipelineKey::graphics(&state, RenderPassId(1), PrimitiveTopology::TriangleList);
        state.writes.push(WriteDescriptor {
            binding: 0,
            array_element: 0,
            ty: DescriptorType::UniformBuffer,
            resource: DescriptorResource::Buffer {
                buffer: BufferId(3),
                offset: 0,
                range: 64,
            },
        });
        let after = PipelineKey::graphics(&state, RenderPassId(1), PrimitiveTopology::TriangleList);
        assert_ne!(before, after);
        assert_eq!(
            before,
            PipelineKey::graphics(&PipelineState::default(), RenderPassId(1), PrimitiveTopology::TriangleList)
        );
    }
}
